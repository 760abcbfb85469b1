//! # Network Arena
//!
//! The owning structure for a flow network: two `BTreeMap` arenas (nodes
//! and links) with stable identifiers, plus the assembly and lifecycle API
//! the editor/persistence layers drive (`connect`, `disconnect`,
//! `simulate`, `reset`).
//!
//! All storage uses `BTreeMap`/`BTreeSet` for deterministic ordering.
//! The propagation protocol itself lives in the `settle` module as a second
//! `impl Network` block.

use crate::link::Link;
use crate::node::{MergerNode, Node, ProcessorNode, SinkNode, SourceNode, SplitterNode};
use crate::primitives::DEFAULT_LINK_CAPACITY;
use crate::{FluxError, LinkId, NodeId, NodeKind, PortRole};
use std::collections::{BTreeMap, BTreeSet};

/// A flow network: nodes, links and the source-role registry.
///
/// The registry replaces runtime type inspection for building a
/// simulation's starting set: it is maintained on node insertion and
/// consulted by [`Network::simulate_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    /// Node storage: NodeId -> Node
    pub(crate) nodes: BTreeMap<NodeId, Node>,

    /// Link storage: LinkId -> Link
    pub(crate) links: BTreeMap<LinkId, Link>,

    /// Registry of source-role nodes, in insertion (id) order.
    sources: BTreeSet<NodeId>,

    /// Next available NodeId
    next_node_id: u64,

    /// Next available LinkId
    next_link_id: u64,
}

impl Network {
    /// Create a new empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // NODE CONSTRUCTION
    // =========================================================================

    /// Insert a node into the arena, registering source-role nodes.
    fn insert_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id = self.next_node_id.saturating_add(1);

        if node.kind() == NodeKind::Source {
            self.sources.insert(id);
        }
        self.nodes.insert(id, node);
        id
    }

    /// Add a source emitting at the given fixed rate.
    pub fn add_source(&mut self, rate: f64) -> NodeId {
        self.insert_node(Node::Source(SourceNode::new(rate)))
    }

    /// Add a sink with unbounded intake.
    pub fn add_sink(&mut self) -> NodeId {
        self.insert_node(Node::Sink(SinkNode::unbounded()))
    }

    /// Add a sink that refuses intake above `max_intake`.
    pub fn add_sink_capped(&mut self, max_intake: f64) -> NodeId {
        self.insert_node(Node::Sink(SinkNode::capped(max_intake)))
    }

    /// Add a splitter (1 in, up to 3 out).
    pub fn add_splitter(&mut self) -> NodeId {
        self.insert_node(Node::Splitter(SplitterNode::default()))
    }

    /// Add a merger (up to 3 in, 1 out).
    pub fn add_merger(&mut self) -> NodeId {
        self.insert_node(Node::Merger(MergerNode::default()))
    }

    /// Add a processor converting at `max_output_rate / max_input_rate`.
    pub fn add_processor(&mut self, max_input_rate: f64, max_output_rate: f64) -> NodeId {
        self.insert_node(Node::Processor(ProcessorNode::new(
            max_input_rate,
            max_output_rate,
        )))
    }

    // =========================================================================
    // LINK LIFECYCLE
    // =========================================================================

    /// Connect `upstream` to `downstream` with a link of the given physical
    /// capacity, registering it on both endpoints.
    ///
    /// Fails with [`FluxError::CapacityExceeded`] when either endpoint is
    /// at its variant's degree limit (a Source downstream or a Sink
    /// upstream counts as a limit of 0). A failed connect leaves no
    /// registration behind on either endpoint.
    pub fn connect(
        &mut self,
        upstream: NodeId,
        downstream: NodeId,
        max_speed: f64,
    ) -> Result<LinkId, FluxError> {
        if !self.nodes.contains_key(&upstream) {
            return Err(FluxError::NodeNotFound(upstream));
        }
        if !self.nodes.contains_key(&downstream) {
            return Err(FluxError::NodeNotFound(downstream));
        }

        let id = LinkId(self.next_link_id);

        Self::attach_output(self.node_mut(upstream), upstream, id)?;
        if let Err(err) = Self::attach_input(self.node_mut(downstream), downstream, id) {
            // Roll back the upstream registration so the failed connect
            // leaves both endpoints untouched.
            if let Some(out) = self.node_mut(upstream).as_output_mut() {
                out.detach_output(id);
            }
            return Err(err);
        }

        self.next_link_id = self.next_link_id.saturating_add(1);
        self.links
            .insert(id, Link::new(id, upstream, downstream, max_speed));
        Ok(id)
    }

    /// Connect with the default link capacity of
    /// [`DEFAULT_LINK_CAPACITY`] rate units.
    pub fn connect_default(
        &mut self,
        upstream: NodeId,
        downstream: NodeId,
    ) -> Result<LinkId, FluxError> {
        self.connect(upstream, downstream, DEFAULT_LINK_CAPACITY)
    }

    /// Tear down a link: deregister it from both endpoints and drop it from
    /// the arena. The endpoints survive.
    pub fn disconnect(&mut self, link: LinkId) -> Result<(), FluxError> {
        let Some(removed) = self.links.remove(&link) else {
            return Err(FluxError::LinkNotFound(link));
        };

        if let Some(node) = self.nodes.get_mut(&removed.upstream())
            && let Some(out) = node.as_output_mut()
        {
            out.detach_output(link);
        }
        if let Some(node) = self.nodes.get_mut(&removed.downstream())
            && let Some(input) = node.as_input_mut()
        {
            input.detach_input(link);
        }
        Ok(())
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        // Callers check existence first; the arena never removes nodes.
        self.nodes
            .get_mut(&id)
            .unwrap_or_else(|| unreachable!("node {id:?} vanished from arena"))
    }

    fn attach_output(node: &mut Node, id: NodeId, link: LinkId) -> Result<(), FluxError> {
        let Some(out) = node.as_output_mut() else {
            return Err(FluxError::CapacityExceeded {
                node: id,
                role: PortRole::Output,
                limit: 0,
            });
        };
        out.attach_output(link)
            .map_err(|full| FluxError::CapacityExceeded {
                node: id,
                role: full.role,
                limit: full.limit,
            })
    }

    fn attach_input(node: &mut Node, id: NodeId, link: LinkId) -> Result<(), FluxError> {
        let Some(input) = node.as_input_mut() else {
            return Err(FluxError::CapacityExceeded {
                node: id,
                role: PortRole::Input,
                limit: 0,
            });
        };
        input
            .attach_input(link)
            .map_err(|full| FluxError::CapacityExceeded {
                node: id,
                role: full.role,
                limit: full.limit,
            })
    }

    // =========================================================================
    // SETTLEMENT ENTRY POINTS
    // =========================================================================

    /// Run one settlement pass from the given nodes, in the given order.
    ///
    /// Each source pushes its fixed rate once; all further recomputation
    /// happens recursively inside the propagation protocol. Ids that do not
    /// name a Source are skipped.
    pub fn simulate(&mut self, sources: &[NodeId]) {
        for &id in sources {
            if self.nodes.get(&id).map(Node::kind) == Some(NodeKind::Source) {
                self.forward_node(id, 0.0, 0);
            }
        }
    }

    /// Run one settlement pass from every registered source, in id order.
    pub fn simulate_all(&mut self) {
        let sources: Vec<NodeId> = self.sources.iter().copied().collect();
        self.simulate(&sources);
    }

    /// Reset the given links to speed 0 with no backpressure ceiling.
    ///
    /// Node configuration is untouched. A full settlement re-run requires
    /// resetting every link reachable from the sources; see
    /// [`Network::reset_all`].
    pub fn reset(&mut self, links: &[LinkId]) {
        for id in links {
            if let Some(link) = self.links.get_mut(id) {
                link.reset();
            }
        }
    }

    /// Reset every link in the network for a fresh settlement run.
    pub fn reset_all(&mut self) {
        for link in self.links.values_mut() {
            link.reset();
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The settled speed of a link, for display layers to poll.
    #[must_use]
    pub fn speed(&self, link: LinkId) -> Option<f64> {
        self.links.get(&link).map(Link::speed)
    }

    /// Lookup a link by id.
    #[must_use]
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// All links in deterministic (id) order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Lookup a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All nodes with their ids in deterministic order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// The variant tag of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(Node::kind)
    }

    /// Sum of the settled speeds of a node's incoming links.
    ///
    /// `None` when the node is missing or its variant has no input role.
    #[must_use]
    pub fn input_rate(&self, id: NodeId) -> Option<f64> {
        let input = self.nodes.get(&id)?.as_input()?;
        Some(
            input
                .input_links()
                .iter()
                .filter_map(|l| self.speed(*l))
                .sum(),
        )
    }

    /// Sum of the settled speeds of a node's outgoing links.
    ///
    /// `None` when the node is missing or its variant has no output role.
    #[must_use]
    pub fn output_rate(&self, id: NodeId) -> Option<f64> {
        let out = self.nodes.get(&id)?.as_output()?;
        Some(
            out.output_links()
                .iter()
                .filter_map(|l| self.speed(*l))
                .sum(),
        )
    }

    /// The registered source-role nodes, in id order.
    pub fn source_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sources.iter().copied()
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_registers_on_both_endpoints() {
        let mut net = Network::new();
        let source = net.add_source(60.0);
        let sink = net.add_sink();

        let link = net.connect_default(source, sink).expect("connect");

        assert_eq!(net.link_count(), 1);
        let link = net.link(link).expect("link");
        assert_eq!(link.upstream(), source);
        assert_eq!(link.downstream(), sink);
        assert_eq!(link.max_speed(), DEFAULT_LINK_CAPACITY);
    }

    #[test]
    fn connect_to_full_source_fails() {
        let mut net = Network::new();
        let source = net.add_source(60.0);
        let sink = net.add_sink();
        let sink2 = net.add_sink();
        net.connect_default(source, sink).expect("first connect");

        let err = net.connect_default(source, sink2).expect_err("source full");
        assert_eq!(
            err,
            FluxError::CapacityExceeded {
                node: source,
                role: PortRole::Output,
                limit: 1
            }
        );
        assert_eq!(net.link_count(), 1);
    }

    #[test]
    fn connect_into_source_fails_with_zero_limit() {
        let mut net = Network::new();
        let a = net.add_source(10.0);
        let b = net.add_source(10.0);

        let err = net.connect_default(a, b).expect_err("sources take no input");
        assert_eq!(
            err,
            FluxError::CapacityExceeded {
                node: b,
                role: PortRole::Input,
                limit: 0
            }
        );
    }

    #[test]
    fn failed_connect_rolls_back_upstream_registration() {
        let mut net = Network::new();
        let splitter = net.add_splitter();
        let source = net.add_source(10.0);

        // Downstream attach fails; the splitter must keep all 3 output slots.
        assert!(net.connect_default(splitter, source).is_err());

        let sinks: Vec<NodeId> = (0..3).map(|_| net.add_sink()).collect();
        for sink in sinks {
            net.connect_default(splitter, sink).expect("slot free");
        }
    }

    #[test]
    fn connect_unknown_node_fails() {
        let mut net = Network::new();
        let source = net.add_source(60.0);
        let ghost = NodeId(999);

        assert_eq!(
            net.connect_default(source, ghost),
            Err(FluxError::NodeNotFound(ghost))
        );
        assert_eq!(
            net.connect_default(ghost, source),
            Err(FluxError::NodeNotFound(ghost))
        );
    }

    #[test]
    fn disconnect_frees_both_endpoints() {
        let mut net = Network::new();
        let source = net.add_source(60.0);
        let sink = net.add_sink();
        let link = net.connect_default(source, sink).expect("connect");

        net.disconnect(link).expect("disconnect");
        assert_eq!(net.link_count(), 0);
        assert_eq!(net.node_count(), 2);

        // Both endpoints can be reconnected.
        net.connect_default(source, sink).expect("reconnect");
    }

    #[test]
    fn disconnect_unknown_link_fails() {
        let mut net = Network::new();
        assert_eq!(
            net.disconnect(LinkId(5)),
            Err(FluxError::LinkNotFound(LinkId(5)))
        );
    }

    #[test]
    fn source_registry_tracks_sources_only() {
        let mut net = Network::new();
        let s1 = net.add_source(10.0);
        net.add_sink();
        net.add_splitter();
        let s2 = net.add_source(20.0);

        let registered: Vec<NodeId> = net.source_nodes().collect();
        assert_eq!(registered, vec![s1, s2]);
    }

    #[test]
    fn link_ids_are_stable_across_disconnect() {
        let mut net = Network::new();
        let source = net.add_source(60.0);
        let splitter = net.add_splitter();
        let sink = net.add_sink();
        let sink2 = net.add_sink();

        let a = net.connect_default(source, splitter).expect("connect");
        let b = net.connect_default(splitter, sink).expect("connect");
        net.disconnect(a).expect("disconnect");

        // b keeps its identity, and new links never reuse a's id.
        let c = net.connect_default(splitter, sink2).expect("connect");
        assert_ne!(b, c);
        assert_ne!(a, c);
        assert!(net.link(b).is_some());
        assert!(net.link(a).is_none());
    }

    #[test]
    fn rate_accessors_respect_capability() {
        let mut net = Network::new();
        let source = net.add_source(60.0);
        let sink = net.add_sink();
        net.connect_default(source, sink).expect("connect");

        assert_eq!(net.input_rate(source), None);
        assert_eq!(net.output_rate(sink), None);
        assert_eq!(net.input_rate(sink), Some(0.0));
        assert_eq!(net.output_rate(source), Some(0.0));
    }
}
