//! # Layout Snapshots
//!
//! Persisted network layouts (node kinds, settings, link endpoints and
//! capacities) are an external-layer concern; the core only promises that a
//! network can be reconstructed from such data via repeated `connect` calls
//! plus per-node configuration. [`NetworkLayout`] is that boundary: a plain
//! serde-able snapshot with a replay constructor. No on-disk or wire format
//! is defined here.
//!
//! Settled speeds and backpressure ceilings are deliberately not captured:
//! a restored network starts at rest and re-derives them from `simulate`.

use crate::graph::Network;
use crate::node::Node;
use crate::{FluxError, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration of a single node, by variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeSpec {
    /// Fixed emission rate.
    Source { rate: f64 },
    /// Optional intake cap; `None` means unbounded.
    Sink { max_intake: Option<f64> },
    /// No configuration beyond link lists.
    Splitter,
    /// No configuration beyond link lists.
    Merger,
    /// Side ratings defining the conversion ratio.
    Processor {
        max_input_rate: f64,
        max_output_rate: f64,
    },
}

/// Endpoints and capacity of a single link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub upstream: NodeId,
    pub downstream: NodeId,
    pub max_speed: f64,
}

/// A reconstructable snapshot of a network's topology and configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NetworkLayout {
    /// Nodes with the ids the links below refer to.
    pub nodes: Vec<(NodeId, NodeSpec)>,
    /// Links in deterministic (id) order.
    pub links: Vec<LinkSpec>,
}

impl NetworkLayout {
    /// Rebuild a network by replaying node construction and `connect`
    /// calls.
    ///
    /// The rebuilt arena issues fresh ids; link endpoints are remapped
    /// accordingly. Fails when a link names an unknown node or a degree
    /// invariant is violated.
    pub fn restore(&self) -> Result<Network, FluxError> {
        let mut net = Network::new();
        let mut remap: BTreeMap<NodeId, NodeId> = BTreeMap::new();

        for (id, spec) in &self.nodes {
            let new_id = match spec {
                NodeSpec::Source { rate } => net.add_source(*rate),
                NodeSpec::Sink { max_intake: None } => net.add_sink(),
                NodeSpec::Sink {
                    max_intake: Some(cap),
                } => net.add_sink_capped(*cap),
                NodeSpec::Splitter => net.add_splitter(),
                NodeSpec::Merger => net.add_merger(),
                NodeSpec::Processor {
                    max_input_rate,
                    max_output_rate,
                } => net.add_processor(*max_input_rate, *max_output_rate),
            };
            remap.insert(*id, new_id);
        }

        for link in &self.links {
            let upstream = *remap
                .get(&link.upstream)
                .ok_or(FluxError::NodeNotFound(link.upstream))?;
            let downstream = *remap
                .get(&link.downstream)
                .ok_or(FluxError::NodeNotFound(link.downstream))?;
            net.connect(upstream, downstream, link.max_speed)?;
        }

        Ok(net)
    }
}

impl From<&Network> for NetworkLayout {
    fn from(net: &Network) -> Self {
        let nodes = net
            .nodes()
            .map(|(id, node)| {
                let spec = match node {
                    Node::Source(n) => NodeSpec::Source { rate: n.rate() },
                    Node::Sink(n) => NodeSpec::Sink {
                        max_intake: n.max_intake().is_finite().then_some(n.max_intake()),
                    },
                    Node::Splitter(_) => NodeSpec::Splitter,
                    Node::Merger(_) => NodeSpec::Merger,
                    Node::Processor(n) => NodeSpec::Processor {
                        max_input_rate: n.max_input_rate(),
                        max_output_rate: n.max_output_rate(),
                    },
                };
                (id, spec)
            })
            .collect();

        let links = net
            .links()
            .map(|link| LinkSpec {
                upstream: link.upstream(),
                downstream: link.downstream(),
                max_speed: link.max_speed(),
            })
            .collect();

        Self { nodes, links }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network() -> Network {
        let mut net = Network::new();
        let source = net.add_source(60.0);
        let splitter = net.add_splitter();
        let sink = net.add_sink_capped(10.0);
        let sink2 = net.add_sink();
        net.connect_default(source, splitter).expect("connect");
        net.connect(splitter, sink, 30.0).expect("connect");
        net.connect_default(splitter, sink2).expect("connect");
        net
    }

    #[test]
    fn snapshot_restore_preserves_topology_and_settlement() {
        let mut original = sample_network();

        let layout = NetworkLayout::from(&original);
        let mut restored = layout.restore().expect("restore");

        assert_eq!(restored.node_count(), original.node_count());
        assert_eq!(restored.link_count(), original.link_count());

        original.simulate_all();
        restored.simulate_all();

        let original_speeds: Vec<f64> = original.links().map(|l| l.speed()).collect();
        let restored_speeds: Vec<f64> = restored.links().map(|l| l.speed()).collect();
        assert_eq!(original_speeds, restored_speeds);
    }

    #[test]
    fn unbounded_sink_roundtrips_as_none() {
        let mut net = Network::new();
        net.add_sink();
        net.add_sink_capped(25.0);

        let layout = NetworkLayout::from(&net);
        assert_eq!(layout.nodes[0].1, NodeSpec::Sink { max_intake: None });
        assert_eq!(
            layout.nodes[1].1,
            NodeSpec::Sink {
                max_intake: Some(25.0)
            }
        );

        let restored = layout.restore().expect("restore");
        assert_eq!(NetworkLayout::from(&restored).nodes, layout.nodes);
    }

    #[test]
    fn restore_rejects_dangling_link_endpoint() {
        let layout = NetworkLayout {
            nodes: vec![(NodeId(0), NodeSpec::Source { rate: 10.0 })],
            links: vec![LinkSpec {
                upstream: NodeId(0),
                downstream: NodeId(42),
                max_speed: 450.0,
            }],
        };

        assert_eq!(
            layout.restore().expect_err("dangling endpoint"),
            FluxError::NodeNotFound(NodeId(42))
        );
    }
}
