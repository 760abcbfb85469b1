//! # Settlement Protocol
//!
//! The bidirectional constraint negotiation implemented cooperatively by
//! links and node variants. There is no global solver: convergence emerges
//! from repeated local recomputation, with the per-link value-equality
//! guard as the base case that terminates recursion through cycles.
//!
//! Everything here is synchronous, single-threaded and recursive. The only
//! safety net is a `debug_assert!` depth ceiling
//! ([`MAX_PROPAGATION_DEPTH`]): release builds keep the original
//! run-to-completion contract.

use crate::graph::Network;
use crate::link::Link;
use crate::node::Node;
use crate::primitives::MAX_PROPAGATION_DEPTH;
use crate::{LinkId, NodeId};

impl Network {
    // =========================================================================
    // LINK NEGOTIATION
    // =========================================================================

    /// Push a requested rate into a link and onward into its downstream
    /// node, clamping to the effective ceiling and reporting backward when
    /// less was accepted than requested.
    fn forward_link(&mut self, id: LinkId, requested: f64, depth: usize) {
        debug_assert!(
            depth < MAX_PROPAGATION_DEPTH,
            "settlement exceeded the propagation depth ceiling at {id:?}"
        );
        let Some(link) = self.links.get(&id) else {
            return;
        };
        // Convergence guard: a repeated value means the subgraph reachable
        // from here is already consistent.
        if requested == link.speed() {
            return;
        }

        let upstream = link.upstream();
        let downstream = link.downstream();
        let ceiling = link.effective_ceiling();
        let new_speed = requested.min(ceiling);

        if new_speed != link.speed() {
            if let Some(link) = self.links.get_mut(&id) {
                link.current_speed = new_speed;
            }
            self.forward_node(downstream, new_speed, depth.saturating_add(1));

            if self.link_speed(id) != new_speed {
                // The downstream call backpropagated through this link
                // already; a second backward signal would be redundant.
                return;
            }
        }

        // Re-read the ceiling: the downstream call may have tightened it.
        let ceiling = self.links.get(&id).map_or(ceiling, Link::effective_ceiling);
        if requested > ceiling {
            // The upstream gave us too much; tell it what was accepted.
            self.backward_node(upstream, new_speed, depth.saturating_add(1));
        }
    }

    /// A downstream constraint caps this link: record the reduced rate as
    /// both the settled speed and the backpressure ceiling, then propagate
    /// upstream. The ceiling stays in force until the link is reset.
    fn backward_link(&mut self, id: LinkId, speed: f64, depth: usize) {
        debug_assert!(
            depth < MAX_PROPAGATION_DEPTH,
            "settlement exceeded the propagation depth ceiling at {id:?}"
        );
        let Some(link) = self.links.get_mut(&id) else {
            return;
        };
        if link.speed() == speed {
            return;
        }
        link.current_speed = speed;
        link.backpressure_ceiling = Some(speed);

        let upstream = link.upstream();
        self.backward_node(upstream, speed, depth.saturating_add(1));
    }

    // =========================================================================
    // NODE DISPATCH
    // =========================================================================

    /// Deliver a forward flow signal into a node.
    pub(crate) fn forward_node(&mut self, id: NodeId, speed: f64, depth: usize) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match node {
            Node::Source(_) => self.source_forward(id, depth),
            Node::Sink(_) => self.sink_forward(id, speed, depth),
            Node::Splitter(_) => self.splitter_forward(id, speed, depth),
            Node::Merger(_) => self.merger_forward(id, depth),
            Node::Processor(_) => self.processor_forward(id, depth),
        }
    }

    /// Deliver a backward (backpressure) signal into a node.
    fn backward_node(&mut self, id: NodeId, speed: f64, depth: usize) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match node {
            // A source is a propagation terminus: it represents an
            // unconstrained external supply and cannot be slowed further.
            Node::Source(_) => {}
            // A sink feeds no links, so nothing can signal it backward.
            Node::Sink(_) => {}
            Node::Splitter(_) => self.splitter_backward(id, depth),
            Node::Merger(_) => self.merger_backward(id, speed, depth),
            Node::Processor(_) => self.processor_backward(id, speed, depth),
        }
    }

    // =========================================================================
    // SOURCE / SINK
    // =========================================================================

    /// A source ignores the incoming signal and always pushes its fixed
    /// emission rate into its outgoing link.
    fn source_forward(&mut self, id: NodeId, depth: usize) {
        let Some(Node::Source(source)) = self.nodes.get(&id) else {
            return;
        };
        let rate = source.rate;
        let Some(out) = source.output else {
            return;
        };
        self.forward_link(out, rate, depth.saturating_add(1));
    }

    /// A sink accepts anything up to its intake cap; oversupply is answered
    /// with a backward signal carrying the cap. Forward flow ends here.
    fn sink_forward(&mut self, id: NodeId, speed: f64, depth: usize) {
        let Some(Node::Sink(sink)) = self.nodes.get(&id) else {
            return;
        };
        if speed > sink.max_intake {
            let cap = sink.max_intake;
            let Some(input) = sink.input else {
                return;
            };
            self.backward_link(input, cap, depth.saturating_add(1));
        }
    }

    // =========================================================================
    // SPLITTER
    // =========================================================================

    /// Divide the incoming rate evenly across the outgoing links.
    ///
    /// Links are visited in ascending effective-ceiling order so that a
    /// constrained branch's unused share cascades to the less constrained
    /// ones. If a nested backward signal mutates a link mid-iteration, this
    /// pass aborts and leaves the nested recomputation's result alone.
    fn splitter_forward(&mut self, id: NodeId, speed: f64, depth: usize) {
        let Some(Node::Splitter(splitter)) = self.nodes.get(&id) else {
            return;
        };
        let input = splitter.input;
        let mut ordered = splitter.outputs.clone();

        let count = ordered.len();
        let average = speed / count as f64;

        ordered.sort_by(|a, b| {
            self.effective_ceiling_of(*a)
                .total_cmp(&self.effective_ceiling_of(*b))
        });

        let mut excess_capacity = 0.0;
        for (i, link_id) in ordered.iter().enumerate() {
            let remaining = (count - i) as f64;
            let target =
                (average + excess_capacity / remaining).min(self.effective_ceiling_of(*link_id));
            self.forward_link(*link_id, target, depth.saturating_add(1));
            if self.link_speed(*link_id) != target {
                // A nested backward signal re-ran this split already.
                return;
            }
            excess_capacity += average - target;
        }

        if excess_capacity > 0.0
            && let Some(input) = input
        {
            // Not all offered input could be used downstream.
            self.backward_link(input, speed - excess_capacity, depth.saturating_add(1));
        }
    }

    /// An output slowed down: re-run the fair-share split from the input
    /// link's settled rate.
    fn splitter_backward(&mut self, id: NodeId, depth: usize) {
        let Some(Node::Splitter(splitter)) = self.nodes.get(&id) else {
            return;
        };
        let incoming = splitter.input.map_or(0.0, |link| self.link_speed(link));
        self.splitter_forward(id, incoming, depth.saturating_add(1));
    }

    // =========================================================================
    // MERGER
    // =========================================================================

    /// Forward the sum of all incoming settled rates into the outgoing
    /// link. Without an outgoing link everything upstream is backpressured
    /// to zero.
    fn merger_forward(&mut self, id: NodeId, depth: usize) {
        let Some(Node::Merger(merger)) = self.nodes.get(&id) else {
            return;
        };
        match merger.output {
            None => self.merger_backward(id, 0.0, depth.saturating_add(1)),
            Some(out) => {
                let total: f64 = merger
                    .inputs
                    .iter()
                    .map(|link| self.link_speed(*link))
                    .sum();
                self.forward_link(out, total, depth.saturating_add(1));
            }
        }
    }

    /// The outgoing link requested a reduced rate: cap the incoming links,
    /// slowest first, redistributing the slack of the slow ones onto the
    /// fast ones. Mirrors the splitter's algorithm with roles reversed.
    fn merger_backward(&mut self, id: NodeId, speed: f64, depth: usize) {
        let Some(Node::Merger(merger)) = self.nodes.get(&id) else {
            return;
        };
        let mut ordered = merger.inputs.clone();

        let count = ordered.len();
        let required_average = speed / count as f64;

        // Slowest inputs first so all their capacity can be taken if needed.
        ordered.sort_by(|a, b| self.link_speed(*a).total_cmp(&self.link_speed(*b)));

        let mut missing_capacity = 0.0;
        for (i, link_id) in ordered.iter().enumerate() {
            let remaining = (count - i) as f64;
            let target =
                (required_average + missing_capacity / remaining).min(self.link_speed(*link_id));
            self.backward_link(*link_id, target, depth.saturating_add(1));
            if self.link_speed(*link_id) != target {
                // A nested forward signal re-ran this distribution already.
                return;
            }
            missing_capacity += required_average - target;
        }
    }

    // =========================================================================
    // PROCESSOR
    // =========================================================================

    /// Clamp the incoming rate to the input rating, convert at the fixed
    /// ratio, and push the result downstream. The backward correction for
    /// an oversupplying input is only sent when nothing downstream already
    /// corrected it.
    fn processor_forward(&mut self, id: NodeId, depth: usize) {
        let Some(Node::Processor(processor)) = self.nodes.get(&id) else {
            return;
        };
        let max_input = processor.max_input_rate;
        let max_output = processor.max_output_rate;
        let input = processor.input;

        let Some(out) = processor.output else {
            self.processor_backward(id, 0.0, depth.saturating_add(1));
            return;
        };

        let original_input = input.map_or(0.0, |link| self.link_speed(link));
        let clamped_input = max_input.min(original_input);
        let output_speed = (max_output / max_input) * clamped_input;

        self.forward_link(out, output_speed, depth.saturating_add(1));

        let settled_input = input.map_or(0.0, |link| self.link_speed(link));
        if settled_input == original_input
            && original_input > clamped_input
            && let Some(input) = input
        {
            self.backward_link(input, clamped_input, depth.saturating_add(1));
        }
    }

    /// Downstream demand dropped: cap the upstream supply at the inverse
    /// ratio of the reduced output rate.
    fn processor_backward(&mut self, id: NodeId, speed: f64, depth: usize) {
        let Some(Node::Processor(processor)) = self.nodes.get(&id) else {
            return;
        };
        let ratio = processor.max_input_rate / processor.max_output_rate;
        let Some(input) = processor.input else {
            return;
        };
        self.backward_link(input, ratio * speed, depth.saturating_add(1));
    }

    // =========================================================================
    // LINK STATE HELPERS
    // =========================================================================

    fn link_speed(&self, id: LinkId) -> f64 {
        self.links.get(&id).map_or(0.0, Link::speed)
    }

    fn effective_ceiling_of(&self, id: LinkId) -> f64 {
        self.links
            .get(&id)
            .map_or(f64::INFINITY, Link::effective_ceiling)
    }
}

// =============================================================================
// TESTS
// =============================================================================
