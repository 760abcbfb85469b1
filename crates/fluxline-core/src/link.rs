//! # Link (Conveyor) Model
//!
//! A link is a directed, capacity-bounded edge connecting exactly one
//! upstream (output-capable) node to one downstream (input-capable) node.
//! It carries the last settled flow rate plus an optional backpressure
//! ceiling imposed by a downstream constraint.
//!
//! The forward/backward negotiation itself runs on [`crate::graph::Network`]
//! (see the `settle` module); this type owns the at-rest state and its
//! invariant: between settlement passes,
//! `0 <= current_speed <= effective_ceiling`.

use crate::{LinkId, NodeId};

/// A directed edge carrying a settled flow rate between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Arena identifier of this link.
    id: LinkId,
    /// The output-capable node feeding this link.
    upstream: NodeId,
    /// The input-capable node this link feeds.
    downstream: NodeId,
    /// Physical capacity ceiling, fixed at creation.
    max_speed: f64,
    /// Last settled rate. Starts at 0 and is only mutated by settlement.
    pub(crate) current_speed: f64,
    /// When set, a downstream constraint has already capped this link below
    /// its physical capacity; overrides `max_speed` until reset.
    pub(crate) backpressure_ceiling: Option<f64>,
}

impl Link {
    /// Create a fresh link between two nodes with the given capacity.
    #[must_use]
    pub(crate) const fn new(id: LinkId, upstream: NodeId, downstream: NodeId, max_speed: f64) -> Self {
        Self {
            id,
            upstream,
            downstream,
            max_speed,
            current_speed: 0.0,
            backpressure_ceiling: None,
        }
    }

    /// Arena identifier of this link.
    #[must_use]
    pub const fn id(&self) -> LinkId {
        self.id
    }

    /// The node feeding this link.
    #[must_use]
    pub const fn upstream(&self) -> NodeId {
        self.upstream
    }

    /// The node this link feeds.
    #[must_use]
    pub const fn downstream(&self) -> NodeId {
        self.downstream
    }

    /// The physical capacity ceiling fixed at creation.
    #[must_use]
    pub const fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// The last settled flow rate. This is what a display layer polls.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.current_speed
    }

    /// The ceiling currently in force: the backpressure override when a
    /// downstream constraint has capped this link, else the physical
    /// capacity.
    #[must_use]
    pub fn effective_ceiling(&self) -> f64 {
        self.backpressure_ceiling.unwrap_or(self.max_speed)
    }

    /// Whether a downstream constraint has capped this link below its
    /// physical capacity.
    #[must_use]
    pub const fn is_backpressured(&self) -> bool {
        self.backpressure_ceiling.is_some()
    }

    /// Prepare the link for a fresh settlement run: zero the settled rate
    /// and lift any backpressure ceiling. The endpoints are untouched.
    pub(crate) fn reset(&mut self) {
        self.current_speed = 0.0;
        self.backpressure_ceiling = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> Link {
        Link::new(LinkId(0), NodeId(1), NodeId(2), 450.0)
    }

    #[test]
    fn starts_idle_at_physical_capacity() {
        let link = link();
        assert_eq!(link.speed(), 0.0);
        assert_eq!(link.effective_ceiling(), 450.0);
        assert!(!link.is_backpressured());
    }

    #[test]
    fn backpressure_overrides_physical_capacity() {
        let mut link = link();
        link.backpressure_ceiling = Some(30.0);
        assert_eq!(link.effective_ceiling(), 30.0);
        assert!(link.is_backpressured());
    }

    #[test]
    fn reset_clears_speed_and_ceiling() {
        let mut link = link();
        link.current_speed = 120.0;
        link.backpressure_ceiling = Some(120.0);

        link.reset();

        assert_eq!(link.speed(), 0.0);
        assert_eq!(link.effective_ceiling(), 450.0);
        assert!(!link.is_backpressured());
    }
}
