//! # Core Type Definitions
//!
//! Identifiers, tags and errors for the Fluxline flow engine:
//! - Arena identifiers (`NodeId`, `LinkId`)
//! - Node classification (`NodeKind`, `PortRole`)
//! - Error types (`FluxError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types implement `Ord` so that `BTreeMap`/`BTreeSet`
//! storage iterates in a stable order, and use saturating arithmetic for
//! counters to prevent overflow.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ARENA IDENTIFIERS
// =============================================================================

/// Unique identifier for a node in the network arena.
///
/// Stable across disconnects: removing links never renumbers nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Unique identifier for a link (conveyor) in the network arena.
///
/// Issued by `Network::connect` and invalidated by `Network::disconnect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u64);

// =============================================================================
// NODE CLASSIFICATION
// =============================================================================

/// The five node variants of the flow network.
///
/// Code that must branch on the concrete variant matches on this tag;
/// the engine never recovers a variant through runtime type inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Emits a fixed, unconstrained supply rate. 0 inputs, 1 output.
    Source,
    /// Consumes flow, optionally capped. 1 input, 0 outputs.
    Sink,
    /// Divides one incoming flow fairly across up to 3 outputs.
    Splitter,
    /// Combines up to 3 incoming flows into one output.
    Merger,
    /// Converts input to output at a fixed ratio. 1 input, 1 output.
    Processor,
}

/// Which side of a node a link attaches to.
///
/// Used in error reporting when a degree invariant is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PortRole {
    /// The node receives flow from the link.
    Input,
    /// The node feeds flow into the link.
    Output,
}

impl PortRole {
    /// Human-readable role name for error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while assembling a flow network.
///
/// Settlement itself never fails: oversupply, undersupply and blockage are
/// ordinary values resolved through the backward-signal protocol. The only
/// fatal condition is violating a variant's fixed degree limit at
/// construction time, plus the dangling-id cases the arena API introduces.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FluxError {
    /// Connecting would push a node past its variant's fixed link maximum.
    #[error("node {node:?} already has {limit} {} link(s), cannot add another", role.as_str())]
    CapacityExceeded {
        /// The node whose degree limit would be exceeded.
        node: NodeId,
        /// Which side of the node was full.
        role: PortRole,
        /// The variant's fixed maximum for that side.
        limit: usize,
    },

    /// The requested node does not exist in the arena.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The requested link does not exist in the arena.
    #[error("link not found: {0:?}")]
    LinkNotFound(LinkId),
}

// =============================================================================
// TESTS
// =============================================================================
