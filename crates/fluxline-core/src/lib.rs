//! # fluxline-core
//!
//! The deterministic steady-state flow engine for Fluxline - THE ENGINE.
//!
//! This crate models a network of throughput-constrained logistics nodes
//! (sources, sinks, splitters, mergers and rate-converting processors)
//! connected by capacity-limited links, and computes the steady-state flow
//! rate on every link via a bidirectional constraint-propagation protocol.
//!
//! There is no global solver and no time-stepped simulation of individual
//! items: each node's local forward/backward negotiation runs recursively
//! until a link receives a value equal to its settled one, which terminates
//! the recursion even through cycles.
//!
//! ## Architectural Constraints
//!
//! The ENGINE:
//! - Is pure Rust: no async, no network dependencies, no I/O
//! - Is deterministic: `BTreeMap` storage only, stable iteration order
//! - Is single-threaded: a settlement pass owns the whole graph
//! - Is closed: the editor, persistence and rendering layers sit above it
//!   and drive it only through [`Network`]

// =============================================================================
// MODULES
// =============================================================================

pub mod graph;
pub mod layout;
pub mod link;
pub mod node;
pub mod primitives;
mod settle;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{FluxError, LinkId, NodeId, NodeKind, PortRole};

// =============================================================================
// RE-EXPORTS: Flow Engine
// =============================================================================

pub use graph::Network;
pub use layout::{LinkSpec, NetworkLayout, NodeSpec};
pub use link::Link;
pub use node::{
    InputPort, MergerNode, Node, OutputPort, PortFull, ProcessorNode, SinkNode, SourceNode,
    SplitterNode,
};
