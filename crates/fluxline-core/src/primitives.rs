//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Fluxline engine.
//!
//! These values are compiled into the binary and are immutable at runtime.

/// Default physical capacity for a link when `connect` is called without an
/// explicit ceiling, in abstract rate units.
pub const DEFAULT_LINK_CAPACITY: f64 = 450.0;

/// Maximum number of incoming links any variant supports (the Merger).
///
/// Individual variants enforce tighter limits; see the degree table on
/// [`crate::node::Node`].
pub const MAX_FAN_IN: usize = 3;

/// Maximum number of outgoing links any variant supports (the Splitter).
pub const MAX_FAN_OUT: usize = 3;

/// Recursion ceiling for a single settlement pass, checked with
/// `debug_assert!` only.
///
/// Convergence relies on the per-link value-equality guard, not on a visited
/// set or iteration cap. A graph whose fair-share negotiation never repeats
/// a value would recurse without bound; debug builds trip this assertion
/// instead of overflowing the stack. Release builds preserve the
/// run-to-completion contract.
pub const MAX_PROPAGATION_DEPTH: usize = 4096;
