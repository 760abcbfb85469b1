//! # Node Variants
//!
//! The five participants of the propagation protocol, each a
//! capability-restricted struct owning its own link-list fields:
//!
//! | Variant   | Max inputs | Max outputs |
//! |-----------|------------|-------------|
//! | Source    | 0          | 1           |
//! | Sink      | 1          | 0           |
//! | Splitter  | 1          | 3           |
//! | Merger    | 3          | 1           |
//! | Processor | 1          | 1           |
//!
//! Capability is expressed through two independent traits: [`InputPort`]
//! (the node accepts flow from attaching links) and [`OutputPort`] (the
//! node feeds attaching links). Each variant implements only the role(s)
//! it has; [`Node`] is the tagged union the engine branches on.

use crate::primitives::{MAX_FAN_IN, MAX_FAN_OUT};
use crate::{LinkId, NodeKind, PortRole};

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// A degree limit was hit while attaching a link.
///
/// Carries no node identity; [`crate::graph::Network::connect`] adds the
/// `NodeId` when converting this into
/// [`crate::FluxError::CapacityExceeded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortFull {
    /// Which side of the node was full.
    pub role: PortRole,
    /// The variant's fixed maximum for that side.
    pub limit: usize,
}

/// Input capability: the node can accept flow from attaching links.
pub trait InputPort {
    /// Register an incoming link, failing when the variant's fixed input
    /// maximum is already reached.
    fn attach_input(&mut self, link: LinkId) -> Result<(), PortFull>;

    /// Deregister an incoming link. Unknown links are ignored.
    fn detach_input(&mut self, link: LinkId);

    /// The currently attached incoming links.
    fn input_links(&self) -> Vec<LinkId>;
}

/// Output capability: the node can feed flow into attaching links.
pub trait OutputPort {
    /// Register an outgoing link, failing when the variant's fixed output
    /// maximum is already reached.
    fn attach_output(&mut self, link: LinkId) -> Result<(), PortFull>;

    /// Deregister an outgoing link. Unknown links are ignored.
    fn detach_output(&mut self, link: LinkId);

    /// The currently attached outgoing links.
    fn output_links(&self) -> Vec<LinkId>;
}

/// Attach into a single-link slot, enforcing a limit of one.
fn attach_slot(slot: &mut Option<LinkId>, link: LinkId, role: PortRole) -> Result<(), PortFull> {
    if slot.is_some() {
        return Err(PortFull { role, limit: 1 });
    }
    *slot = Some(link);
    Ok(())
}

/// Detach from a single-link slot. Unknown links are ignored.
fn detach_slot(slot: &mut Option<LinkId>, link: LinkId) {
    if *slot == Some(link) {
        *slot = None;
    }
}

// =============================================================================
// SOURCE
// =============================================================================

/// Terminus node emitting a fixed, unconstrained supply rate.
///
/// A Source cannot be told to slow down: it represents an external supply,
/// so backward signals terminate here.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode {
    /// The fixed emission rate pushed into the outgoing link.
    pub(crate) rate: f64,
    pub(crate) output: Option<LinkId>,
}

impl SourceNode {
    /// Create a source emitting at the given fixed rate.
    #[must_use]
    pub(crate) const fn new(rate: f64) -> Self {
        Self { rate, output: None }
    }

    /// The fixed emission rate.
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.rate
    }
}

impl OutputPort for SourceNode {
    fn attach_output(&mut self, link: LinkId) -> Result<(), PortFull> {
        attach_slot(&mut self.output, link, PortRole::Output)
    }

    fn detach_output(&mut self, link: LinkId) {
        detach_slot(&mut self.output, link);
    }

    fn output_links(&self) -> Vec<LinkId> {
        self.output.into_iter().collect()
    }
}

// =============================================================================
// SINK
// =============================================================================

/// Terminus node consuming flow, optionally capped at a maximum intake rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkNode {
    /// Maximum intake rate; `f64::INFINITY` when unbounded.
    pub(crate) max_intake: f64,
    pub(crate) input: Option<LinkId>,
}

impl SinkNode {
    /// Create a sink that accepts any rate.
    #[must_use]
    pub(crate) const fn unbounded() -> Self {
        Self {
            max_intake: f64::INFINITY,
            input: None,
        }
    }

    /// Create a sink that refuses intake above `max_intake`.
    #[must_use]
    pub(crate) const fn capped(max_intake: f64) -> Self {
        Self {
            max_intake,
            input: None,
        }
    }

    /// The maximum intake rate, `f64::INFINITY` when unbounded.
    #[must_use]
    pub const fn max_intake(&self) -> f64 {
        self.max_intake
    }
}

impl InputPort for SinkNode {
    fn attach_input(&mut self, link: LinkId) -> Result<(), PortFull> {
        attach_slot(&mut self.input, link, PortRole::Input)
    }

    fn detach_input(&mut self, link: LinkId) {
        detach_slot(&mut self.input, link);
    }

    fn input_links(&self) -> Vec<LinkId> {
        self.input.into_iter().collect()
    }
}

// =============================================================================
// SPLITTER
// =============================================================================

/// Divides one incoming flow fairly across up to three outgoing links.
///
/// Carries no configuration beyond its link lists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitterNode {
    pub(crate) input: Option<LinkId>,
    pub(crate) outputs: Vec<LinkId>,
}

impl InputPort for SplitterNode {
    fn attach_input(&mut self, link: LinkId) -> Result<(), PortFull> {
        attach_slot(&mut self.input, link, PortRole::Input)
    }

    fn detach_input(&mut self, link: LinkId) {
        detach_slot(&mut self.input, link);
    }

    fn input_links(&self) -> Vec<LinkId> {
        self.input.into_iter().collect()
    }
}

impl OutputPort for SplitterNode {
    fn attach_output(&mut self, link: LinkId) -> Result<(), PortFull> {
        if self.outputs.len() == MAX_FAN_OUT {
            return Err(PortFull {
                role: PortRole::Output,
                limit: MAX_FAN_OUT,
            });
        }
        self.outputs.push(link);
        Ok(())
    }

    fn detach_output(&mut self, link: LinkId) {
        self.outputs.retain(|&l| l != link);
    }

    fn output_links(&self) -> Vec<LinkId> {
        self.outputs.clone()
    }
}

// =============================================================================
// MERGER
// =============================================================================

/// Combines up to three incoming flows into one outgoing link.
///
/// Carries no configuration beyond its link lists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergerNode {
    pub(crate) inputs: Vec<LinkId>,
    pub(crate) output: Option<LinkId>,
}

impl InputPort for MergerNode {
    fn attach_input(&mut self, link: LinkId) -> Result<(), PortFull> {
        if self.inputs.len() == MAX_FAN_IN {
            return Err(PortFull {
                role: PortRole::Input,
                limit: MAX_FAN_IN,
            });
        }
        self.inputs.push(link);
        Ok(())
    }

    fn detach_input(&mut self, link: LinkId) {
        self.inputs.retain(|&l| l != link);
    }

    fn input_links(&self) -> Vec<LinkId> {
        self.inputs.clone()
    }
}

impl OutputPort for MergerNode {
    fn attach_output(&mut self, link: LinkId) -> Result<(), PortFull> {
        attach_slot(&mut self.output, link, PortRole::Output)
    }

    fn detach_output(&mut self, link: LinkId) {
        detach_slot(&mut self.output, link);
    }

    fn output_links(&self) -> Vec<LinkId> {
        self.output.into_iter().collect()
    }
}

// =============================================================================
// PROCESSOR
// =============================================================================

/// Converts input flow to output flow at a fixed ratio, each side
/// independently capped.
///
/// The conversion ratio is `max_output_rate / max_input_rate`. Rates are
/// not validated (a zero input rating yields the same IEEE-754 artifacts
/// the negotiation protocol would see anywhere else).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorNode {
    pub(crate) max_input_rate: f64,
    pub(crate) max_output_rate: f64,
    pub(crate) input: Option<LinkId>,
    pub(crate) output: Option<LinkId>,
}

impl ProcessorNode {
    /// Create a processor with the given side ratings.
    #[must_use]
    pub(crate) const fn new(max_input_rate: f64, max_output_rate: f64) -> Self {
        Self {
            max_input_rate,
            max_output_rate,
            input: None,
            output: None,
        }
    }

    /// Maximum rate the input side can consume.
    #[must_use]
    pub const fn max_input_rate(&self) -> f64 {
        self.max_input_rate
    }

    /// Maximum rate the output side can emit.
    #[must_use]
    pub const fn max_output_rate(&self) -> f64 {
        self.max_output_rate
    }
}

impl InputPort for ProcessorNode {
    fn attach_input(&mut self, link: LinkId) -> Result<(), PortFull> {
        attach_slot(&mut self.input, link, PortRole::Input)
    }

    fn detach_input(&mut self, link: LinkId) {
        detach_slot(&mut self.input, link);
    }

    fn input_links(&self) -> Vec<LinkId> {
        self.input.into_iter().collect()
    }
}

impl OutputPort for ProcessorNode {
    fn attach_output(&mut self, link: LinkId) -> Result<(), PortFull> {
        attach_slot(&mut self.output, link, PortRole::Output)
    }

    fn detach_output(&mut self, link: LinkId) {
        detach_slot(&mut self.output, link);
    }

    fn output_links(&self) -> Vec<LinkId> {
        self.output.into_iter().collect()
    }
}

// =============================================================================
// TAGGED UNION
// =============================================================================

/// A node in the flow network: the tagged union over the five variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Fixed-rate supply terminus.
    Source(SourceNode),
    /// Consumption terminus.
    Sink(SinkNode),
    /// 1-in, up-to-3-out fair divider.
    Splitter(SplitterNode),
    /// Up-to-3-in, 1-out combiner.
    Merger(MergerNode),
    /// 1-in, 1-out fixed-ratio converter.
    Processor(ProcessorNode),
}

impl Node {
    /// The variant tag, for code that must branch on node kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Source(_) => NodeKind::Source,
            Self::Sink(_) => NodeKind::Sink,
            Self::Splitter(_) => NodeKind::Splitter,
            Self::Merger(_) => NodeKind::Merger,
            Self::Processor(_) => NodeKind::Processor,
        }
    }

    /// The node's input capability, if the variant has one.
    #[must_use]
    pub fn as_input(&self) -> Option<&dyn InputPort> {
        match self {
            Self::Source(_) => None,
            Self::Sink(n) => Some(n),
            Self::Splitter(n) => Some(n),
            Self::Merger(n) => Some(n),
            Self::Processor(n) => Some(n),
        }
    }

    /// The node's mutable input capability, if the variant has one.
    pub(crate) fn as_input_mut(&mut self) -> Option<&mut dyn InputPort> {
        match self {
            Self::Source(_) => None,
            Self::Sink(n) => Some(n),
            Self::Splitter(n) => Some(n),
            Self::Merger(n) => Some(n),
            Self::Processor(n) => Some(n),
        }
    }

    /// The node's output capability, if the variant has one.
    #[must_use]
    pub fn as_output(&self) -> Option<&dyn OutputPort> {
        match self {
            Self::Source(n) => Some(n),
            Self::Sink(_) => None,
            Self::Splitter(n) => Some(n),
            Self::Merger(n) => Some(n),
            Self::Processor(n) => Some(n),
        }
    }

    /// The node's mutable output capability, if the variant has one.
    pub(crate) fn as_output_mut(&mut self) -> Option<&mut dyn OutputPort> {
        match self {
            Self::Source(n) => Some(n),
            Self::Sink(_) => None,
            Self::Splitter(n) => Some(n),
            Self::Merger(n) => Some(n),
            Self::Processor(n) => Some(n),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
