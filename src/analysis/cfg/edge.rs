//! Control flow edge types for the CFG.
//!
//! Edges carry the control transfer that produced them, so loop and timing analyses
//! can tell taken branches from fall-through paths.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::utils::graph::NodeId;

/// The kind of control flow represented by an edge.
///
/// # Examples
///
/// ```rust
/// use ilscope::analysis::CfgEdgeKind;
///
/// assert!(CfgEdgeKind::ConditionalTrue.is_conditional());
/// assert!(!CfgEdgeKind::CallContinuation.is_conditional());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CfgEdgeKind {
    /// Target of an unconditional `Branch`.
    Unconditional,

    /// The path taken when the branch condition holds.
    ///
    /// For `BranchIfTrue` this is the label target, for `BranchIfFalse` the fall-through.
    ConditionalTrue,

    /// The path taken when the branch condition does not hold.
    ///
    /// For `BranchIfFalse` this is the label target, for `BranchIfTrue` the fall-through.
    ConditionalFalse,

    /// Sequential flow into the next block after a non-transferring instruction.
    FallThrough,

    /// Continuation after a `Call` returns. The callee is not part of this graph.
    CallContinuation,
}

impl CfgEdgeKind {
    /// Returns `true` for [`ConditionalTrue`](Self::ConditionalTrue) and
    /// [`ConditionalFalse`](Self::ConditionalFalse).
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionalTrue | Self::ConditionalFalse)
    }

    /// Returns `true` if the edge follows an explicit branch instruction.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(
            self,
            Self::Unconditional | Self::ConditionalTrue | Self::ConditionalFalse
        )
    }

    /// DOT edge colour.
    pub(crate) const fn dot_color(&self) -> &'static str {
        match self {
            Self::Unconditional => "black",
            Self::ConditionalTrue => "green",
            Self::ConditionalFalse => "red",
            Self::FallThrough => "gray40",
            Self::CallContinuation => "blue",
        }
    }
}

/// A directed control flow edge between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CfgEdge {
    /// Source block
    pub source: NodeId,
    /// Target block
    pub target: NodeId,
    /// Control transfer kind
    pub kind: CfgEdgeKind,
}

impl CfgEdge {
    /// Creates a new edge.
    #[must_use]
    pub const fn new(source: NodeId, target: NodeId, kind: CfgEdgeKind) -> Self {
        CfgEdge {
            source,
            target,
            kind,
        }
    }
}
