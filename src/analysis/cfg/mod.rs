//! Control Flow Graph (CFG) construction.
//!
//! # Key Components
//!
//! - [`ControlFlowGraph`] - Blocks, edges, entry and exits of one IL function
//! - [`BasicBlock`] - Leader-delimited instruction run with predecessor/successor sets
//! - [`CfgEdge`] - Edge with control transfer semantics
//! - [`CfgEdgeKind`] - Unconditional, conditional true/false, fall-through, call continuation
//!
//! The graph implements the [`crate::utils::graph`] traits, so traversals and the
//! dominator computation run on it directly.
//!
//! # Thread Safety
//!
//! [`ControlFlowGraph`] is immutable after construction and is [`Send`] and [`Sync`].

mod block;
mod edge;
mod graph;

pub use block::BasicBlock;
pub use edge::{CfgEdge, CfgEdgeKind};
pub use graph::ControlFlowGraph;
