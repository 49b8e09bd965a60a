//! Graph infrastructure for control flow analysis.
//!
//! This module provides the identifiers, traits and algorithms the analysis passes
//! share. The control flow graph in [`crate::analysis::cfg`] implements the traits;
//! the algorithms only ever see them.
//!
//! # Key Components
//!
//! - [`NodeId`] - Strongly-typed node (basic block) identifier
//! - [`GraphBase`], [`Successors`], [`Predecessors`] - Adjacency abstractions
//! - [`algorithms`] - Traversals, dominator computation and dominance frontiers
//!
//! # Design Principles
//!
//! ## Strongly-Typed Identifiers
//!
//! Node identifiers use a newtype wrapper to prevent accidental mixing of block ids
//! and instruction indices.
//!
//! ## Iterative Algorithms
//!
//! Every traversal uses an explicit stack or queue, so pathological functions with
//! very deep control flow cannot exhaust the call stack.
//!
//! # Thread Safety
//!
//! All types in this module are [`Send`] and [`Sync`].

mod node;
mod traits;

pub mod algorithms;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, Successors};

#[cfg(test)]
pub(crate) use traits::tests::TestGraph;
