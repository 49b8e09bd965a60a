//! Graph algorithms for control flow analysis.
//!
//! # Available Algorithms
//!
//! ## Traversal
//!
//! - [`dfs`] - Depth-first search traversal
//! - [`bfs`] - Breadth-first search traversal
//! - [`reverse_postorder`] - Reverse postorder traversal (forward data flow)
//! - [`postorder`] - Postorder traversal
//! - [`rpo_numbering`] - Reverse postorder position per node
//!
//! ## Dominator Analysis
//!
//! - [`compute_dominators`] - Iterative dominator fixed point over reverse postorder
//! - [`compute_dominance_frontiers`] - Dominance frontiers
//! - [`DominatorTree`] - Result of dominator computation
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | DFS/BFS | O(V + E) | General traversal, reachability |
//! | Dominators | O(passes × (V + E)) | Loop analysis |
//! | Frontiers | O(V + E × depth) | Join point detection |

mod dominators;
mod traversal;

pub use dominators::{
    compute_dominance_frontiers, compute_dominators, DominatorChain, DominatorTree,
};
pub use traversal::{
    bfs, dfs, postorder, reverse_postorder, rpo_numbering, BfsIterator, DfsIterator,
};
