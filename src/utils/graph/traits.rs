//! Trait definitions for graph abstractions.
//!
//! The analysis algorithms in [`crate::utils::graph::algorithms`] are written against
//! these traits rather than against [`crate::analysis::ControlFlowGraph`] directly, so
//! they can run on synthetic graphs in tests and property checks as well.
//!
//! - [`GraphBase`] - Core properties: node count and node iteration
//! - [`Successors`] - Forward edge traversal (outgoing edges)
//! - [`Predecessors`] - Backward edge traversal (incoming edges)
//!
//! All adjacency queries return iterators. Implementations must tolerate queries for
//! nodes that are out of range by yielding nothing, because externally assembled
//! control flow graphs may reference blocks that do not exist.

use crate::utils::graph::NodeId;

/// Base trait providing core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    ///
    /// Node ids are dense, so every valid id satisfies `id.index() < node_count()`.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node identifiers in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs that support forward edge traversal.
pub trait Successors: GraphBase {
    /// Returns an iterator over the successor nodes of the given node.
    ///
    /// Successors that are out of range for the graph must not be yielded.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs that support backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the predecessor nodes of the given node.
    ///
    /// Predecessors that are out of range for the graph must not be yielded.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A minimal adjacency-list graph used by the algorithm tests.
    pub(crate) struct TestGraph {
        successors: Vec<Vec<NodeId>>,
        predecessors: Vec<Vec<NodeId>>,
    }

    impl TestGraph {
        pub(crate) fn new(node_count: usize, edges: &[(usize, usize)]) -> Self {
            let mut successors = vec![Vec::new(); node_count];
            let mut predecessors = vec![Vec::new(); node_count];
            for &(from, to) in edges {
                successors[from].push(NodeId::new(to));
                predecessors[to].push(NodeId::new(from));
            }
            TestGraph {
                successors,
                predecessors,
            }
        }
    }

    impl GraphBase for TestGraph {
        fn node_count(&self) -> usize {
            self.successors.len()
        }

        fn node_ids(&self) -> impl Iterator<Item = NodeId> {
            (0..self.successors.len()).map(NodeId::new)
        }
    }

    impl Successors for TestGraph {
        fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.successors
                .get(node.index())
                .into_iter()
                .flatten()
                .copied()
        }
    }

    impl Predecessors for TestGraph {
        fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.predecessors
                .get(node.index())
                .into_iter()
                .flatten()
                .copied()
        }
    }

    #[test]
    fn test_graph_adjacency() {
        let graph = TestGraph::new(3, &[(0, 1), (0, 2), (1, 2)]);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.successors(NodeId::new(0)).count(), 2);
        assert_eq!(
            graph.predecessors(NodeId::new(2)).collect::<Vec<_>>(),
            vec![NodeId::new(0), NodeId::new(1)]
        );
        assert_eq!(graph.successors(NodeId::new(9)).count(), 0);
    }
}
