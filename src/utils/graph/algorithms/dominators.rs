//! Dominator tree computation using the iterative Cooper-Harvey-Kennedy algorithm.
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n`
//! must pass through `d`. The **immediate dominator** of `n` (idom(n)) is the
//! unique node that strictly dominates `n` but does not strictly dominate any
//! other dominator of `n`.
//!
//! # Algorithm
//!
//! The entry node is initialised as its own dominator. The remaining reachable nodes are
//! visited in reverse postorder, and each node's immediate dominator is recomputed as the
//! intersection of all predecessors that already have a dominator. Intersection walks both
//! dominator chains up towards the entry and returns the first common ancestor. The passes
//! repeat until a full pass changes nothing.
//!
//! Control flow graphs of 8-bit programs are small, so the simple fixed point beats the
//! bookkeeping of Lengauer-Tarjan in practice. Reverse postorder usually converges within
//! two passes on reducible graphs.
//!
//! Nodes that are unreachable from the entry never receive a dominator. Callers must read
//! a missing dominator as "unreachable", not as an error.

use std::collections::BTreeSet;

use crate::utils::graph::{
    algorithms::traversal::{reverse_postorder, rpo_numbering},
    NodeId, Predecessors, Successors,
};

/// Result of dominator tree computation.
///
/// Each reachable node except the entry has exactly one immediate dominator.
///
/// # Examples
///
/// ```rust
/// use ilscope::prelude::*;
/// use ilscope::utils::graph::algorithms::compute_dominators;
///
/// let mut builder = FunctionBuilder::new("main");
/// builder
///     .branch("next")
///     .label("next")
///     .ret(None);
/// let cfg = ControlFlowGraph::build(&builder.build());
///
/// let tree = compute_dominators(&cfg, NodeId::new(0));
/// assert!(tree.dominates(NodeId::new(0), NodeId::new(1)));
/// assert_eq!(tree.immediate_dominator(NodeId::new(1)), Some(NodeId::new(0)));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: NodeId,
    /// Immediate dominator per node index. The entry maps to itself, unreachable nodes to `None`.
    idom: Vec<Option<NodeId>>,
}

impl DominatorTree {
    /// Returns the entry (root) node of the dominator tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Number of nodes in the graph this tree was computed for.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }

    /// Returns the immediate dominator of a node.
    ///
    /// `None` for the entry, for unreachable nodes and for out-of-range ids.
    #[inline]
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.entry {
            return None;
        }
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if the node was reached from the entry.
    #[inline]
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        matches!(self.idom.get(node.index()), Some(Some(_)))
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A reachable node dominates itself. Nothing dominates an unreachable node.
    ///
    /// # Complexity
    ///
    /// O(depth) where depth is the depth of `b` in the dominator tree.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if !self.is_reachable(b) {
            return false;
        }
        self.dominators(b).any(|d| d == a)
    }

    /// Checks if node `a` strictly dominates node `b` (dominates and a ≠ b).
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Iterates the dominator chain of `node`, from the node itself up to the entry.
    ///
    /// The chain is empty for unreachable nodes and holds exactly one element for the entry.
    pub fn dominators(&self, node: NodeId) -> DominatorChain<'_> {
        DominatorChain {
            tree: self,
            current: self.is_reachable(node).then_some(node),
        }
    }

    /// Depth of `node` in the dominator tree. The entry has depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> Option<usize> {
        if !self.is_reachable(node) {
            return None;
        }
        Some(self.dominators(node).count() - 1)
    }

    /// Nodes whose immediate dominator is `node`, in ascending id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.idom
            .iter()
            .enumerate()
            .filter_map(|(index, idom)| {
                let candidate = NodeId::new(index);
                (candidate != self.entry && *idom == Some(node)).then_some(candidate)
            })
            .collect()
    }
}

/// Iterator over a dominator chain, see [`DominatorTree::dominators`].
pub struct DominatorChain<'t> {
    tree: &'t DominatorTree,
    current: Option<NodeId>,
}

impl Iterator for DominatorChain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = self.tree.immediate_dominator(node);
        Some(node)
    }
}

/// Computes the dominator tree of `graph` rooted at `entry`.
///
/// # Complexity
///
/// O(passes × (V + E) × depth). Reducible graphs converge within two or three passes.
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    let mut idom: Vec<Option<NodeId>> = vec![None; node_count];
    if entry.index() >= node_count {
        return DominatorTree { entry, idom };
    }

    let order = reverse_postorder(graph, entry);
    let numbering = rpo_numbering(graph, entry);
    idom[entry.index()] = Some(entry);

    let mut changed = true;
    while changed {
        changed = false;
        for &node in order.iter().skip(1) {
            let mut new_idom: Option<NodeId> = None;
            for pred in graph.predecessors(node) {
                if idom.get(pred.index()).copied().flatten().is_none() {
                    continue;
                }
                new_idom = Some(match new_idom {
                    None => pred,
                    Some(current) => intersect(&idom, &numbering, pred, current),
                });
            }

            if new_idom.is_some() && idom[node.index()] != new_idom {
                idom[node.index()] = new_idom;
                changed = true;
            }
        }
    }

    DominatorTree { entry, idom }
}

/// Walks both dominator chains up to their first common ancestor.
fn intersect(
    idom: &[Option<NodeId>],
    numbering: &[Option<usize>],
    mut a: NodeId,
    mut b: NodeId,
) -> NodeId {
    let position = |n: NodeId| numbering[n.index()].unwrap_or(usize::MAX);

    while a != b {
        while position(a) > position(b) {
            match idom[a.index()] {
                Some(next) if next != a => a = next,
                _ => return b,
            }
        }
        while position(b) > position(a) {
            match idom[b.index()] {
                Some(next) if next != b => b = next,
                _ => return a,
            }
        }
    }
    a
}

/// Computes the dominance frontier of every node.
///
/// The frontier of `n` is the set of nodes where the dominance of `n` ends: nodes with a
/// predecessor dominated by `n` that are not strictly dominated by `n` themselves. The
/// result is indexed by [`NodeId::index`]; unreachable nodes have empty frontiers.
pub fn compute_dominance_frontiers<G>(graph: &G, dom_tree: &DominatorTree) -> Vec<BTreeSet<NodeId>>
where
    G: Predecessors,
{
    let n = graph.node_count();
    let mut frontiers: Vec<BTreeSet<NodeId>> = vec![BTreeSet::new(); n];

    for node_idx in 0..n {
        let node = NodeId::new(node_idx);
        if !dom_tree.is_reachable(node) {
            continue;
        }

        let preds: Vec<NodeId> = graph
            .predecessors(node)
            .filter(|p| dom_tree.is_reachable(*p))
            .collect();
        if preds.len() < 2 {
            continue;
        }

        let idom_node = dom_tree.immediate_dominator(node);
        for pred in preds {
            let mut runner = Some(pred);
            while let Some(current) = runner {
                if Some(current) == idom_node {
                    break;
                }
                frontiers[current.index()].insert(node);
                runner = dom_tree.immediate_dominator(current);
            }
        }
    }

    frontiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::TestGraph;

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    #[test]
    fn test_linear_chain() {
        let graph = TestGraph::new(3, &[(0, 1), (1, 2)]);
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(0)), None);
        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
        assert_eq!(tree.immediate_dominator(n(2)), Some(n(1)));
        assert_eq!(tree.depth(n(2)), Some(2));
        assert_eq!(tree.dominators(n(0)).count(), 1);
    }

    #[test]
    fn test_diamond() {
        let graph = TestGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(3)), Some(n(0)));
        assert!(!tree.dominates(n(1), n(3)));
        assert!(tree.strictly_dominates(n(0), n(3)));
        assert_eq!(tree.children(n(0)), vec![n(1), n(2), n(3)]);
    }

    #[test]
    fn test_loop() {
        // 0 -> 1 -> 2 -> 1, 1 -> 3
        let graph = TestGraph::new(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let tree = compute_dominators(&graph, n(0));

        assert!(tree.dominates(n(1), n(2)));
        assert!(tree.dominates(n(1), n(3)));
        assert!(!tree.dominates(n(2), n(1)));
    }

    #[test]
    fn test_irreducible_entries() {
        // Two entries into the 1 <-> 2 cycle
        let graph = TestGraph::new(3, &[(0, 1), (0, 2), (1, 2), (2, 1)]);
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
        assert_eq!(tree.immediate_dominator(n(2)), Some(n(0)));
    }

    #[test]
    fn test_unreachable_nodes_have_no_dominator() {
        let graph = TestGraph::new(3, &[(0, 1), (2, 1)]);
        let tree = compute_dominators(&graph, n(0));

        assert!(!tree.is_reachable(n(2)));
        assert_eq!(tree.immediate_dominator(n(2)), None);
        assert_eq!(tree.depth(n(2)), None);
        assert!(!tree.dominates(n(0), n(2)));
        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
    }

    #[test]
    fn test_dominance_frontiers_diamond() {
        let graph = TestGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let tree = compute_dominators(&graph, n(0));
        let frontiers = compute_dominance_frontiers(&graph, &tree);

        assert!(frontiers[0].is_empty());
        assert_eq!(frontiers[1], BTreeSet::from([n(3)]));
        assert_eq!(frontiers[2], BTreeSet::from([n(3)]));
        assert!(frontiers[3].is_empty());
    }

    #[test]
    fn test_dominance_frontiers_loop_header() {
        let graph = TestGraph::new(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let tree = compute_dominators(&graph, n(0));
        let frontiers = compute_dominance_frontiers(&graph, &tree);

        assert_eq!(frontiers[2], BTreeSet::from([n(1)]));
        assert_eq!(frontiers[1], BTreeSet::from([n(1)]));
    }
}
