//! Dominance analysis over a [`ControlFlowGraph`].
//!
//! [`DominanceTree`] is the serialisable record of the dominator relation of one
//! function: immediate dominators, the tree shape (parents, children, depths) and the
//! dominance frontiers. It is computed with
//! [`crate::utils::graph::algorithms::compute_dominators`].
//!
//! Unreachable blocks have no entry in any of the maps. A missing entry means
//! "unreachable", never "error".

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    analysis::ControlFlowGraph,
    utils::graph::{
        algorithms::{compute_dominance_frontiers, compute_dominators},
        GraphBase, NodeId,
    },
};

/// Dominator tree of one control flow graph.
///
/// # Invariants
///
/// - The entry is its own immediate dominator and has depth 0.
/// - Every other reachable block has exactly one immediate dominator, its `parent`.
/// - `depth[b] == depth[parent[b]] + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominanceTree {
    /// Entry block, `None` for an empty graph
    pub entry: Option<NodeId>,
    /// Immediate dominator per reachable block; the entry maps to itself
    pub idom: BTreeMap<NodeId, NodeId>,
    /// Tree parent per reachable non-entry block
    pub parent: BTreeMap<NodeId, NodeId>,
    /// Tree children per reachable block
    pub children: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Tree depth per reachable block
    pub depth: BTreeMap<NodeId, usize>,
    /// Dominance frontier per reachable block
    pub frontiers: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl DominanceTree {
    /// Computes the dominance tree of `cfg`.
    #[must_use]
    pub fn compute(cfg: &ControlFlowGraph) -> Self {
        let Some(entry) = cfg.entry() else {
            return DominanceTree::default();
        };
        if entry.index() >= cfg.node_count() {
            return DominanceTree {
                entry: Some(entry),
                ..DominanceTree::default()
            };
        }

        let dominators = compute_dominators(cfg, entry);
        let frontiers = compute_dominance_frontiers(cfg, &dominators);

        let mut tree = DominanceTree {
            entry: Some(entry),
            ..DominanceTree::default()
        };

        for node in cfg.node_ids() {
            if !dominators.is_reachable(node) {
                continue;
            }
            let idom = dominators.immediate_dominator(node).unwrap_or(entry);
            tree.idom.insert(node, idom);
            tree.children.entry(node).or_default();
            if node != entry {
                tree.parent.insert(node, idom);
                tree.children.entry(idom).or_default().insert(node);
            }
            tree.depth.insert(node, dominators.depth(node).unwrap_or(0));
            tree.frontiers
                .insert(node, frontiers.get(node.index()).cloned().unwrap_or_default());
        }

        tree
    }

    /// Immediate dominator of `node`. The entry is its own immediate dominator.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(&node).copied()
    }

    /// Returns `true` if `node` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.idom.contains_key(&node)
    }

    /// Dominator chain of `node`, from the node itself up to the entry.
    ///
    /// Empty for unreachable blocks. The walk is bounded by the number of blocks in the
    /// tree, so a corrupted (deserialised) tree cannot make it spin forever.
    #[must_use]
    pub fn dominator_chain(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = node;
        while let Some(&idom) = self.idom.get(&current) {
            chain.push(current);
            if idom == current || chain.len() > self.idom.len() {
                break;
            }
            current = idom;
        }
        chain
    }

    /// Returns `true` if `a` dominates `b`. Every reachable block dominates itself.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dominator_chain(b).contains(&a)
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Number of reachable blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.idom.len()
    }

    /// Returns `true` if no block is reachable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idom.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{FunctionBuilder, IlOpcode, IlValue};

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn if_else() -> ControlFlowGraph {
        let cond = IlValue::temp(0);
        let mut builder = FunctionBuilder::new("if_else");
        builder
            .binary(IlOpcode::CompareEq, cond.clone(), IlValue::temp(1), IlValue::byte(0))
            .branch_if_false(cond, "else")
            .nop()
            .branch("end")
            .label("else")
            .nop()
            .label("end")
            .ret(None);
        ControlFlowGraph::build(&builder.build())
    }

    #[test]
    fn test_entry_is_own_dominator() {
        let tree = DominanceTree::compute(&if_else());
        assert_eq!(tree.immediate_dominator(n(0)), Some(n(0)));
        assert_eq!(tree.depth[&n(0)], 0);
        assert_eq!(tree.dominator_chain(n(0)), vec![n(0)]);
        assert!(!tree.parent.contains_key(&n(0)));
    }

    #[test]
    fn test_join_block_is_dominated_by_entry() {
        let tree = DominanceTree::compute(&if_else());
        assert_eq!(tree.immediate_dominator(n(3)), Some(n(0)));
        assert_eq!(tree.children[&n(0)], BTreeSet::from([n(1), n(2), n(3)]));
        assert_eq!(tree.frontiers[&n(1)], BTreeSet::from([n(3)]));
        assert!(!tree.dominates(n(1), n(3)));
    }

    #[test]
    fn test_unreachable_blocks_are_absent() {
        let mut builder = FunctionBuilder::new("dead");
        builder.ret(None).nop().ret(None);
        let tree = DominanceTree::compute(&ControlFlowGraph::build(&builder.build()));

        assert!(tree.is_reachable(n(0)));
        assert!(!tree.is_reachable(n(1)));
        assert!(tree.dominator_chain(n(1)).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_empty_graph() {
        let cfg = ControlFlowGraph::build(&crate::il::IlFunction::new("e"));
        let tree = DominanceTree::compute(&cfg);
        assert!(tree.is_empty());
        assert_eq!(tree.entry, None);
    }
}
