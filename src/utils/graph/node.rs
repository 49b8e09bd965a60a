//! Node identifier for analysis graphs.
//!
//! [`NodeId`] identifies basic blocks in a control flow graph and nodes in any other
//! graph implementing the [`crate::utils::graph::GraphBase`] family of traits. Ids are
//! dense: a graph with `n` nodes uses ids `0..n`, which lets algorithms index plain
//! vectors by [`NodeId::index`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A strongly-typed identifier for a node (basic block) within a graph.
///
/// `NodeId` wraps a `usize` index so block ids cannot be confused with instruction
/// indices or instruction ids, which are plain integers throughout the IL model.
///
/// # Examples
///
/// ```rust
/// use ilscope::utils::graph::NodeId;
///
/// let block = NodeId::new(3);
/// assert_eq!(block.index(), 3);
/// assert_eq!(block.to_string(), "B3");
/// ```
///
/// # Serialization
///
/// Serializes transparently as the bare index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw 0-based index of this node.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_node_id_roundtrip_index() {
        let node = NodeId::new(42);
        assert_eq!(node.index(), 42);
        assert_eq!(usize::from(node), 42);
        assert_eq!(NodeId::from(42usize), node);
    }

    #[test]
    fn test_node_id_ordering_in_sets() {
        let set: BTreeSet<NodeId> = [NodeId::new(3), NodeId::new(1), NodeId::new(2)]
            .into_iter()
            .collect();
        let ordered: Vec<usize> = set.into_iter().map(NodeId::index).collect();
        assert_eq!(ordered, vec![1, 2, 3]);
    }

    #[test]
    fn test_node_id_formatting() {
        assert_eq!(format!("{:?}", NodeId::new(7)), "NodeId(7)");
        assert_eq!(format!("{}", NodeId::new(7)), "B7");
    }
}
