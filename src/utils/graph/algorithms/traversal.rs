//! Graph traversal algorithms.
//!
//! - [`dfs`] - Iterative depth-first search (pre-order)
//! - [`bfs`] - Breadth-first search
//! - [`postorder`] - Depth-first search with post-order visitation
//! - [`reverse_postorder`] - Reverse post-order (forward data flow, dominators)
//! - [`rpo_numbering`] - Position of every reachable node in reverse post-order
//!
//! [`dfs`] and [`bfs`] return lazy iterators; the order-based functions return
//! collected vectors since the order requires a full traversal anyway. Every
//! traversal only visits nodes reachable from the start node, which is how the
//! analyses separate reachable blocks from dead ones.

use std::collections::VecDeque;

use crate::utils::graph::{NodeId, Successors};

/// Depth-first search iterator over graph nodes, in pre-order.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return DfsIterator {
                graph,
                stack: Vec::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;

        DfsIterator {
            graph,
            stack: vec![start],
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        // Reverse push keeps the successor order of the graph
        let successors: Vec<NodeId> = self.graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if let Some(seen) = self.visited.get_mut(succ.index()) {
                if !*seen {
                    *seen = true;
                    self.stack.push(succ);
                }
            }
        }

        Some(node)
    }
}

/// Returns a depth-first search iterator starting from the given node.
///
/// Each reachable node is visited exactly once, before its descendants. An
/// out-of-range start node yields an empty traversal.
///
/// # Examples
///
/// ```rust
/// use ilscope::prelude::*;
/// use ilscope::utils::graph::algorithms::dfs;
///
/// let mut builder = FunctionBuilder::new("main");
/// builder.load_immediate(IlValue::temp(0), IlValue::byte(1)).ret(None);
/// let cfg = ControlFlowGraph::build(&builder.build());
///
/// let order: Vec<NodeId> = dfs(&cfg, NodeId::new(0)).collect();
/// assert_eq!(order, vec![NodeId::new(0)]);
/// ```
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Breadth-first search iterator over graph nodes.
pub struct BfsIterator<'g, G: Successors> {
    graph: &'g G,
    queue: VecDeque<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> BfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return BfsIterator {
                graph,
                queue: VecDeque::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;

        BfsIterator {
            graph,
            queue: VecDeque::from([start]),
            visited,
        }
    }
}

impl<G: Successors> Iterator for BfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;

        for succ in self.graph.successors(node) {
            if let Some(seen) = self.visited.get_mut(succ.index()) {
                if !*seen {
                    *seen = true;
                    self.queue.push_back(succ);
                }
            }
        }

        Some(node)
    }
}

/// Returns a breadth-first search iterator starting from the given node.
pub fn bfs<G: Successors>(graph: &G, start: NodeId) -> BfsIterator<'_, G> {
    BfsIterator::new(graph, start)
}

/// Computes the postorder traversal of nodes reachable from the start.
///
/// In postorder, a node is emitted after all its DFS descendants.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if succ.index() < node_count && !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Computes the reverse postorder traversal of nodes reachable from the start.
///
/// In an acyclic region every node comes before all of its successors, which is the
/// preferred visiting order for forward data flow and for the dominator fixed point.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}

/// Returns the reverse-postorder position of every node, `None` for unreachable ones.
///
/// The returned vector is indexed by [`NodeId::index`].
pub fn rpo_numbering<G: Successors>(graph: &G, start: NodeId) -> Vec<Option<usize>> {
    let mut numbering = vec![None; graph.node_count()];
    for (position, node) in reverse_postorder(graph, start).into_iter().enumerate() {
        numbering[node.index()] = Some(position);
    }
    numbering
}
