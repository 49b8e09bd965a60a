//! Natural loop detection.
//!
//! # Loop Structure
//!
//! ```text
//!     [preheader]     <- Single entry predecessor (optional)
//!          |
//!          v
//!     [header] <------+  <- Dominates all loop blocks
//!          |          |
//!          v          |
//!     [body ...]      |
//!          |          |
//!          v          |
//!     [latch] --------+  <- Back edge source(s)
//!          |
//!          v
//!     [exit ...]         <- Outside the loop, with a predecessor inside
//! ```
//!
//! # Detection
//!
//! Back edges are found with an iterative depth-first search from the entry: an edge to
//! a block that is still on the DFS stack closes a cycle. A candidate is only a loop if
//! its target dominates its source; candidates that fail this test come from irreducible
//! control flow and are dropped. All back edges into one header form a single loop whose
//! body is the union of the backward reachability from each latch, stopping at the header.
//!
//! # Nesting
//!
//! Outermost loops have depth 1. Loops are evaluated from the largest body to the
//! smallest, so every loop that contains a header is known before the header's own loop
//! is evaluated, and the depth is `1 + max(depth of containing loops)`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    analysis::{ControlFlowGraph, DominanceTree},
    il::{IlInstruction, IlOpcode, IlValue},
    utils::graph::{GraphBase, NodeId, Predecessors, Successors},
};

/// Classification of loop types based on structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoopKind {
    /// Exit condition at the header (`while`).
    PreTested,
    /// Exit condition at the single latch (`do … while`).
    PostTested,
    /// No exit edges at all.
    Infinite,
    /// Multiple latches or irregular exits.
    Complex,
}

/// Qualitative properties of a loop body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopCharacteristics {
    /// More than one exit block
    pub multiple_exits: bool,
    /// The body contains a `Call`
    pub has_calls: bool,
    /// The body indexes arrays
    pub has_array_accesses: bool,
    /// The body writes a global variable
    pub writes_globals: bool,
}

/// A natural loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NaturalLoop {
    /// Loop id, ordered by header
    pub id: usize,
    /// The single entry block; dominates the whole body
    pub header: NodeId,
    /// Back edges as `(latch, header)` pairs
    pub back_edges: BTreeSet<(NodeId, NodeId)>,
    /// Sources of the back edges
    pub latches: BTreeSet<NodeId>,
    /// All blocks of the loop, header included
    pub body: BTreeSet<NodeId>,
    /// Successors of body blocks that lie outside the body
    pub exits: BTreeSet<NodeId>,
    /// The only predecessor of the header outside the loop, if there is exactly one
    pub preheader: Option<NodeId>,
    /// Id of the smallest enclosing loop
    pub parent: Option<usize>,
    /// Nesting depth, 1 for outermost loops
    pub depth: usize,
    /// No other loop's header lies inside this loop
    pub is_innermost: bool,
    /// Structural classification
    pub kind: LoopKind,
    /// Body properties
    pub characteristics: LoopCharacteristics,
}

impl NaturalLoop {
    /// Returns `true` if the loop body contains `block`.
    #[must_use]
    pub fn contains(&self, block: NodeId) -> bool {
        self.body.contains(&block)
    }

    /// Number of blocks in the body.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// Finds the natural loops of `cfg`.
///
/// The result is sorted by header, and loop ids equal positions.
#[must_use]
pub fn find_loops(cfg: &ControlFlowGraph, dominance: &DominanceTree) -> Vec<NaturalLoop> {
    let Some(entry) = cfg.entry() else {
        return Vec::new();
    };

    let mut latches_by_header: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for (latch, header) in find_back_edges(cfg, entry) {
        if dominance.dominates(header, latch) {
            latches_by_header.entry(header).or_default().insert(latch);
        } else {
            log::debug!(
                "{}: discarding back edge {latch} -> {header}, header does not dominate latch",
                cfg.function_name()
            );
        }
    }

    let mut loops: Vec<NaturalLoop> = latches_by_header
        .into_iter()
        .enumerate()
        .map(|(id, (header, latches))| build_loop(cfg, dominance, id, header, latches))
        .collect();

    compute_nesting(&mut loops);
    loops
}

/// Deepest nesting level of any loop containing `block`, 0 outside loops.
#[must_use]
pub fn loop_depth(loops: &[NaturalLoop], block: NodeId) -> usize {
    loops
        .iter()
        .filter(|l| l.contains(block))
        .map(|l| l.depth)
        .max()
        .unwrap_or(0)
}

/// Back edges whose target does not dominate their source.
///
/// These close cycles with more than one entry and are never turned into loops.
pub(crate) fn irreducible_back_edges(
    cfg: &ControlFlowGraph,
    dominance: &DominanceTree,
) -> Vec<(NodeId, NodeId)> {
    let Some(entry) = cfg.entry() else {
        return Vec::new();
    };
    find_back_edges(cfg, entry)
        .into_iter()
        .filter(|&(latch, header)| !dominance.dominates(header, latch))
        .collect()
}

/// Iterative DFS from `entry`, returning every edge into a block on the DFS stack.
fn find_back_edges(cfg: &ControlFlowGraph, entry: NodeId) -> Vec<(NodeId, NodeId)> {
    let count = cfg.node_count();
    if entry.index() >= count {
        return Vec::new();
    }

    let mut visited = vec![false; count];
    let mut on_stack = vec![false; count];
    let mut back_edges = Vec::new();

    // Each frame holds the node and its not yet explored successors
    let mut stack: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
    visited[entry.index()] = true;
    on_stack[entry.index()] = true;
    stack.push((entry, cfg.successors(entry).collect::<Vec<_>>()));

    while let Some((node, pending)) = stack.last_mut() {
        let node = *node;
        if pending.is_empty() {
            on_stack[node.index()] = false;
            stack.pop();
            continue;
        }
        let succ = pending.remove(0);
        if on_stack[succ.index()] {
            back_edges.push((node, succ));
        } else if !visited[succ.index()] {
            visited[succ.index()] = true;
            on_stack[succ.index()] = true;
            stack.push((succ, cfg.successors(succ).collect()));
        }
    }

    back_edges
}

fn build_loop(
    cfg: &ControlFlowGraph,
    dominance: &DominanceTree,
    id: usize,
    header: NodeId,
    latches: BTreeSet<NodeId>,
) -> NaturalLoop {
    // Predecessors the header does not dominate are unreachable from the entry
    let mut body = BTreeSet::from([header]);
    for &latch in &latches {
        let mut worklist = vec![latch];
        while let Some(node) = worklist.pop() {
            if body.insert(node) {
                worklist.extend(
                    cfg.predecessors(node)
                        .filter(|&p| !body.contains(&p) && dominance.dominates(header, p)),
                );
            }
        }
    }

    let mut exits = BTreeSet::new();
    let mut exiting = BTreeSet::new();
    for &block in &body {
        for succ in cfg.successors(block) {
            if !body.contains(&succ) {
                exits.insert(succ);
                exiting.insert(block);
            }
        }
    }

    let outside_preds: Vec<NodeId> = cfg
        .predecessors(header)
        .filter(|p| !body.contains(p))
        .collect();
    let preheader = match outside_preds.as_slice() {
        [single] => Some(*single),
        _ => None,
    };

    let kind = classify(header, &latches, &exits, &exiting);
    let characteristics = characterize(cfg, &body, &exits);

    NaturalLoop {
        id,
        header,
        back_edges: latches.iter().map(|&latch| (latch, header)).collect(),
        latches,
        body,
        exits,
        preheader,
        parent: None,
        depth: 1,
        is_innermost: true,
        kind,
        characteristics,
    }
}

fn classify(
    header: NodeId,
    latches: &BTreeSet<NodeId>,
    exits: &BTreeSet<NodeId>,
    exiting: &BTreeSet<NodeId>,
) -> LoopKind {
    if exits.is_empty() {
        return LoopKind::Infinite;
    }
    if latches.len() > 1 {
        return LoopKind::Complex;
    }
    if exiting.len() == 1 {
        if latches.iter().all(|l| exiting.contains(l)) {
            return LoopKind::PostTested;
        }
        if exiting.contains(&header) {
            return LoopKind::PreTested;
        }
    }
    LoopKind::Complex
}

fn characterize(
    cfg: &ControlFlowGraph,
    body: &BTreeSet<NodeId>,
    exits: &BTreeSet<NodeId>,
) -> LoopCharacteristics {
    let mut characteristics = LoopCharacteristics {
        multiple_exits: exits.len() > 1,
        ..LoopCharacteristics::default()
    };

    for instruction in body
        .iter()
        .filter_map(|&id| cfg.block(id))
        .flat_map(|block| block.instructions.iter())
    {
        characteristics.has_calls |= instruction.opcode == IlOpcode::Call;
        characteristics.has_array_accesses |= instruction.opcode.is_array_access();
        characteristics.writes_globals |= writes_global(instruction);
    }

    characteristics
}

fn writes_global(instruction: &IlInstruction) -> bool {
    let target = match instruction.opcode {
        IlOpcode::StoreArray => instruction.operands.first(),
        _ => instruction.definition(),
    };
    target.is_some_and(IlValue::is_global_variable)
}

fn compute_nesting(loops: &mut [NaturalLoop]) {
    let mut order: Vec<usize> = (0..loops.len()).collect();
    order.sort_by(|&a, &b| loops[b].size().cmp(&loops[a].size()).then(a.cmp(&b)));

    for &index in &order {
        let header = loops[index].header;
        let containing: Vec<usize> = (0..loops.len())
            .filter(|&other| other != index && loops[other].contains(header))
            .collect();

        loops[index].depth = 1 + containing
            .iter()
            .map(|&other| loops[other].depth)
            .max()
            .unwrap_or(0);
        loops[index].parent = containing
            .iter()
            .copied()
            .min_by_key(|&other| (loops[other].size(), other));
    }

    for index in 0..loops.len() {
        let inner_header = (0..loops.len())
            .any(|other| other != index && loops[index].contains(loops[other].header));
        loops[index].is_innermost = !inner_header;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{FunctionBuilder, IlFunction, IlType, IlValue};

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn analyze(function: &IlFunction) -> Vec<NaturalLoop> {
        let cfg = ControlFlowGraph::build(function);
        let dominance = DominanceTree::compute(&cfg);
        find_loops(&cfg, &dominance)
    }

    #[test]
    fn test_no_loops_in_straight_line() {
        let mut builder = FunctionBuilder::new("main");
        builder.nop().ret(None);
        assert!(analyze(&builder.build()).is_empty());
    }

    #[test]
    fn test_post_tested_loop() {
        let mut builder = FunctionBuilder::new("count");
        builder
            .load_immediate(IlValue::temp(0), IlValue::byte(0))
            .label("top")
            .binary(
                IlOpcode::Add,
                IlValue::temp(0),
                IlValue::temp(0),
                IlValue::byte(1),
            )
            .binary(
                IlOpcode::CompareLt,
                IlValue::temp(1),
                IlValue::temp(0),
                IlValue::byte(10),
            )
            .branch_if_true(IlValue::temp(1), "top")
            .ret(None);
        let loops = analyze(&builder.build());

        assert_eq!(loops.len(), 1);
        let l = &loops[0];
        assert_eq!(l.header, n(1));
        assert_eq!(l.body, BTreeSet::from([n(1)]));
        assert_eq!(l.exits, BTreeSet::from([n(2)]));
        assert_eq!(l.preheader, Some(n(0)));
        assert_eq!(l.depth, 1);
        assert!(l.is_innermost);
        assert_eq!(l.kind, LoopKind::PostTested);
    }

    #[test]
    fn test_nested_loops() {
        // outer: while i; inner: while j
        let mut builder = FunctionBuilder::new("nested");
        builder
            .label("outer")
            .branch_if_false(IlValue::temp(0), "done")
            .label("inner")
            .branch_if_false(IlValue::temp(1), "inner_done")
            .store_array(
                IlValue::global("screen", IlType::Byte),
                IlValue::temp(1),
                IlValue::byte(32),
            )
            .branch("inner")
            .label("inner_done")
            .call("tick", vec![], None)
            .branch("outer")
            .label("done")
            .ret(None);
        let loops = analyze(&builder.build());

        assert_eq!(loops.len(), 2);
        let outer = &loops[0];
        let inner = &loops[1];
        assert_eq!(outer.depth, 1);
        assert_eq!(inner.depth, 2);
        assert_eq!(inner.parent, Some(outer.id));
        assert!(!outer.is_innermost);
        assert!(inner.is_innermost);
        assert!(outer.body.is_superset(&inner.body));
        assert_eq!(inner.kind, LoopKind::PreTested);
        assert!(inner.characteristics.has_array_accesses);
        assert!(outer.characteristics.has_calls);
        assert!(!inner.characteristics.has_calls);
        assert_eq!(loop_depth(&loops, inner.header), 2);
    }

    #[test]
    fn test_multiple_back_edges_merge() {
        let mut builder = FunctionBuilder::new("merge");
        builder
            .label("head")
            .nop()
            .branch_if_true(IlValue::temp(0), "head")
            .nop()
            .branch_if_true(IlValue::temp(1), "head")
            .ret(None);
        let loops = analyze(&builder.build());

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].back_edges.len(), 2);
        assert_eq!(loops[0].latches.len(), 2);
        assert_eq!(loops[0].kind, LoopKind::Complex);
    }

    #[test]
    fn test_irreducible_back_edge_is_discarded() {
        // entry jumps into the middle of a two-block cycle
        let mut builder = FunctionBuilder::new("irreducible");
        builder
            .branch_if_true(IlValue::temp(0), "b")
            .label("a")
            .nop()
            .branch("b")
            .label("b")
            .nop()
            .branch_if_true(IlValue::temp(1), "a")
            .ret(None);
        assert!(analyze(&builder.build()).is_empty());
    }

    #[test]
    fn test_infinite_loop() {
        let mut builder = FunctionBuilder::new("spin");
        builder
            .label("forever")
            .poke(IlValue::memory(0xD020), IlValue::temp(0))
            .branch("forever");
        let loops = analyze(&builder.build());

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].kind, LoopKind::Infinite);
        assert_eq!(loops[0].preheader, None);
    }

    #[test]
    fn test_unreachable_predecessors_stay_out_of_the_body() {
        // B2 and B3 are dead code flowing into the latch B4
        let mut builder = FunctionBuilder::new("dead_tail");
        builder
            .label("top")
            .branch_if_true(IlValue::temp(0), "latch")
            .ret(None)
            .call("boom", vec![], None)
            .branch("latch")
            .label("latch")
            .branch("top");
        let function = builder.build();
        let cfg = ControlFlowGraph::build(&function);
        let dominance = DominanceTree::compute(&cfg);
        let loops = find_loops(&cfg, &dominance);

        assert_eq!(loops.len(), 1);
        let l = &loops[0];
        assert_eq!(l.header, n(0));
        assert_eq!(l.body, BTreeSet::from([n(0), n(4)]));
        assert!(!l.characteristics.has_calls);
        for &block in &l.body {
            assert!(dominance.dominates(l.header, block));
        }
        assert_eq!(loop_depth(&loops, n(2)), 0);
    }

    #[test]
    fn test_global_array_store_is_a_global_write() {
        let mut builder = FunctionBuilder::new("clear");
        builder
            .label("top")
            .store_array(
                IlValue::global("screen", IlType::Byte),
                IlValue::temp(0),
                IlValue::byte(32),
            )
            .branch_if_true(IlValue::temp(1), "top")
            .ret(None);
        let loops = analyze(&builder.build());

        assert_eq!(loops.len(), 1);
        assert!(loops[0].characteristics.writes_globals);
        assert!(loops[0].characteristics.has_array_accesses);
    }
}
