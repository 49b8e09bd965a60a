//! Control Flow Graph construction.
//!
//! [`ControlFlowGraph::build`] partitions an IL function into basic blocks at leader
//! boundaries and derives the edges from each block's terminating instruction:
//!
//! | Terminator | Edges |
//! |------------|-------|
//! | `Branch` | one `Unconditional` edge to the label target |
//! | `BranchIfTrue` | `ConditionalTrue` to the target, `ConditionalFalse` to the next block |
//! | `BranchIfFalse` | `ConditionalFalse` to the target, `ConditionalTrue` to the next block |
//! | `Call` | one `CallContinuation` edge to the next block |
//! | `Return` | none |
//! | anything else | one `FallThrough` edge to the next block |
//!
//! A branch whose label does not resolve emits no edge. The builder never fails; the
//! orchestrator reports such targets as structural issues.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write,
};

use serde::{Deserialize, Serialize};

use crate::{
    analysis::cfg::{BasicBlock, CfgEdge, CfgEdgeKind},
    il::{IlFunction, IlOpcode},
    utils::{
        escape_dot,
        graph::{algorithms, GraphBase, NodeId, Predecessors, Successors},
    },
};

/// Control flow graph of one IL function.
///
/// Blocks are stored densely; a block's id equals its position. Predecessor and
/// successor sets are the projection of [`ControlFlowGraph::edges`]. Graphs assembled
/// with [`ControlFlowGraph::from_parts`] may violate that, which is what
/// [`crate::analysis::ControlFlowAnalyzer::validate_cfg`] checks.
///
/// # Examples
///
/// ```rust
/// use ilscope::prelude::*;
///
/// let cond = IlValue::temp(0);
/// let mut builder = FunctionBuilder::new("abs");
/// builder
///     .binary(IlOpcode::CompareLt, cond.clone(), IlValue::temp(1), IlValue::byte(0))
///     .branch_if_false(cond, "done")
///     .unary(IlOpcode::Neg, IlValue::temp(1), IlValue::temp(1))
///     .label("done")
///     .ret(Some(IlValue::temp(1)));
///
/// let cfg = ControlFlowGraph::build(&builder.build());
/// assert_eq!(cfg.block_count(), 3);
/// assert_eq!(cfg.edge_count(), 3);
/// assert_eq!(cfg.entry(), Some(NodeId::new(0)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    function_name: String,
    blocks: Vec<BasicBlock>,
    edges: Vec<CfgEdge>,
    entry: Option<NodeId>,
    exits: BTreeSet<NodeId>,
}

impl ControlFlowGraph {
    /// Builds the control flow graph of `function`.
    ///
    /// An empty function yields an empty graph without entry.
    #[must_use]
    pub fn build(function: &IlFunction) -> Self {
        let instructions = &function.instructions;
        if instructions.is_empty() {
            return ControlFlowGraph {
                function_name: function.name.clone(),
                blocks: Vec::new(),
                edges: Vec::new(),
                entry: None,
                exits: BTreeSet::new(),
            };
        }

        let labels = function.label_positions();
        let resolve = |target: Option<&str>| target.and_then(|name| labels.get(name).copied());

        // Leaders: entry, resolved targets, and whatever follows a transfer
        let mut leaders = BTreeSet::from([0usize]);
        for (index, instruction) in instructions.iter().enumerate() {
            if let Some(target) = resolve(instruction.branch_target()) {
                leaders.insert(target);
            }
            if instruction.opcode.ends_block() && index + 1 < instructions.len() {
                leaders.insert(index + 1);
            }
        }

        let starts: Vec<usize> = leaders.into_iter().collect();
        let mut blocks = Vec::with_capacity(starts.len());
        let mut block_at = BTreeMap::new();
        for (position, &start) in starts.iter().enumerate() {
            let end = starts.get(position + 1).copied().unwrap_or(instructions.len());
            let id = NodeId::new(position);
            block_at.insert(start, id);
            blocks.push(BasicBlock::new(id, start, instructions[start..end].to_vec()));
        }

        let mut edges = Vec::new();
        for (position, block) in blocks.iter().enumerate() {
            let source = block.id;
            let next = (position + 1 < blocks.len()).then(|| NodeId::new(position + 1));
            let Some(last) = block.terminator() else {
                continue;
            };
            let target = resolve(last.branch_target()).and_then(|i| block_at.get(&i).copied());

            let mut push = |target: Option<NodeId>, kind| {
                if let Some(target) = target {
                    edges.push(CfgEdge::new(source, target, kind));
                }
            };

            match last.opcode {
                IlOpcode::Branch => push(target, CfgEdgeKind::Unconditional),
                IlOpcode::BranchIfTrue => {
                    push(target, CfgEdgeKind::ConditionalTrue);
                    push(next, CfgEdgeKind::ConditionalFalse);
                }
                IlOpcode::BranchIfFalse => {
                    push(target, CfgEdgeKind::ConditionalFalse);
                    push(next, CfgEdgeKind::ConditionalTrue);
                }
                IlOpcode::Call => push(next, CfgEdgeKind::CallContinuation),
                IlOpcode::Return => {}
                _ => push(next, CfgEdgeKind::FallThrough),
            }
        }

        for edge in &edges {
            blocks[edge.source.index()].successors.insert(edge.target);
            blocks[edge.target.index()].predecessors.insert(edge.source);
        }

        let exits = blocks
            .iter()
            .filter(|b| b.successors.is_empty())
            .map(|b| b.id)
            .collect();

        ControlFlowGraph {
            function_name: function.name.clone(),
            blocks,
            edges,
            entry: Some(NodeId::new(0)),
            exits,
        }
    }

    /// Assembles a graph from externally supplied parts without any consistency checks.
    ///
    /// Use [`crate::analysis::ControlFlowAnalyzer::validate_cfg`] to find out whether
    /// the parts agree with each other.
    #[must_use]
    pub fn from_parts(
        function_name: impl Into<String>,
        blocks: Vec<BasicBlock>,
        edges: Vec<CfgEdge>,
        entry: Option<NodeId>,
        exits: BTreeSet<NodeId>,
    ) -> Self {
        ControlFlowGraph {
            function_name: function_name.into(),
            blocks,
            edges,
            entry,
            exits,
        }
    }

    /// Name of the function this graph was built from.
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Entry block, `None` for an empty function.
    #[must_use]
    pub fn entry(&self) -> Option<NodeId> {
        self.entry
    }

    /// Blocks without successors.
    #[must_use]
    pub fn exits(&self) -> &BTreeSet<NodeId> {
        &self.exits
    }

    /// All blocks, indexed by id.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// All edges in emission order.
    #[must_use]
    pub fn edges(&self) -> &[CfgEdge] {
        &self.edges
    }

    /// Returns the block with the given id.
    #[must_use]
    pub fn block(&self, id: NodeId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Total number of instructions over all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::len).sum()
    }

    /// McCabe complexity `E - N + 2`, clamped to `1..=999`.
    ///
    /// An empty graph has complexity 1.
    #[must_use]
    pub fn cyclomatic_complexity(&self) -> usize {
        if self.blocks.is_empty() {
            return 1;
        }
        let value = self.edges.len() as i64 - self.blocks.len() as i64 + 2;
        value.clamp(1, 999) as usize
    }

    /// Edges leaving `node`.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = &CfgEdge> {
        self.edges.iter().filter(move |e| e.source == node)
    }

    /// Blocks reachable from the entry.
    #[must_use]
    pub fn reachable_blocks(&self) -> BTreeSet<NodeId> {
        match self.entry {
            Some(entry) => algorithms::dfs(self, entry).collect(),
            None => BTreeSet::new(),
        }
    }

    /// Reachable blocks in reverse postorder.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<NodeId> {
        match self.entry {
            Some(entry) => algorithms::reverse_postorder(self, entry),
            None => Vec::new(),
        }
    }

    /// Records the loop flags found by loop analysis.
    pub(crate) fn mark_loops(&mut self, headers: &BTreeSet<NodeId>, exits: &BTreeSet<NodeId>) {
        for block in &mut self.blocks {
            block.is_loop_header = headers.contains(&block.id);
            block.is_loop_exit = exits.contains(&block.id);
        }
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// Entry blocks are filled green, exit blocks red, loop headers are drawn with a
    /// double border. Edge colours follow the edge kind.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(&self.function_name));
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
        dot.push_str("    edge [fontname=\"Courier\", fontsize=9];\n\n");

        for block in &self.blocks {
            let is_entry = self.entry == Some(block.id);
            let is_exit = self.exits.contains(&block.id);

            let mut label = block.id.to_string();
            if is_entry {
                label.push_str(" (entry)");
            }
            if is_exit {
                label.push_str(" (exit)");
            }
            label.push_str("\\l");
            for (index, instruction) in block.indexed_instructions() {
                let _ = write!(label, "{index:03}: {}\\l", escape_dot(&instruction.to_string()));
            }

            let mut style = if is_entry {
                String::from(", style=filled, fillcolor=lightgreen")
            } else if is_exit {
                String::from(", style=filled, fillcolor=lightcoral")
            } else {
                String::new()
            };
            if block.is_loop_header {
                style.push_str(", peripheries=2");
            }

            let _ = writeln!(dot, "    {} [label=\"{label}\"{style}];", block.id);
        }

        dot.push('\n');

        for edge in &self.edges {
            let _ = writeln!(
                dot,
                "    {} -> {} [label=\"{}\", color={}];",
                edge.source,
                edge.target,
                edge.kind,
                edge.kind.dot_color()
            );
        }

        dot.push_str("}\n");
        dot
    }
}

impl GraphBase for ControlFlowGraph {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.blocks.len()).map(NodeId::new)
    }
}

impl Successors for ControlFlowGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        let count = self.blocks.len();
        self.blocks
            .get(node.index())
            .into_iter()
            .flat_map(|b| b.successors.iter().copied())
            .filter(move |s| s.index() < count)
    }
}

impl Predecessors for ControlFlowGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        let count = self.blocks.len();
        self.blocks
            .get(node.index())
            .into_iter()
            .flat_map(|b| b.predecessors.iter().copied())
            .filter(move |p| p.index() < count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{FunctionBuilder, IlType, IlValue};

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn kinds(cfg: &ControlFlowGraph, source: usize) -> Vec<(usize, CfgEdgeKind)> {
        cfg.outgoing_edges(n(source))
            .map(|e| (e.target.index(), e.kind))
            .collect()
    }

    #[test]
    fn test_empty_function() {
        let cfg = ControlFlowGraph::build(&IlFunction::new("empty"));
        assert_eq!(cfg.block_count(), 0);
        assert_eq!(cfg.entry(), None);
        assert!(cfg.exits().is_empty());
        assert!(cfg.reachable_blocks().is_empty());
        assert_eq!(cfg.cyclomatic_complexity(), 1);
    }

    #[test]
    fn test_straight_line_is_one_block() {
        let mut builder = FunctionBuilder::new("main");
        builder
            .load_immediate(IlValue::temp(0), IlValue::byte(42))
            .binary(IlOpcode::Add, IlValue::temp(1), IlValue::temp(0), IlValue::byte(1))
            .store_variable(IlValue::local("x", IlType::Byte), IlValue::temp(1))
            .ret(None);
        let cfg = ControlFlowGraph::build(&builder.build());

        assert_eq!(cfg.block_count(), 1);
        assert_eq!(cfg.edge_count(), 0);
        assert_eq!(cfg.exits(), &BTreeSet::from([n(0)]));
        assert_eq!(cfg.blocks()[0].end, 4);
        assert_eq!(cfg.cyclomatic_complexity(), 1);
    }

    #[test]
    fn test_if_else_edges() {
        let cond = IlValue::temp(0);
        let mut builder = FunctionBuilder::new("if_else");
        builder
            .binary(IlOpcode::CompareLt, cond.clone(), IlValue::temp(1), IlValue::byte(10))
            .branch_if_false(cond, "else")
            .load_immediate(IlValue::temp(2), IlValue::byte(1))
            .branch("end")
            .label("else")
            .load_immediate(IlValue::temp(2), IlValue::byte(2))
            .label("end")
            .ret(Some(IlValue::temp(2)));
        let cfg = ControlFlowGraph::build(&builder.build());

        assert_eq!(cfg.block_count(), 4);
        assert_eq!(
            kinds(&cfg, 0),
            vec![(2, CfgEdgeKind::ConditionalFalse), (1, CfgEdgeKind::ConditionalTrue)]
        );
        assert_eq!(kinds(&cfg, 1), vec![(3, CfgEdgeKind::Unconditional)]);
        assert_eq!(kinds(&cfg, 2), vec![(3, CfgEdgeKind::FallThrough)]);
        assert_eq!(cfg.blocks()[3].predecessors, BTreeSet::from([n(1), n(2)]));
        assert_eq!(cfg.cyclomatic_complexity(), 2);
    }

    #[test]
    fn test_call_splits_block() {
        let mut builder = FunctionBuilder::new("main");
        builder
            .call("init", vec![], None)
            .nop()
            .ret(None);
        let cfg = ControlFlowGraph::build(&builder.build());

        assert_eq!(cfg.block_count(), 2);
        assert_eq!(kinds(&cfg, 0), vec![(1, CfgEdgeKind::CallContinuation)]);
    }

    #[test]
    fn test_unresolved_target_emits_no_edge() {
        let mut builder = FunctionBuilder::new("broken");
        builder.branch("nowhere").nop().ret(None);
        let cfg = ControlFlowGraph::build(&builder.build());

        assert_eq!(cfg.block_count(), 2);
        assert_eq!(cfg.edge_count(), 0);
        assert_eq!(cfg.reachable_blocks(), BTreeSet::from([n(0)]));
    }

    #[test]
    fn test_loop_back_edge() {
        let mut builder = FunctionBuilder::new("count");
        builder
            .load_immediate(IlValue::temp(0), IlValue::byte(0))
            .label("top")
            .binary(IlOpcode::Add, IlValue::temp(0), IlValue::temp(0), IlValue::byte(1))
            .binary(IlOpcode::CompareLt, IlValue::temp(1), IlValue::temp(0), IlValue::byte(10))
            .branch_if_true(IlValue::temp(1), "top")
            .ret(None);
        let cfg = ControlFlowGraph::build(&builder.build());

        assert_eq!(cfg.block_count(), 3);
        assert!(cfg.blocks()[1].successors.contains(&n(1)));
        assert_eq!(cfg.reverse_postorder(), vec![n(0), n(1), n(2)]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut builder = FunctionBuilder::new("loop");
        builder
            .label("a")
            .branch_if_true(IlValue::temp(0), "b")
            .branch("a")
            .label("b")
            .ret(None);
        let function = builder.build();
        assert_eq!(ControlFlowGraph::build(&function), ControlFlowGraph::build(&function));
    }

    #[test]
    fn test_to_dot() {
        let mut builder = FunctionBuilder::new("main");
        builder.call("init", vec![], None).ret(None);
        let dot = ControlFlowGraph::build(&builder.build()).to_dot();

        assert!(dot.starts_with("digraph CFG {"));
        assert!(dot.contains("B0 -> B1 [label=\"call_continuation\", color=blue];"));
        assert!(dot.contains("(entry)"));
    }
}
