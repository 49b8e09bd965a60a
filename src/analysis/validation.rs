//! Typed analysis issues and structural CFG validation.
//!
//! Structural problems never abort an analysis. They are collected as [`AnalysisIssue`]
//! values and surfaced in the result, which is then flagged as degraded or invalid.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    analysis::ControlFlowGraph,
    il::IlFunction,
    utils::graph::{GraphBase, NodeId},
};

/// Severity of an issue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// Invalidates the result
    Error,
    /// Degrades the result
    Warning,
    /// Informational only
    Info,
}

/// What an issue is about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueKind {
    /// The graph has blocks but no valid entry block
    MissingEntryBlock,
    /// A declared exit block does not exist
    MissingExitBlock,
    /// An edge endpoint does not exist
    DanglingEdge,
    /// An edge is missing from the block sets, or a block set member has no edge
    UnmirroredEdge,
    /// A block id differs from its position
    BlockIdMismatch,
    /// A block cannot be reached from the entry
    UnreachableBlock,
    /// A branch names a label that is not defined
    DanglingBranchTarget,
    /// A cycle with more than one entry, its back edge was not treated as a loop
    IrreducibleLoop,
    /// An instruction's operand count violates its opcode layout
    MalformedInstruction,
    /// A memory region is over capacity
    MemoryOverflow,
    /// A memory region is close to capacity
    MemoryPressure,
    /// An addressing mode the processor variant lacks
    UnsupportedAddressingMode,
    /// Register pressure exceeds the allocatable registers
    RegisterSpillRisk,
    /// The estimated stack depth exceeds the hardware stack
    StackOverflow,
    /// The estimated stack depth is close to the hardware stack size
    StackPressure,
    /// An interrupt handler exceeds its cycle budget
    InterruptBudgetExceeded,
    /// A function exceeds the frame cycle budget
    FrameBudgetExceeded,
    /// A sub-analysis failed internally
    AnalysisError,
}

impl IssueKind {
    /// Returns `true` for violations of the graph invariants themselves, as opposed to
    /// findings about the code the graph was built from.
    #[must_use]
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            IssueKind::MissingEntryBlock
                | IssueKind::MissingExitBlock
                | IssueKind::DanglingEdge
                | IssueKind::UnmirroredEdge
                | IssueKind::BlockIdMismatch
        )
    }
}

/// A typed, non-fatal finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisIssue {
    /// Issue category
    pub kind: IssueKind,
    /// Severity
    pub severity: Severity,
    /// Human readable description
    pub message: String,
    /// Affected block
    pub block: Option<NodeId>,
    /// Affected instruction index
    pub instruction: Option<usize>,
}

impl AnalysisIssue {
    /// Creates an issue without location.
    #[must_use]
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        AnalysisIssue {
            kind,
            severity,
            message: message.into(),
            block: None,
            instruction: None,
        }
    }

    /// Error-severity issue.
    #[must_use]
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    /// Warning-severity issue.
    #[must_use]
    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    /// Info-severity issue.
    #[must_use]
    pub fn info(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    /// Attaches a block.
    #[must_use]
    pub fn at_block(mut self, block: NodeId) -> Self {
        self.block = Some(block);
        self
    }

    /// Attaches an instruction index.
    #[must_use]
    pub fn at_instruction(mut self, index: usize) -> Self {
        self.instruction = Some(index);
        self
    }

    /// Returns `true` for error severity.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Checks the structural invariants of `cfg`.
///
/// - a non-empty graph has an entry, and it exists
/// - every declared exit exists
/// - block ids equal their positions
/// - every edge endpoint exists
/// - the block predecessor/successor sets are exactly the projection of the edges
/// - every block is reachable from the entry (warning)
pub(crate) fn validate_structure(cfg: &ControlFlowGraph) -> Vec<AnalysisIssue> {
    let mut issues = Vec::new();
    let count = cfg.node_count();
    let exists = |node: NodeId| node.index() < count;

    let entry_ok = match cfg.entry() {
        None if count > 0 => {
            issues.push(AnalysisIssue::error(
                IssueKind::MissingEntryBlock,
                "graph has blocks but no entry block",
            ));
            false
        }
        None => false,
        Some(entry) if !exists(entry) => {
            issues.push(
                AnalysisIssue::error(
                    IssueKind::MissingEntryBlock,
                    format!("entry block {entry} does not exist"),
                )
                .at_block(entry),
            );
            false
        }
        Some(_) => true,
    };

    for &exit in cfg.exits() {
        if !exists(exit) {
            issues.push(
                AnalysisIssue::error(
                    IssueKind::MissingExitBlock,
                    format!("exit block {exit} does not exist"),
                )
                .at_block(exit),
            );
        }
    }

    for (position, block) in cfg.blocks().iter().enumerate() {
        if block.id.index() != position {
            issues.push(
                AnalysisIssue::error(
                    IssueKind::BlockIdMismatch,
                    format!("block at position {position} carries id {}", block.id),
                )
                .at_block(NodeId::new(position)),
            );
        }
    }

    let mut projected: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    for edge in cfg.edges() {
        if !exists(edge.source) || !exists(edge.target) {
            issues.push(
                AnalysisIssue::error(
                    IssueKind::DanglingEdge,
                    format!("edge {} -> {} references a missing block", edge.source, edge.target),
                )
                .at_block(edge.source),
            );
            continue;
        }
        projected.insert((edge.source, edge.target));

        let source = &cfg.blocks()[edge.source.index()];
        let target = &cfg.blocks()[edge.target.index()];
        if !source.successors.contains(&edge.target)
            || !target.predecessors.contains(&edge.source)
        {
            issues.push(
                AnalysisIssue::error(
                    IssueKind::UnmirroredEdge,
                    format!(
                        "edge {} -> {} is not mirrored in the block sets",
                        edge.source, edge.target
                    ),
                )
                .at_block(edge.source),
            );
        }
    }

    for (position, block) in cfg.blocks().iter().enumerate() {
        let node = NodeId::new(position);
        for &succ in &block.successors {
            if !projected.contains(&(node, succ)) {
                issues.push(
                    AnalysisIssue::error(
                        IssueKind::UnmirroredEdge,
                        format!("successor {succ} of {node} has no edge"),
                    )
                    .at_block(node),
                );
            }
        }
        for &pred in &block.predecessors {
            if !projected.contains(&(pred, node)) {
                issues.push(
                    AnalysisIssue::error(
                        IssueKind::UnmirroredEdge,
                        format!("predecessor {pred} of {node} has no edge"),
                    )
                    .at_block(node),
                );
            }
        }
    }

    if entry_ok {
        let reachable = cfg.reachable_blocks();
        for node in cfg.node_ids().filter(|n| !reachable.contains(n)) {
            issues.push(
                AnalysisIssue::warning(
                    IssueKind::UnreachableBlock,
                    format!("block {node} is unreachable from the entry"),
                )
                .at_block(node),
            );
        }
    }

    issues
}

/// Checks the instructions of `function`: operand arity and branch target resolution.
pub(crate) fn validate_instructions(function: &IlFunction) -> Vec<AnalysisIssue> {
    let labels = function.label_positions();
    let mut issues = Vec::new();

    for (index, instruction) in function.instructions.iter().enumerate() {
        if !instruction.has_valid_arity() {
            issues.push(
                AnalysisIssue::warning(
                    IssueKind::MalformedInstruction,
                    format!(
                        "{} has {} operands",
                        instruction.opcode,
                        instruction.operands.len()
                    ),
                )
                .at_instruction(index),
            );
        }

        if instruction.opcode.is_branch() {
            match instruction.branch_target() {
                Some(target) if labels.contains_key(target) => {}
                Some(target) => issues.push(
                    AnalysisIssue::error(
                        IssueKind::DanglingBranchTarget,
                        format!("branch target '{target}' is not defined"),
                    )
                    .at_instruction(index),
                ),
                None => issues.push(
                    AnalysisIssue::error(
                        IssueKind::DanglingBranchTarget,
                        format!("{} has no label operand", instruction.opcode),
                    )
                    .at_instruction(index),
                ),
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{BasicBlock, CfgEdge, CfgEdgeKind},
        il::{FunctionBuilder, IlInstruction, IlOpcode, IlValue},
    };

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn kinds(issues: &[AnalysisIssue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_structural_kinds() {
        assert!(IssueKind::UnmirroredEdge.is_structural());
        assert!(IssueKind::MissingEntryBlock.is_structural());
        assert!(!IssueKind::DanglingBranchTarget.is_structural());
        assert!(!IssueKind::UnreachableBlock.is_structural());
        assert!(!IssueKind::MalformedInstruction.is_structural());
    }

    #[test]
    fn test_built_graph_is_clean() {
        let mut builder = FunctionBuilder::new("ok");
        builder.call("f", vec![], None).ret(None);
        let cfg = ControlFlowGraph::build(&builder.build());
        assert!(validate_structure(&cfg).is_empty());
    }

    #[test]
    fn test_dangling_and_unmirrored_edges() {
        let mut b0 = BasicBlock::new(n(0), 0, vec![IlInstruction::new(0, IlOpcode::Nop, vec![])]);
        let b1 = BasicBlock::new(n(1), 1, vec![IlInstruction::new(1, IlOpcode::Return, vec![])]);
        b0.successors.insert(n(1));
        let cfg = ControlFlowGraph::from_parts(
            "broken",
            vec![b0, b1],
            vec![
                CfgEdge::new(n(0), n(1), CfgEdgeKind::FallThrough),
                CfgEdge::new(n(0), n(7), CfgEdgeKind::Unconditional),
            ],
            Some(n(0)),
            BTreeSet::from([n(1), n(4)]),
        );

        let found = kinds(&validate_structure(&cfg));
        assert!(found.contains(&IssueKind::MissingExitBlock));
        assert!(found.contains(&IssueKind::DanglingEdge));
        // b1 lacks the predecessor entry for 0 -> 1
        assert!(found.contains(&IssueKind::UnmirroredEdge));
    }

    #[test]
    fn test_missing_entry() {
        let b0 = BasicBlock::new(n(0), 0, vec![]);
        let cfg = ControlFlowGraph::from_parts("noentry", vec![b0], vec![], None, BTreeSet::new());
        assert_eq!(kinds(&validate_structure(&cfg)), vec![IssueKind::MissingEntryBlock]);
    }

    #[test]
    fn test_unreachable_block_is_a_warning() {
        let mut builder = FunctionBuilder::new("dead");
        builder.ret(None).nop().ret(None);
        let issues = validate_structure(&ControlFlowGraph::build(&builder.build()));
        assert_eq!(kinds(&issues), vec![IssueKind::UnreachableBlock]);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].block, Some(n(1)));
    }

    #[test]
    fn test_instruction_checks() {
        let mut builder = FunctionBuilder::new("bad");
        builder
            .branch("missing")
            .emit(IlOpcode::Add, vec![IlValue::temp(0)])
            .ret(None);
        let issues = validate_instructions(&builder.build());
        assert_eq!(
            kinds(&issues),
            vec![IssueKind::DanglingBranchTarget, IssueKind::MalformedInstruction]
        );
        assert_eq!(issues[1].instruction, Some(1));
    }
}
