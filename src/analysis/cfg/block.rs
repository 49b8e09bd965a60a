//! Basic blocks of the control flow graph.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{il::IlInstruction, utils::graph::NodeId};

/// A maximal straight-line run of instructions with one entry and one exit.
///
/// `start..end` is the half-open range of instruction indices the block covers in its
/// function; `instructions` holds a copy of that slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Block id, equal to its position in [`crate::analysis::ControlFlowGraph::blocks`]
    pub id: NodeId,
    /// Index of the first instruction in the function
    pub start: usize,
    /// One past the index of the last instruction
    pub end: usize,
    /// The instructions of the block
    pub instructions: Vec<IlInstruction>,
    /// Blocks with an edge into this block
    pub predecessors: BTreeSet<NodeId>,
    /// Blocks this block has an edge to
    pub successors: BTreeSet<NodeId>,
    /// Set by loop analysis when this block heads a natural loop
    pub is_loop_header: bool,
    /// Set by loop analysis when this block is the target of a loop exit
    pub is_loop_exit: bool,
}

impl BasicBlock {
    /// Creates a block over `instructions`, which start at function index `start`.
    #[must_use]
    pub fn new(id: NodeId, start: usize, instructions: Vec<IlInstruction>) -> Self {
        BasicBlock {
            id,
            start,
            end: start + instructions.len(),
            instructions,
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
            is_loop_header: false,
            is_loop_exit: false,
        }
    }

    /// The last instruction, which decides the outgoing edges.
    #[must_use]
    pub fn terminator(&self) -> Option<&IlInstruction> {
        self.instructions.last()
    }

    /// Iterates `(function index, instruction)` pairs.
    pub fn indexed_instructions(&self) -> impl Iterator<Item = (usize, &IlInstruction)> {
        self.instructions
            .iter()
            .enumerate()
            .map(move |(offset, instruction)| (self.start + offset, instruction))
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` for a block without instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
