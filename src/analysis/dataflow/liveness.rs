//! Live variable analysis.
//!
//! A variable is *live* at a program point if there exists a path from that point to a
//! use of the variable that doesn't pass through a definition of the variable.
//!
//! # Algorithm
//!
//! This is a backward data flow analysis:
//!
//! - `USE[B]` = variables used in B before any definition
//! - `DEF[B]` = variables defined in B
//! - `OUT[B]` = ∪{IN[S] | S is a successor of B}
//! - `IN[B]` = USE[B] ∪ (OUT[B] − DEF[B])
//!
//! Per-instruction liveness is then recovered by walking each block backwards from its
//! OUT set.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    analysis::{
        dataflow::{
            reaching::{instruction_def, instruction_uses},
            solver::{solve, Direction, GenKill},
            BlockLiveness,
        },
        ControlFlowGraph,
    },
    il::IlOpcode,
    utils::{graph::NodeId, BitSet},
};

/// Liveness around one instruction.
pub(crate) struct InstructionLiveness {
    /// Function instruction index
    pub(crate) index: usize,
    /// Variable defined here
    pub(crate) def: Option<usize>,
    /// Copy source, exempt from interference with the copy destination
    pub(crate) copy_source: Option<usize>,
    /// Variables live before the instruction executes
    pub(crate) live_before: BitSet,
    /// Variables live after the instruction executes
    pub(crate) live_after: BitSet,
}

/// Result of [`live_variables`].
pub(crate) struct Liveness {
    /// Variable names, indexed by dense variable id
    pub(crate) names: Vec<String>,
    /// Block live-in/live-out sets
    pub(crate) blocks: BTreeMap<NodeId, BlockLiveness>,
    /// Per-instruction liveness in function order
    pub(crate) instructions: Vec<InstructionLiveness>,
}

impl Liveness {
    fn names_of(&self, set: &BitSet) -> BTreeSet<String> {
        set.iter().filter_map(|v| self.names.get(v).cloned()).collect()
    }
}

/// Computes block and instruction liveness over the reachable blocks of `cfg`.
pub(crate) fn live_variables(cfg: &ControlFlowGraph, reachable: &[NodeId]) -> Liveness {
    let mut ids: BTreeMap<String, usize> = BTreeMap::new();
    for &block_id in reachable {
        let Some(block) = cfg.block(block_id) else {
            continue;
        };
        for instruction in &block.instructions {
            for (variable, _) in instruction_uses(instruction) {
                ids.entry(variable).or_insert(0);
            }
            if let Some(variable) = instruction_def(instruction) {
                ids.entry(variable).or_insert(0);
            }
        }
    }
    for (id, slot) in ids.values_mut().enumerate() {
        *slot = id;
    }
    let universe = ids.len();

    let block_count = cfg.block_count();
    let mut problem = GenKill {
        gen: vec![BitSet::new(universe); block_count],
        kill: vec![BitSet::new(universe); block_count],
    };
    for &block_id in reachable {
        let Some(block) = cfg.block(block_id) else {
            continue;
        };
        let b = block_id.index();
        for instruction in &block.instructions {
            for (variable, _) in instruction_uses(instruction) {
                let v = ids[&variable];
                if !problem.kill[b].contains(v) {
                    problem.gen[b].insert(v);
                }
            }
            if let Some(variable) = instruction_def(instruction) {
                problem.kill[b].insert(ids[&variable]);
            }
        }
    }

    let solution = solve(cfg, Direction::Backward, universe, &problem);

    let mut instructions = Vec::new();
    for &block_id in reachable {
        let Some(block) = cfg.block(block_id) else {
            continue;
        };
        let mut live = solution.exit[block_id.index()].clone();
        let mut per_block = Vec::with_capacity(block.len());

        let indexed: Vec<_> = block.indexed_instructions().collect();
        for (index, instruction) in indexed.into_iter().rev() {
            let live_after = live.clone();
            let def = instruction_def(instruction).map(|v| ids[&v]);
            if let Some(d) = def {
                live.remove(d);
            }
            let uses = instruction_uses(instruction);
            for (variable, _) in &uses {
                live.insert(ids[variable]);
            }
            let copy_source = if instruction.opcode == IlOpcode::Copy {
                uses.first().map(|(variable, _)| ids[variable])
            } else {
                None
            };
            per_block.push(InstructionLiveness {
                index,
                def,
                copy_source,
                live_before: live.clone(),
                live_after,
            });
        }

        per_block.reverse();
        instructions.extend(per_block);
    }
    instructions.sort_by_key(|i| i.index);

    let mut names = vec![String::new(); universe];
    for (name, id) in ids {
        names[id] = name;
    }

    let mut liveness = Liveness {
        names,
        blocks: BTreeMap::new(),
        instructions,
    };
    for &block_id in reachable {
        let b = block_id.index();
        let record = BlockLiveness {
            live_in: liveness.names_of(&solution.entry[b]),
            live_out: liveness.names_of(&solution.exit[b]),
        };
        liveness.blocks.insert(block_id, record);
    }

    log::trace!(
        "{}: liveness converged after {} block evaluations",
        cfg.function_name(),
        solution.iterations
    );

    liveness
}
