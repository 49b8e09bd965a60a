//! Cycle attribution and critical path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    il::IlOpcode,
    timing::context::FunctionContext,
    utils::graph::{algorithms, NodeId, Successors},
};

/// Cycles charged to one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleAttribution {
    /// Instruction index
    pub index: usize,
    /// Opcode of the instruction
    pub opcode: IlOpcode,
    /// Cycles
    pub cycles: u32,
    /// Loop nesting depth of the instruction
    pub loop_depth: usize,
}

/// Result of the cycle timing sub-analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTimingAnalysis {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// Sum of all attributions
    pub total_cycles: u64,
    /// Longest acyclic path from the entry to an exit
    pub critical_path_cycles: u64,
    /// One entry per instruction
    pub attributions: Vec<CycleAttribution>,
    /// Cycles per opcode
    pub by_opcode: BTreeMap<IlOpcode, u64>,
}

impl CycleTimingAnalysis {
    /// Placeholder for a disabled sub-analysis.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Mean cycles per instruction, 0 for an empty function.
    #[must_use]
    pub fn cycles_per_instruction(&self) -> f64 {
        if self.attributions.is_empty() {
            return 0.0;
        }
        self.total_cycles as f64 / self.attributions.len() as f64
    }
}

pub(crate) fn analyze(ctx: &FunctionContext<'_>) -> CycleTimingAnalysis {
    let mut by_opcode: BTreeMap<IlOpcode, u64> = BTreeMap::new();
    let attributions: Vec<CycleAttribution> = ctx
        .function
        .instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| {
            let cycles = ctx.cycles[index];
            *by_opcode.entry(instruction.opcode).or_default() += u64::from(cycles);
            CycleAttribution {
                index,
                opcode: instruction.opcode,
                cycles,
                loop_depth: ctx.depths[index],
            }
        })
        .collect();

    CycleTimingAnalysis {
        enabled: true,
        total_cycles: attributions.iter().map(|a| u64::from(a.cycles)).sum(),
        critical_path_cycles: critical_path(ctx),
        attributions,
        by_opcode,
    }
}

/// Longest entry-to-exit path over block cycle sums.
///
/// Edges that go backwards in reverse postorder close cycles and are ignored, which
/// leaves a DAG. If no exit is reachable, the longest path to any block is used.
pub(crate) fn critical_path(ctx: &FunctionContext<'_>) -> u64 {
    let cfg = &ctx.analysis.cfg;
    let Some(entry) = cfg.entry() else {
        return 0;
    };

    let order = algorithms::reverse_postorder(cfg, entry);
    let numbering = algorithms::rpo_numbering(cfg, entry);
    let block_cost = |node: NodeId| -> u64 {
        cfg.block(node).map_or(0, |b| {
            (b.start..b.end).map(|i| u64::from(ctx.cycles[i])).sum()
        })
    };

    let mut longest: BTreeMap<NodeId, u64> = BTreeMap::new();
    longest.insert(entry, block_cost(entry));
    for &node in &order {
        let Some(&here) = longest.get(&node) else {
            continue;
        };
        let Some(position) = numbering.get(node.index()).copied().flatten() else {
            continue;
        };
        for succ in cfg.successors(node) {
            let forward = numbering
                .get(succ.index())
                .copied()
                .flatten()
                .is_some_and(|p| p > position);
            if !forward {
                continue;
            }
            let candidate = here + block_cost(succ);
            let slot = longest.entry(succ).or_insert(0);
            *slot = (*slot).max(candidate);
        }
    }

    let to_exit = cfg
        .exits()
        .iter()
        .filter_map(|exit| longest.get(exit))
        .copied()
        .max();
    to_exit.unwrap_or_else(|| longest.values().copied().max().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::ControlFlowAnalyzer,
        il::{FunctionBuilder, IlType, IlValue},
        timing::Mos6502Analyzer,
    };

    fn timing_of(builder: &FunctionBuilder) -> CycleTimingAnalysis {
        let function = builder.build();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&function).unwrap();
        let ctx = FunctionContext::new(&function, &cfa, &Mos6502Analyzer).unwrap();
        analyze(&ctx)
    }

    #[test]
    fn test_straight_line_totals() {
        let mut builder = FunctionBuilder::new("line");
        builder
            .load_immediate(IlValue::temp(0), IlValue::byte(1))
            .nop()
            .ret(None);
        let timing = timing_of(&builder);
        assert_eq!(timing.total_cycles, 5 + 2 + 6);
        assert_eq!(timing.critical_path_cycles, timing.total_cycles);
        assert_eq!(timing.by_opcode[&IlOpcode::Nop], 2);
        assert_eq!(timing.attributions.len(), 3);
    }

    #[test]
    fn test_critical_path_takes_longer_arm() {
        let cond = IlValue::local("c", IlType::Boolean);
        let mut builder = FunctionBuilder::new("arms");
        builder
            .branch_if_true(cond, "slow")
            .nop()
            .branch("end")
            .label("slow")
            .binary(IlOpcode::Mul, IlValue::temp(0), IlValue::temp(1), IlValue::byte(3))
            .label("end")
            .ret(None);
        let timing = timing_of(&builder);

        // branch-if, label + mul, label + return
        assert_eq!(timing.critical_path_cycles, 6 + 48 + 6);
        assert!(timing.critical_path_cycles < timing.total_cycles);
    }

    #[test]
    fn test_loop_body_counted_once() {
        let mut builder = FunctionBuilder::new("spin");
        builder.label("top").nop().branch("top");
        let timing = timing_of(&builder);
        assert_eq!(timing.critical_path_cycles, 2 + 3);
        assert!(timing.attributions.iter().all(|a| a.loop_depth == 1));
    }
}
