//! Hotspot ranking and the optimisation headroom score.
//!
//! Each instruction is weighted by `cycles × 10^loop_depth`. An instruction is a hotspot
//! when its own cost exceeds the variant threshold, when it sits in a loop nested at
//! least two deep, or when the front end marked it as hot.
//!
//! The `performance_score` is the share of weighted cycles spent in hotspots. It
//! measures headroom: a high score means a lot of time is concentrated in few places
//! that can be optimised, a low score means there is little to gain.

use serde::{Deserialize, Serialize};

use crate::{il::IlOpcode, timing::context::FunctionContext};

/// Weight factor per loop nesting level.
const LOOP_WEIGHT: u64 = 10;
/// Loop depth from which an instruction is always a hotspot.
const DEEP_LOOP: usize = 2;
/// Weights stop growing past this depth.
const MAX_WEIGHTED_DEPTH: u32 = 6;

/// One flagged instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Instruction index
    pub index: usize,
    /// Opcode
    pub opcode: IlOpcode,
    /// Cycles of one execution
    pub cycles: u32,
    /// Loop nesting depth
    pub loop_depth: usize,
    /// `cycles × 10^loop_depth`
    pub weighted_cycles: u64,
    /// Cost exceeds the variant threshold
    pub exceeds_threshold: bool,
    /// Nested at least two loops deep
    pub deep_loop: bool,
    /// Marked hot by the front end
    pub hinted: bool,
}

/// Result of the hotspot sub-analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotspotAnalysis {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// Variant threshold in cycles
    pub threshold_cycles: u32,
    /// Hotspots, heaviest first
    pub hotspots: Vec<Hotspot>,
    /// Weighted cycles of all instructions
    pub total_weighted_cycles: u64,
    /// Weighted cycles of the hotspots
    pub hotspot_weighted_cycles: u64,
    /// Optimisation headroom, 0-100, higher means more room to optimise
    pub performance_score: f64,
}

impl HotspotAnalysis {
    /// Placeholder for a disabled sub-analysis.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }
}

fn loop_weight(depth: usize) -> u64 {
    let depth = u32::try_from(depth).unwrap_or(MAX_WEIGHTED_DEPTH).min(MAX_WEIGHTED_DEPTH);
    LOOP_WEIGHT.pow(depth)
}

pub(crate) fn analyze(ctx: &FunctionContext<'_>) -> HotspotAnalysis {
    let threshold_cycles = ctx.analyzer.hotspot_threshold();
    let mut total_weighted_cycles = 0u64;
    let mut hotspots = Vec::new();

    for (index, instruction) in ctx.function.instructions.iter().enumerate() {
        let cycles = ctx.cycles[index];
        let loop_depth = ctx.depths[index];
        let weighted_cycles = u64::from(cycles).saturating_mul(loop_weight(loop_depth));
        total_weighted_cycles = total_weighted_cycles.saturating_add(weighted_cycles);

        if cycles == 0 {
            continue;
        }
        let exceeds_threshold = cycles > threshold_cycles;
        let deep_loop = loop_depth >= DEEP_LOOP;
        let hinted = instruction.hints.as_ref().is_some_and(|h| h.hot_path);
        if exceeds_threshold || deep_loop || hinted {
            hotspots.push(Hotspot {
                index,
                opcode: instruction.opcode,
                cycles,
                loop_depth,
                weighted_cycles,
                exceeds_threshold,
                deep_loop,
                hinted,
            });
        }
    }

    hotspots.sort_by(|a, b| {
        b.weighted_cycles
            .cmp(&a.weighted_cycles)
            .then(a.index.cmp(&b.index))
    });

    let hotspot_weighted_cycles = hotspots
        .iter()
        .fold(0u64, |acc, h| acc.saturating_add(h.weighted_cycles));
    let performance_score = if total_weighted_cycles == 0 {
        0.0
    } else {
        (hotspot_weighted_cycles as f64 * 100.0 / total_weighted_cycles as f64).clamp(0.0, 100.0)
    };

    HotspotAnalysis {
        enabled: true,
        threshold_cycles,
        hotspots,
        total_weighted_cycles,
        hotspot_weighted_cycles,
        performance_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::ControlFlowAnalyzer,
        il::{FunctionBuilder, IlValue},
        timing::Mos6502Analyzer,
    };

    fn run(builder: &FunctionBuilder) -> HotspotAnalysis {
        let function = builder.build();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&function).unwrap();
        let ctx = FunctionContext::new(&function, &cfa, &Mos6502Analyzer).unwrap();
        analyze(&ctx)
    }

    #[test]
    fn test_cheap_function_has_no_headroom() {
        let mut builder = FunctionBuilder::new("cheap");
        builder.nop().ret(None);
        let analysis = run(&builder);
        assert!(analysis.hotspots.is_empty());
        assert_eq!(analysis.performance_score, 0.0);
    }

    #[test]
    fn test_expensive_instruction_dominates_score() {
        let mut builder = FunctionBuilder::new("divide");
        builder
            .binary(IlOpcode::Div, IlValue::temp(0), IlValue::temp(1), IlValue::byte(3))
            .ret(Some(IlValue::temp(0)));
        let analysis = run(&builder);

        assert_eq!(analysis.hotspots.len(), 1);
        assert!(analysis.hotspots[0].exceeds_threshold);
        // 80 of 86 weighted cycles
        assert!(analysis.performance_score > 90.0);
    }

    #[test]
    fn test_nested_loop_instructions_are_flagged() {
        let mut builder = FunctionBuilder::new("nested");
        builder
            .label("outer")
            .label("inner")
            .nop()
            .branch_if_true(IlValue::temp(0), "inner")
            .branch_if_true(IlValue::temp(1), "outer")
            .ret(None);
        let analysis = run(&builder);

        let flagged: Vec<usize> = analysis.hotspots.iter().map(|h| h.index).collect();
        assert_eq!(flagged, vec![3, 2]);
        assert!(analysis.hotspots.iter().all(|h| h.deep_loop && h.loop_depth == 2));
        assert_eq!(analysis.hotspots[0].weighted_cycles, 600);
    }
}
