//! Variant-aware optimisation recommendations.

use std::{
    cmp::{Ordering, Reverse},
    collections::BTreeMap,
};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    il::{IlInstruction, IlOpcode, IlValue, StorageClass, StorageHint, VariableScope},
    timing::{context::FunctionContext, VariantFeatures},
};

/// Priority added per loop nesting level.
const DEPTH_BONUS: u32 = 10;
/// Largest loop body, in instructions, still worth unrolling.
const UNROLL_BODY_LIMIT: usize = 16;
/// Iterations saved per four unrolled copies.
const UNROLL_SAVED_BRANCHES: u32 = 3;

/// The transformation a recommendation suggests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecommendationKind {
    /// Power-of-two multiply, divide or modulo as shifts or masks
    StrengthReduction,
    /// `INC`/`DEC` for adding or subtracting one
    IncrementDecrement,
    /// Move a loop-hot variable into zero page
    ZeroPagePromotion,
    /// `STZ` for storing zero (65C02)
    StoreZero,
    /// `BRA` for unconditional branches (65C02)
    BranchAlways,
    /// Unroll a small, deeply nested loop
    LoopUnrolling,
}

/// How hard a recommendation is to apply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Difficulty {
    /// Local peephole rewrite
    Trivial,
    /// Local rewrite with a side condition
    Easy,
    /// Allocation change
    Moderate,
    /// Restructures control flow
    Hard,
}

/// One suggested optimisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// What to do
    pub kind: RecommendationKind,
    /// First instruction concerned
    pub instruction: Option<usize>,
    /// Variable concerned
    pub variable: Option<String>,
    /// 0-100, higher first
    pub priority: u8,
    /// Effort
    pub difficulty: Difficulty,
    /// Estimated cycles saved per execution
    pub cycle_benefit: u32,
    /// Estimated bytes saved
    pub byte_benefit: u32,
    /// Human readable description
    pub description: String,
}

/// Result of the recommendation sub-analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationAnalysis {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// Sorted by descending priority, then instruction index
    pub recommendations: Vec<Recommendation>,
    /// Sum of the cycle benefits
    pub total_cycle_benefit: u64,
    /// Sum of the byte benefits
    pub total_byte_benefit: u64,
}

impl RecommendationAnalysis {
    /// Placeholder for a disabled sub-analysis.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Recommendations of one kind.
    pub fn of_kind(&self, kind: RecommendationKind) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(move |r| r.kind == kind)
    }
}

fn priority(base: u32, depth: usize) -> u8 {
    let depth = u32::try_from(depth).unwrap_or(u32::MAX);
    let value = base.saturating_add(depth.saturating_mul(DEPTH_BONUS)).min(100);
    u8::try_from(value).unwrap_or(100)
}

fn constant(value: Option<&IlValue>) -> Option<i32> {
    value.and_then(IlValue::as_constant).map(|c| c.value)
}

fn strength_reduction(
    ctx: &FunctionContext<'_>,
    index: usize,
    instruction: &IlInstruction,
) -> Option<Recommendation> {
    let divisor = instruction.operands.get(2).and_then(IlValue::as_constant)?;
    if !divisor.is_power_of_two() || divisor.value < 2 {
        return None;
    }
    let shift = divisor.value.trailing_zeros();
    let (cost, rewrite) = match instruction.opcode {
        IlOpcode::Mul => (shift * 5, format!("shift left by {shift}")),
        IlOpcode::Div => (shift * 5, format!("shift right by {shift}")),
        IlOpcode::Mod => (9, format!("mask with {}", divisor.value - 1)),
        _ => return None,
    };
    Some(Recommendation {
        kind: RecommendationKind::StrengthReduction,
        instruction: Some(index),
        variable: None,
        priority: priority(60, ctx.depths[index]),
        difficulty: Difficulty::Easy,
        cycle_benefit: ctx.table.base_cycles(instruction.opcode).saturating_sub(cost),
        byte_benefit: 3,
        description: format!("{} by {} can be a {rewrite}", instruction.opcode, divisor.value),
    })
}

fn increment(
    ctx: &FunctionContext<'_>,
    index: usize,
    instruction: &IlInstruction,
) -> Option<Recommendation> {
    if !matches!(instruction.opcode, IlOpcode::Add | IlOpcode::Sub) {
        return None;
    }
    if constant(instruction.operands.get(2)) != Some(1) {
        return None;
    }
    let dest = instruction.operands.first().and_then(IlValue::variable_key);
    let source = instruction.operands.get(1).and_then(IlValue::variable_key);
    let in_place = dest.is_some() && dest == source;
    let verb = if instruction.opcode == IlOpcode::Add { "INC" } else { "DEC" };
    Some(Recommendation {
        kind: RecommendationKind::IncrementDecrement,
        instruction: Some(index),
        variable: dest,
        priority: priority(40, ctx.depths[index]),
        difficulty: Difficulty::Trivial,
        cycle_benefit: if in_place { 6 } else { 2 },
        byte_benefit: if in_place { 4 } else { 1 },
        description: format!("{} by one can use {verb}", instruction.opcode),
    })
}

fn store_zero(
    ctx: &FunctionContext<'_>,
    index: usize,
    instruction: &IlInstruction,
) -> Option<Recommendation> {
    if instruction.opcode != IlOpcode::StoreVariable
        || constant(instruction.operands.get(1)) != Some(0)
    {
        return None;
    }
    Some(Recommendation {
        kind: RecommendationKind::StoreZero,
        instruction: Some(index),
        variable: instruction.operands.first().and_then(IlValue::variable_key),
        priority: priority(35, ctx.depths[index]),
        difficulty: Difficulty::Trivial,
        cycle_benefit: 2,
        byte_benefit: 2,
        description: "storing zero can use STZ".to_string(),
    })
}

fn branch_always(
    ctx: &FunctionContext<'_>,
    index: usize,
    instruction: &IlInstruction,
) -> Option<Recommendation> {
    if instruction.opcode != IlOpcode::Branch {
        return None;
    }
    Some(Recommendation {
        kind: RecommendationKind::BranchAlways,
        instruction: Some(index),
        variable: None,
        priority: priority(20, ctx.depths[index]),
        difficulty: Difficulty::Trivial,
        cycle_benefit: 0,
        byte_benefit: 1,
        description: "unconditional branch can use BRA".to_string(),
    })
}

/// One promotion per variable accessed inside a loop that does not live in zero page.
fn zero_page_candidates(ctx: &FunctionContext<'_>) -> Vec<Recommendation> {
    let zero_page_locals: Vec<&str> = ctx
        .function
        .locals
        .iter()
        .filter(|l| l.allocation == StorageClass::ZeroPage)
        .map(|l| l.name.as_str())
        .collect();

    let mut accesses: BTreeMap<&str, (u32, usize, usize)> = BTreeMap::new();
    for (index, instruction) in ctx.function.instructions.iter().enumerate() {
        let depth = ctx.depths[index];
        if depth == 0 {
            continue;
        }
        for value in instruction.operands.iter().chain(instruction.result.iter()) {
            let IlValue::Variable(variable) = value else {
                continue;
            };
            if variable.scope == VariableScope::Temporary
                || variable.storage == StorageHint::ZeroPage
                || zero_page_locals.contains(&variable.name.as_str())
            {
                continue;
            }
            let entry = accesses
                .entry(variable.name.as_str())
                .or_insert((0, depth, index));
            entry.0 += 1;
            entry.1 = entry.1.max(depth);
        }
    }

    accesses
        .into_iter()
        .map(|(name, (count, depth, first))| Recommendation {
            kind: RecommendationKind::ZeroPagePromotion,
            instruction: Some(first),
            variable: Some(name.to_string()),
            priority: priority(30 + count.min(20), depth),
            difficulty: Difficulty::Moderate,
            cycle_benefit: count,
            byte_benefit: count,
            description: format!("{name} is accessed {count} times inside loops"),
        })
        .collect()
}

fn loop_unrolling(ctx: &FunctionContext<'_>) -> Vec<Recommendation> {
    let cfg = &ctx.analysis.cfg;
    ctx.analysis
        .loops
        .iter()
        .filter(|l| l.is_innermost && l.depth >= 2)
        .filter_map(|l| {
            let body: usize = l.body.iter().filter_map(|b| cfg.block(*b)).map(|b| b.len()).sum();
            if body > UNROLL_BODY_LIMIT {
                return None;
            }
            let header = cfg.block(l.header)?;
            let branch_cycles: u32 = l
                .latches
                .iter()
                .filter_map(|b| cfg.block(*b))
                .filter_map(|b| b.end.checked_sub(1))
                .map(|i| ctx.cycles[i])
                .sum();
            Some(Recommendation {
                kind: RecommendationKind::LoopUnrolling,
                instruction: Some(header.start),
                variable: None,
                priority: priority(50, l.depth),
                difficulty: Difficulty::Hard,
                cycle_benefit: branch_cycles.saturating_mul(UNROLL_SAVED_BRANCHES),
                byte_benefit: 0,
                description: format!(
                    "loop at {} has {} instructions at depth {}",
                    l.header, body, l.depth
                ),
            })
        })
        .collect()
}

fn ordering(a: &Recommendation, b: &Recommendation) -> Ordering {
    Reverse(a.priority)
        .cmp(&Reverse(b.priority))
        .then(a.instruction.unwrap_or(usize::MAX).cmp(&b.instruction.unwrap_or(usize::MAX)))
        .then(a.kind.cmp(&b.kind))
        .then(a.variable.cmp(&b.variable))
}

pub(crate) fn analyze(ctx: &FunctionContext<'_>) -> RecommendationAnalysis {
    let features = ctx.analyzer.features();
    let mut recommendations = Vec::new();

    for (index, instruction) in ctx.function.instructions.iter().enumerate() {
        recommendations.extend(strength_reduction(ctx, index, instruction));
        recommendations.extend(increment(ctx, index, instruction));
        if features.contains(VariantFeatures::STORE_ZERO) {
            recommendations.extend(store_zero(ctx, index, instruction));
        }
        if features.contains(VariantFeatures::BRANCH_ALWAYS) {
            recommendations.extend(branch_always(ctx, index, instruction));
        }
    }
    recommendations.extend(zero_page_candidates(ctx));
    recommendations.extend(loop_unrolling(ctx));
    recommendations.sort_by(ordering);

    RecommendationAnalysis {
        enabled: true,
        total_cycle_benefit: recommendations.iter().map(|r| u64::from(r.cycle_benefit)).sum(),
        total_byte_benefit: recommendations.iter().map(|r| u64::from(r.byte_benefit)).sum(),
        recommendations,
    }
}
