//! Optimisation readiness per category, transformation safety and impact potential.
//!
//! Opportunities are counted from the IL so that readiness does not depend on which
//! timing sub-analyses ran. Benefits come from the timing recommendations when they
//! are available and from a per-opportunity estimate otherwise.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    analysis::{ControlFlowAnalysisResult, Severity},
    il::{IlFunction, IlInstruction, IlOpcode, IlValue, OpcodeCategory},
    metrics::{clamp_score, PerformancePrediction},
    timing::{RecommendationKind, TimingValidationResult},
};

/// Family of transformations a pattern belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OptimizationCategory {
    /// Strength reduction, increment and decrement
    Arithmetic,
    /// Branch and loop restructuring
    ControlFlow,
    /// Load, store and placement of variables
    Memory,
    /// Register allocation and copy coalescing
    Register,
    /// Variant-specific instructions and hardware access
    HardwareSpecific,
    /// Constant folding
    Constant,
}

impl OptimizationCategory {
    fn base_confidence(self) -> f64 {
        match self {
            OptimizationCategory::Constant => 0.95,
            OptimizationCategory::Arithmetic => 0.9,
            OptimizationCategory::HardwareSpecific => 0.85,
            OptimizationCategory::Memory => 0.8,
            OptimizationCategory::ControlFlow => 0.7,
            OptimizationCategory::Register => 0.6,
        }
    }

    /// Benefit in percent assumed per opportunity when no recommendation covers it.
    fn estimated_benefit_per_opportunity(self) -> f64 {
        match self {
            OptimizationCategory::Arithmetic | OptimizationCategory::Constant => 3.0,
            OptimizationCategory::ControlFlow => 4.0,
            OptimizationCategory::Memory | OptimizationCategory::HardwareSpecific => 2.0,
            OptimizationCategory::Register => 1.5,
        }
    }

    fn covers(self, kind: RecommendationKind) -> bool {
        matches!(
            (self, kind),
            (
                OptimizationCategory::Arithmetic,
                RecommendationKind::StrengthReduction | RecommendationKind::IncrementDecrement
            ) | (OptimizationCategory::Memory, RecommendationKind::ZeroPagePromotion)
                | (
                    OptimizationCategory::HardwareSpecific,
                    RecommendationKind::StoreZero | RecommendationKind::BranchAlways
                )
                | (OptimizationCategory::ControlFlow, RecommendationKind::LoopUnrolling)
        )
    }
}

/// Readiness of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReadiness {
    /// Category
    pub category: OptimizationCategory,
    /// 0-100, 0 when there is nothing to do
    pub readiness_score: f64,
    /// 0-1
    pub confidence: f64,
    /// Estimated cycle reduction in percent
    pub estimated_benefit_percent: f64,
    /// Places where a transformation of this category applies
    pub opportunities: usize,
}

/// How safely the function can be transformed. All scores are 0-100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationSafety {
    /// Preservation of observable behaviour
    pub semantic_safety: f64,
    /// Risk of making timing worse
    pub performance_safety: f64,
    /// Fit with the target hardware
    pub platform_safety: f64,
    /// Mean of the three
    pub overall_safety: f64,
}

/// Estimated savings from the timing recommendations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactPotential {
    /// Cycles saved
    pub estimated_cycle_savings: u64,
    /// Bytes saved
    pub estimated_byte_savings: u64,
    /// Savings relative to the total, in percent
    pub estimated_speedup_percent: f64,
}

/// Optimisation readiness of one function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReadiness {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// One entry per category, in declaration order
    pub categories: Vec<CategoryReadiness>,
    /// Mean readiness across categories
    pub overall_readiness: f64,
    /// Transformation safety
    pub safety: TransformationSafety,
    /// Impact potential
    pub impact: ImpactPotential,
}

impl OptimizationReadiness {
    /// Placeholder for a disabled sub-analysis.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Readiness of `category`, if computed.
    #[must_use]
    pub fn category(&self, category: OptimizationCategory) -> Option<&CategoryReadiness> {
        self.categories.iter().find(|c| c.category == category)
    }
}

fn constant_value(value: &IlValue) -> Option<i32> {
    value.as_constant().map(|c| c.value)
}

fn read_operands(instruction: &IlInstruction) -> &[IlValue] {
    let start = instruction.first_read_operand().min(instruction.operands.len());
    &instruction.operands[start..]
}

fn is_arithmetic_opportunity(instruction: &IlInstruction) -> bool {
    let reads = read_operands(instruction);
    match instruction.opcode {
        IlOpcode::Mul | IlOpcode::Div | IlOpcode::Mod => reads
            .get(1)
            .and_then(IlValue::as_constant)
            .is_some_and(|c| c.is_power_of_two()),
        IlOpcode::Add | IlOpcode::Sub => reads
            .iter()
            .filter_map(constant_value)
            .any(|v| v == 1 || v == -1),
        _ => false,
    }
}

fn is_foldable(instruction: &IlInstruction) -> bool {
    let foldable_category = matches!(
        instruction.opcode.category(),
        OpcodeCategory::Arithmetic
            | OpcodeCategory::Logical
            | OpcodeCategory::Bitwise
            | OpcodeCategory::Shift
            | OpcodeCategory::Comparison
    );
    let reads = read_operands(instruction);
    foldable_category && !reads.is_empty() && reads.iter().all(|v| v.as_constant().is_some())
}

fn count_opportunities(
    category: OptimizationCategory,
    function: &IlFunction,
    analysis: &ControlFlowAnalysisResult,
) -> usize {
    let instructions = &function.instructions;
    match category {
        OptimizationCategory::Arithmetic => instructions
            .iter()
            .filter(|i| is_arithmetic_opportunity(i))
            .count(),
        OptimizationCategory::Constant => instructions.iter().filter(|i| is_foldable(i)).count(),
        OptimizationCategory::ControlFlow => {
            instructions.iter().filter(|i| i.opcode.is_branch()).count() + analysis.loops.len()
        }
        OptimizationCategory::Memory => instructions
            .iter()
            .filter(|i| {
                matches!(
                    i.opcode,
                    IlOpcode::LoadVariable
                        | IlOpcode::StoreVariable
                        | IlOpcode::LoadArray
                        | IlOpcode::StoreArray
                )
            })
            .count(),
        OptimizationCategory::Register => {
            let copies = instructions
                .iter()
                .filter(|i| i.opcode == IlOpcode::Copy)
                .count();
            copies + analysis.data_flow.max_live_variables.saturating_sub(3)
        }
        OptimizationCategory::HardwareSpecific => {
            let stores_of_zero = instructions
                .iter()
                .filter(|i| {
                    matches!(i.opcode, IlOpcode::StoreVariable | IlOpcode::Poke)
                        && i.operands.get(1).and_then(constant_value) == Some(0)
                })
                .count();
            let flag_ops = instructions
                .iter()
                .filter(|i| matches!(i.opcode, IlOpcode::SetFlag | IlOpcode::ClearFlag))
                .count();
            stores_of_zero + flag_ops
        }
    }
}

fn recommendation_benefit(
    category: OptimizationCategory,
    timing: Option<&TimingValidationResult>,
) -> Option<f64> {
    let timing = timing.filter(|t| t.recommendations.enabled && t.total_cycles() > 0)?;
    let saved: u64 = timing
        .recommendations
        .recommendations
        .iter()
        .filter(|r| category.covers(r.kind))
        .map(|r| u64::from(r.cycle_benefit))
        .sum();
    if saved == 0 {
        return None;
    }
    Some(clamp_score(saved as f64 * 100.0 / timing.total_cycles() as f64))
}

fn safety(
    function: &IlFunction,
    analysis: &ControlFlowAnalysisResult,
    performance: &PerformancePrediction,
    timing: Option<&TimingValidationResult>,
) -> TransformationSafety {
    let (errors, warnings) = analysis.issues.iter().fold((0usize, 0usize), |(e, w), issue| {
        match issue.severity {
            Severity::Error => (e + 1, w),
            Severity::Warning => (e, w + 1),
            Severity::Info => (e, w),
        }
    });
    let hardware_accesses = function
        .instructions
        .iter()
        .filter(|i| matches!(i.opcode, IlOpcode::Peek | IlOpcode::Poke))
        .count();
    let mut semantic = 100.0 - 20.0 * errors as f64 - 5.0 * warnings as f64;
    semantic -= (5.0 * hardware_accesses as f64).min(30.0);
    if function.is_interrupt_handler {
        semantic -= 10.0;
    }

    let performance_safety = match timing {
        Some(timing) => {
            let mut score = 100.0 - timing.performance_score() * 0.3;
            if timing.registers.spill_risk {
                score -= 20.0;
            }
            score
        }
        None => 100.0 * performance.confidence,
    };

    let platform = match timing {
        Some(timing) => {
            let (errors, warnings) = timing.issues.iter().fold((0usize, 0usize), |(e, w), issue| {
                match issue.severity {
                    Severity::Error => (e + 1, w),
                    Severity::Warning => (e, w + 1),
                    Severity::Info => (e, w),
                }
            });
            100.0 - 25.0 * errors as f64 - 10.0 * warnings as f64
        }
        None => 50.0,
    };

    let semantic_safety = clamp_score(semantic);
    let performance_safety = clamp_score(performance_safety);
    let platform_safety = clamp_score(platform);
    TransformationSafety {
        semantic_safety,
        performance_safety,
        platform_safety,
        overall_safety: (semantic_safety + performance_safety + platform_safety) / 3.0,
    }
}

fn impact(timing: Option<&TimingValidationResult>) -> ImpactPotential {
    let Some(timing) = timing.filter(|t| t.recommendations.enabled) else {
        return ImpactPotential::default();
    };
    let recommendations = &timing.recommendations;
    let estimated_speedup_percent = if timing.total_cycles() == 0 {
        0.0
    } else {
        clamp_score(
            recommendations.total_cycle_benefit as f64 * 100.0 / timing.total_cycles() as f64,
        )
    };
    ImpactPotential {
        estimated_cycle_savings: recommendations.total_cycle_benefit,
        estimated_byte_savings: recommendations.total_byte_benefit,
        estimated_speedup_percent,
    }
}

/// Blends the complexity and performance signals with the opportunity count.
///
/// `complexity` and the performance prediction are computed even when their own sections
/// of the report are disabled.
pub(crate) fn assess(
    function: &IlFunction,
    analysis: &ControlFlowAnalysisResult,
    complexity: f64,
    performance: &PerformancePrediction,
    timing: Option<&TimingValidationResult>,
) -> OptimizationReadiness {
    let headroom = timing.map_or(0.0, TimingValidationResult::performance_score);
    let timing_factor = if timing.is_some() { 1.0 } else { 0.7 };

    let categories: Vec<CategoryReadiness> = OptimizationCategory::iter()
        .map(|category| {
            let opportunities = count_opportunities(category, function, analysis);
            let readiness_score = if opportunities == 0 {
                0.0
            } else {
                clamp_score(
                    0.4 * (100.0 - complexity)
                        + 0.3 * headroom
                        + 0.3 * (opportunities as f64 * 20.0).min(100.0),
                )
            };
            let estimated_benefit_percent = if opportunities == 0 {
                0.0
            } else {
                recommendation_benefit(category, timing).unwrap_or_else(|| {
                    (opportunities as f64 * category.estimated_benefit_per_opportunity()).min(50.0)
                })
            };
            CategoryReadiness {
                category,
                readiness_score,
                confidence: (category.base_confidence() * timing_factor).clamp(0.0, 1.0),
                estimated_benefit_percent,
                opportunities,
            }
        })
        .collect();

    let overall_readiness = if categories.is_empty() {
        0.0
    } else {
        categories.iter().map(|c| c.readiness_score).sum::<f64>() / categories.len() as f64
    };

    OptimizationReadiness {
        enabled: true,
        categories,
        overall_readiness: clamp_score(overall_readiness),
        safety: safety(function, analysis, performance, timing),
        impact: impact(timing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::ControlFlowAnalyzer,
        il::{FunctionBuilder, IlType},
        metrics::performance,
        timing::{TimingOptions, TimingValidator},
    };

    fn run(function: &IlFunction, with_timing: bool) -> OptimizationReadiness {
        let cfa = ControlFlowAnalyzer::default().analyze_function(function).unwrap();
        let timing = with_timing.then(|| {
            TimingValidator::new(TimingOptions::for_target("x16", "65c02").unwrap())
                .analyze_function(function, &cfa)
                .unwrap()
        });
        let prediction = performance::predict(function, &cfa, timing.as_ref());
        assess(function, &cfa, 10.0, &prediction, timing.as_ref())
    }

    #[test]
    fn test_every_category_is_reported() {
        let readiness = run(&IlFunction::new("empty"), false);
        assert_eq!(readiness.categories.len(), 6);
        assert!(readiness.categories.iter().all(|c| c.opportunities == 0));
        assert_eq!(readiness.overall_readiness, 0.0);
        assert!(readiness.enabled);
    }

    #[test]
    fn test_arithmetic_and_constant_opportunities() {
        let mut builder = FunctionBuilder::new("calc");
        builder
            .binary(IlOpcode::Mul, IlValue::temp(0), IlValue::temp(1), IlValue::byte(8))
            .binary(IlOpcode::Add, IlValue::temp(2), IlValue::temp(0), IlValue::byte(1))
            .binary(IlOpcode::Add, IlValue::temp(3), IlValue::byte(2), IlValue::byte(3))
            .ret(Some(IlValue::temp(3)));
        let readiness = run(&builder.build(), true);

        let arithmetic = readiness.category(OptimizationCategory::Arithmetic).unwrap();
        assert_eq!(arithmetic.opportunities, 2);
        assert!(arithmetic.readiness_score > 0.0);
        assert!(arithmetic.estimated_benefit_percent > 0.0);

        let constant = readiness.category(OptimizationCategory::Constant).unwrap();
        assert_eq!(constant.opportunities, 1);

        assert!(readiness.impact.estimated_cycle_savings > 0);
    }

    #[test]
    fn test_store_zero_is_hardware_specific() {
        let mut builder = FunctionBuilder::new("clear");
        builder
            .store_variable(IlValue::local("x", IlType::Byte), IlValue::byte(0))
            .ret(None);
        let readiness = run(&builder.build(), true);
        let hardware = readiness
            .category(OptimizationCategory::HardwareSpecific)
            .unwrap();
        assert_eq!(hardware.opportunities, 1);
    }

    #[test]
    fn test_safety_is_the_mean() {
        let mut builder = FunctionBuilder::new("io");
        builder
            .poke(IlValue::memory(0xD020), IlValue::byte(0))
            .ret(None);
        let readiness = run(&builder.build(), false);
        let safety = &readiness.safety;

        assert_eq!(safety.semantic_safety, 95.0);
        assert_eq!(safety.platform_safety, 50.0);
        let mean =
            (safety.semantic_safety + safety.performance_safety + safety.platform_safety) / 3.0;
        assert!((safety.overall_safety - mean).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_is_lower_without_timing() {
        let mut builder = FunctionBuilder::new("calc");
        builder
            .binary(IlOpcode::Add, IlValue::temp(0), IlValue::temp(1), IlValue::byte(1))
            .ret(None);
        let function = builder.build();
        let with = run(&function, true);
        let without = run(&function, false);
        let a = with.category(OptimizationCategory::Arithmetic).unwrap();
        let b = without.category(OptimizationCategory::Arithmetic).unwrap();
        assert!(a.confidence > b.confidence);
    }
}
