//! Best, average and worst case cycle prediction.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    analysis::ControlFlowAnalysisResult,
    il::{IlFunction, IlOpcode},
    metrics::clamp_score,
    timing::TimingValidationResult,
};

/// Average cost of one instruction when no timing result is available.
pub const ESTIMATED_CYCLES_PER_INSTRUCTION: f64 = 4.0;

const BEST_CASE_FACTOR: f64 = 0.8;
const WORST_CASE_FACTOR: f64 = 1.3;
const BASE_CONFIDENCE: f64 = 0.9;
const CONFIDENCE_PER_ASSUMPTION: f64 = 0.1;
const MIN_CONFIDENCE: f64 = 0.1;

/// Something the prediction had to assume; each one lowers the confidence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Assumption {
    /// Cycles were estimated per instruction
    NoTimingData,
    /// Loops run an unknown number of times
    UnknownTripCounts,
    /// Callee cost is not included
    CallsNotModelled,
    /// Conditional branches are taken with unknown probability
    BranchProbabilities,
}

/// Memory usage per region, copied from the timing result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryEstimate {
    /// Zero page bytes
    pub zero_page_bytes: u32,
    /// Stack bytes
    pub stack_bytes: u32,
    /// RAM bytes
    pub ram_bytes: u32,
    /// Highest region utilisation in percent
    pub peak_utilization: f64,
}

/// Predicted performance of one function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformancePrediction {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// `average × 0.8`
    pub best_case_cycles: f64,
    /// Timing total, or the per-instruction estimate
    pub average_cycles: f64,
    /// `average × 1.3`
    pub worst_case_cycles: f64,
    /// 0.1-0.9
    pub confidence: f64,
    /// Assumptions behind the figures
    pub assumptions: Vec<Assumption>,
    /// Memory usage
    pub memory: MemoryEstimate,
    /// Register pressure, 0-100
    pub register_pressure: f64,
    /// More values live than registers available
    pub spill_risk: bool,
    /// Average cycles per executable instruction
    pub cycles_per_instruction: f64,
    /// 0-100, higher is better
    pub performance_score: f64,
}

impl PerformancePrediction {
    /// Placeholder for a disabled sub-analysis.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }
}

pub(crate) fn predict(
    function: &IlFunction,
    analysis: &ControlFlowAnalysisResult,
    timing: Option<&TimingValidationResult>,
) -> PerformancePrediction {
    let executable = function
        .instructions
        .iter()
        .filter(|i| !i.opcode.is_pseudo())
        .count();
    let cycle_timing = timing.filter(|t| t.cycle_timing.enabled);

    let mut assumptions = Vec::new();
    let average_cycles = match cycle_timing {
        Some(timing) => timing.total_cycles() as f64,
        None => {
            assumptions.push(Assumption::NoTimingData);
            executable as f64 * ESTIMATED_CYCLES_PER_INSTRUCTION
        }
    };
    if !analysis.loops.is_empty() {
        assumptions.push(Assumption::UnknownTripCounts);
    }
    if function.instructions.iter().any(|i| i.opcode == IlOpcode::Call) {
        assumptions.push(Assumption::CallsNotModelled);
    }
    if function
        .instructions
        .iter()
        .any(|i| i.opcode.is_conditional_branch())
    {
        assumptions.push(Assumption::BranchProbabilities);
    }
    let confidence = (BASE_CONFIDENCE - CONFIDENCE_PER_ASSUMPTION * assumptions.len() as f64)
        .max(MIN_CONFIDENCE);

    let memory = match timing.filter(|t| t.memory_layout.enabled) {
        Some(timing) => {
            let layout = &timing.memory_layout;
            MemoryEstimate {
                zero_page_bytes: layout.zero_page.used_bytes,
                stack_bytes: layout.stack.used_bytes,
                ram_bytes: layout.ram.used_bytes,
                peak_utilization: layout.peak_utilization(),
            }
        }
        None => MemoryEstimate::default(),
    };

    let (register_pressure, spill_risk) = match timing.filter(|t| t.registers.enabled) {
        Some(timing) => (timing.registers.overall_pressure, timing.registers.spill_risk),
        None => (0.0, false),
    };

    let cycles_per_instruction = if executable == 0 {
        0.0
    } else {
        average_cycles / executable as f64
    };

    let headroom = timing
        .filter(|t| t.hotspots.enabled)
        .map_or(0.0, TimingValidationResult::performance_score);

    let mut score = 100.0 - headroom * 0.4;
    if spill_risk {
        score -= 15.0;
    }
    score -= (memory.peak_utilization - 50.0).max(0.0) * 0.5;
    score -= (cycles_per_instruction - 8.0).max(0.0) * 2.0;

    PerformancePrediction {
        enabled: true,
        best_case_cycles: average_cycles * BEST_CASE_FACTOR,
        average_cycles,
        worst_case_cycles: average_cycles * WORST_CASE_FACTOR,
        confidence,
        assumptions,
        memory,
        register_pressure,
        spill_risk,
        cycles_per_instruction,
        performance_score: clamp_score(score),
    }
}
