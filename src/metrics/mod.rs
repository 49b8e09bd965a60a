//! IL quality metrics.
//!
//! The [`QualityAnalyzer`] fuses an [`crate::il::IlFunction`], its
//! [`crate::analysis::ControlFlowAnalysisResult`] and, optionally, its
//! [`crate::timing::TimingValidationResult`] into a [`QualityReport`] with four sections:
//!
//! - [`ComplexityMetrics`]: cyclomatic complexity and weighted instruction, control flow
//!   and data flow sub-scores, higher is more complex
//! - [`PerformancePrediction`]: best, average and worst case cycles with a confidence
//!   figure, and a performance score where higher is better
//! - [`OptimizationReadiness`]: readiness per [`OptimizationCategory`], transformation
//!   safety and impact potential
//! - [`GateResults`]: pass, warning or fail per [`QualityGate`] and the aggregated status
//!
//! Every 0-100 score is clamped to that range. Disabled sections are present as their
//! `disabled()` placeholders.

mod analyzer;
mod complexity;
mod gates;
mod options;
mod performance;
mod readiness;
mod report;

pub use analyzer::QualityAnalyzer;
pub use complexity::ComplexityMetrics;
pub use gates::{gate_status, overall_status, GateResults, GateStatus, QualityGate, WARNING_MARGIN};
pub use options::{
    Comparison, ComplexityThresholds, ComplexityWeights, CustomGate, GateImportance, GateMetric,
    GateThresholds, QualityOptions,
};
pub use performance::{
    Assumption, MemoryEstimate, PerformancePrediction, ESTIMATED_CYCLES_PER_INSTRUCTION,
};
pub use readiness::{
    CategoryReadiness, ImpactPotential, OptimizationCategory, OptimizationReadiness,
    TransformationSafety,
};
pub use report::{QualityReport, QualitySummary};

/// Clamps a score to `0.0..=100.0`; NaN becomes 0.
pub(crate) fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}
