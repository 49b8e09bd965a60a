//! Quality gates.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::metrics::{
    ComplexityMetrics, Comparison, CustomGate, GateImportance, GateMetric, GateThresholds,
    OptimizationReadiness, PerformancePrediction,
};
use crate::timing::TimingValidationResult;

/// Relative distance from the threshold within which a miss is a warning.
pub const WARNING_MARGIN: f64 = 0.1;

/// Outcome of one gate, or of a whole gate set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateStatus {
    /// Threshold satisfied
    Pass,
    /// Missed by less than [`WARNING_MARGIN`]
    Warning,
    /// Missed
    Fail,
    /// The metric was not computed
    NotApplicable,
}

/// One evaluated gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    /// Gate name
    pub name: String,
    /// Checked metric
    pub metric: GateMetric,
    /// Direction
    pub comparison: Comparison,
    /// Threshold
    pub threshold: f64,
    /// Measured value, `None` when unavailable
    pub actual: Option<f64>,
    /// Importance
    pub importance: GateImportance,
    /// Outcome
    pub status: GateStatus,
}

impl QualityGate {
    /// Builds and evaluates a gate.
    #[must_use]
    pub fn evaluate(
        name: impl Into<String>,
        metric: GateMetric,
        comparison: Comparison,
        threshold: f64,
        actual: Option<f64>,
        importance: GateImportance,
    ) -> Self {
        QualityGate {
            name: name.into(),
            metric,
            comparison,
            threshold,
            actual,
            importance,
            status: gate_status(comparison, threshold, actual),
        }
    }
}

/// Evaluates `actual` against `threshold`.
///
/// ```rust
/// use ilscope::metrics::{gate_status, Comparison, GateStatus};
///
/// assert_eq!(gate_status(Comparison::AtMost, 70.0, Some(70.0)), GateStatus::Pass);
/// assert_eq!(gate_status(Comparison::AtMost, 70.0, Some(75.0)), GateStatus::Warning);
/// assert_eq!(gate_status(Comparison::AtMost, 70.0, Some(80.0)), GateStatus::Fail);
/// assert_eq!(gate_status(Comparison::AtLeast, 50.0, None), GateStatus::NotApplicable);
/// ```
#[must_use]
pub fn gate_status(comparison: Comparison, threshold: f64, actual: Option<f64>) -> GateStatus {
    let Some(actual) = actual else {
        return GateStatus::NotApplicable;
    };
    let margin = threshold.abs() * WARNING_MARGIN;
    match comparison {
        Comparison::AtMost if actual <= threshold => GateStatus::Pass,
        Comparison::AtMost if actual <= threshold + margin => GateStatus::Warning,
        Comparison::AtLeast if actual >= threshold => GateStatus::Pass,
        Comparison::AtLeast if actual >= threshold - margin => GateStatus::Warning,
        _ => GateStatus::Fail,
    }
}

/// Aggregates a gate set.
///
/// Fails if any mandatory gate fails, warns if any important gate warns or fails,
/// passes otherwise. Optional gates never change the outcome.
#[must_use]
pub fn overall_status(gates: &[QualityGate]) -> GateStatus {
    let mandatory_failed = gates
        .iter()
        .any(|g| g.importance == GateImportance::Mandatory && g.status == GateStatus::Fail);
    if mandatory_failed {
        return GateStatus::Fail;
    }
    let important_missed = gates.iter().any(|g| {
        g.importance == GateImportance::Important
            && matches!(g.status, GateStatus::Warning | GateStatus::Fail)
    });
    if important_missed {
        GateStatus::Warning
    } else {
        GateStatus::Pass
    }
}

/// Evaluated gates of one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResults {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// Built-in gates followed by custom gates
    pub gates: Vec<QualityGate>,
    /// Aggregated status
    pub overall_status: GateStatus,
    /// Share of applicable gates passed, warnings counting half, 0-100
    pub gate_quality_score: f64,
}

impl Default for GateResults {
    fn default() -> Self {
        GateResults {
            enabled: false,
            gates: Vec::new(),
            overall_status: GateStatus::Pass,
            gate_quality_score: 100.0,
        }
    }
}

impl GateResults {
    /// Placeholder for disabled gates: no gates, score 100, pass.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Aggregates `gates`.
    #[must_use]
    pub fn from_gates(gates: Vec<QualityGate>) -> Self {
        let applicable: Vec<_> = gates
            .iter()
            .filter(|g| g.status != GateStatus::NotApplicable)
            .collect();
        let gate_quality_score = if applicable.is_empty() {
            100.0
        } else {
            let points: f64 = applicable
                .iter()
                .map(|g| match g.status {
                    GateStatus::Pass => 1.0,
                    GateStatus::Warning => 0.5,
                    GateStatus::Fail | GateStatus::NotApplicable => 0.0,
                })
                .sum();
            points * 100.0 / applicable.len() as f64
        };
        GateResults {
            enabled: true,
            overall_status: overall_status(&gates),
            gates,
            gate_quality_score,
        }
    }

    /// Gates with the given status.
    pub fn with_status(&self, status: GateStatus) -> impl Iterator<Item = &QualityGate> {
        self.gates.iter().filter(move |g| g.status == status)
    }
}

/// Values gates are evaluated against. Disabled sections yield `None`.
pub(crate) struct GateInputs<'a> {
    pub complexity: Option<&'a ComplexityMetrics>,
    pub performance: Option<&'a PerformancePrediction>,
    pub readiness: Option<&'a OptimizationReadiness>,
    pub timing: Option<&'a TimingValidationResult>,
}

impl GateInputs<'_> {
    fn value(&self, metric: GateMetric) -> Option<f64> {
        match metric {
            GateMetric::OverallComplexity => self.complexity.map(|c| c.overall_complexity_score),
            GateMetric::InstructionComplexity => self.complexity.map(|c| c.instruction_complexity),
            GateMetric::ControlFlowComplexity => {
                self.complexity.map(|c| c.control_flow_complexity)
            }
            GateMetric::DataFlowComplexity => self.complexity.map(|c| c.data_flow_complexity),
            GateMetric::CyclomaticComplexity => {
                self.complexity.map(|c| c.cyclomatic_complexity as f64)
            }
            GateMetric::PerformanceScore => self.performance.map(|p| p.performance_score),
            GateMetric::AverageCycles => self.performance.map(|p| p.average_cycles),
            GateMetric::Confidence => self.performance.map(|p| p.confidence),
            GateMetric::MemoryUsage => self
                .timing
                .filter(|t| t.memory_layout.enabled)
                .map(|t| t.memory_layout.peak_utilization()),
            GateMetric::SafetyScore => self.readiness.map(|r| r.safety.overall_safety),
            GateMetric::OptimizationReadiness => self.readiness.map(|r| r.overall_readiness),
        }
    }
}

pub(crate) fn evaluate(
    inputs: &GateInputs<'_>,
    thresholds: &GateThresholds,
    custom: &[CustomGate],
) -> GateResults {
    let builtin = [
        (
            "max_complexity",
            GateMetric::OverallComplexity,
            Comparison::AtMost,
            thresholds.max_complexity,
            GateImportance::Mandatory,
        ),
        (
            "min_performance_score",
            GateMetric::PerformanceScore,
            Comparison::AtLeast,
            thresholds.min_performance_score,
            GateImportance::Important,
        ),
        (
            "max_memory_usage",
            GateMetric::MemoryUsage,
            Comparison::AtMost,
            thresholds.max_memory_usage,
            GateImportance::Mandatory,
        ),
        (
            "min_safety_score",
            GateMetric::SafetyScore,
            Comparison::AtLeast,
            thresholds.min_safety_score,
            GateImportance::Mandatory,
        ),
        (
            "min_optimization_readiness",
            GateMetric::OptimizationReadiness,
            Comparison::AtLeast,
            thresholds.min_optimization_readiness,
            GateImportance::Optional,
        ),
    ];

    let gates = builtin
        .into_iter()
        .map(|(name, metric, comparison, threshold, importance)| {
            QualityGate::evaluate(
                name,
                metric,
                comparison,
                threshold,
                inputs.value(metric),
                importance,
            )
        })
        .chain(custom.iter().map(|gate| {
            QualityGate::evaluate(
                gate.name.clone(),
                gate.metric,
                gate.comparison,
                gate.threshold,
                inputs.value(gate.metric),
                gate.importance,
            )
        }))
        .collect();

    GateResults::from_gates(gates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(importance: GateImportance, status: GateStatus) -> QualityGate {
        QualityGate {
            name: "g".to_string(),
            metric: GateMetric::OverallComplexity,
            comparison: Comparison::AtMost,
            threshold: 1.0,
            actual: None,
            importance,
            status,
        }
    }

    #[test]
    fn test_status_margins() {
        assert_eq!(gate_status(Comparison::AtLeast, 50.0, Some(50.0)), GateStatus::Pass);
        assert_eq!(gate_status(Comparison::AtLeast, 50.0, Some(46.0)), GateStatus::Warning);
        assert_eq!(gate_status(Comparison::AtLeast, 50.0, Some(44.0)), GateStatus::Fail);
        assert_eq!(gate_status(Comparison::AtMost, 70.0, Some(76.0)), GateStatus::Warning);
        assert_eq!(gate_status(Comparison::AtMost, 70.0, Some(78.0)), GateStatus::Fail);
    }

    #[test]
    fn test_aggregation() {
        use GateImportance::{Important, Mandatory, Optional};
        use GateStatus::{Fail, NotApplicable, Pass, Warning};

        assert_eq!(overall_status(&[]), Pass);
        assert_eq!(overall_status(&[gate(Mandatory, Fail), gate(Important, Pass)]), Fail);
        assert_eq!(overall_status(&[gate(Mandatory, Warning)]), Pass);
        assert_eq!(overall_status(&[gate(Important, Warning)]), Warning);
        assert_eq!(overall_status(&[gate(Important, Fail)]), Warning);
        assert_eq!(overall_status(&[gate(Optional, Fail)]), Pass);
        assert_eq!(overall_status(&[gate(Mandatory, NotApplicable)]), Pass);
        assert_eq!(
            overall_status(&[gate(Important, Warning), gate(Mandatory, Fail)]),
            Fail
        );
    }

    #[test]
    fn test_quality_score() {
        let results = GateResults::from_gates(vec![
            gate(GateImportance::Mandatory, GateStatus::Pass),
            gate(GateImportance::Important, GateStatus::Warning),
            gate(GateImportance::Optional, GateStatus::NotApplicable),
        ]);
        assert_eq!(results.gate_quality_score, 75.0);
        assert_eq!(results.overall_status, GateStatus::Warning);
        assert_eq!(results.with_status(GateStatus::Pass).count(), 1);
    }

    #[test]
    fn test_unavailable_metrics_are_not_applicable() {
        let inputs = GateInputs {
            complexity: None,
            performance: None,
            readiness: None,
            timing: None,
        };
        let results = evaluate(&inputs, &GateThresholds::default(), &[]);
        assert_eq!(results.gates.len(), 5);
        assert!(results
            .gates
            .iter()
            .all(|g| g.status == GateStatus::NotApplicable));
        assert_eq!(results.overall_status, GateStatus::Pass);
        assert_eq!(results.gate_quality_score, 100.0);
    }

    #[test]
    fn test_disabled_placeholder() {
        let disabled = GateResults::disabled();
        assert!(disabled.gates.is_empty());
        assert_eq!(disabled.gate_quality_score, 100.0);
        assert_eq!(disabled.overall_status, GateStatus::Pass);
    }
}
