use serde::{Deserialize, Serialize};

use crate::metrics::{
    ComplexityMetrics, GateResults, GateStatus, OptimizationReadiness, PerformancePrediction,
};

/// Human readable findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    /// Problems that make the report unusable or fail a mandatory gate
    pub critical_issues: Vec<String>,
    /// Problems worth a look
    pub warnings: Vec<String>,
    /// What the function does well
    pub strengths: Vec<String>,
    /// Top timing recommendations
    pub recommendations: Vec<String>,
}

/// Quality report of one function.
///
/// Every section is always present. Disabled sections hold their `disabled()` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Analysed function
    pub function_name: String,
    /// Complexity metrics
    pub complexity: ComplexityMetrics,
    /// Performance prediction
    pub performance: PerformancePrediction,
    /// Optimisation readiness
    pub readiness: OptimizationReadiness,
    /// Quality gates
    pub gates: GateResults,
    /// 0-100, higher is better; 0 for malformed input
    pub overall_quality_score: f64,
    /// Findings
    pub summary: QualitySummary,
}

impl QualityReport {
    /// Report for input that could not be analysed.
    pub(crate) fn malformed(function_name: &str, critical_issues: Vec<String>) -> Self {
        QualityReport {
            function_name: function_name.to_string(),
            complexity: ComplexityMetrics::disabled(),
            performance: PerformancePrediction::disabled(),
            readiness: OptimizationReadiness::disabled(),
            gates: GateResults::disabled(),
            overall_quality_score: 0.0,
            summary: QualitySummary {
                critical_issues,
                ..QualitySummary::default()
            },
        }
    }

    /// Returns `true` if the summary lists a critical issue.
    #[must_use]
    pub fn has_critical_issues(&self) -> bool {
        !self.summary.critical_issues.is_empty()
    }

    /// Returns `true` if there are no critical issues and the gates did not fail.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        !self.has_critical_issues() && self.gates.overall_status != GateStatus::Fail
    }
}
