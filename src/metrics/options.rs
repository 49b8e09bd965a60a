use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{Error, Result};

/// Raw values at which a complexity component reaches 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityThresholds {
    /// Executable instructions
    pub max_instructions: f64,
    /// Branches per instruction
    pub max_branch_density: f64,
    /// Calls per instruction
    pub max_call_density: f64,
    /// Memory-accessing instructions per instruction
    pub max_memory_density: f64,
    /// Basic blocks
    pub max_blocks: f64,
    /// CFG edges
    pub max_edges: f64,
    /// Loop nesting depth
    pub max_loop_depth: f64,
    /// Cyclomatic complexity
    pub max_cyclomatic: f64,
    /// Distinct variables
    pub max_variables: f64,
    /// Average uses per definition
    pub max_chain_length: f64,
    /// Simultaneously live variables
    pub max_live_variables: f64,
    /// Interference graph edges
    pub max_interference_edges: f64,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            max_instructions: 200.0,
            max_branch_density: 0.3,
            max_call_density: 0.2,
            max_memory_density: 0.6,
            max_blocks: 50.0,
            max_edges: 80.0,
            max_loop_depth: 4.0,
            max_cyclomatic: 20.0,
            max_variables: 40.0,
            max_chain_length: 8.0,
            max_live_variables: 8.0,
            max_interference_edges: 60.0,
        }
    }
}

/// Weights of the three complexity sub-scores in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityWeights {
    /// Instruction complexity
    pub instruction: f64,
    /// Control flow complexity
    pub control_flow: f64,
    /// Data flow complexity
    pub data_flow: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            instruction: 0.3,
            control_flow: 0.4,
            data_flow: 0.3,
        }
    }
}

impl ComplexityWeights {
    /// Sum of the weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.instruction + self.control_flow + self.data_flow
    }
}

/// How much a gate matters for the overall status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateImportance {
    /// A failure fails the report
    Mandatory,
    /// A warning or failure makes the report a warning
    Important,
    /// Informational
    Optional,
}

/// The metric a gate checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateMetric {
    /// Overall complexity score
    OverallComplexity,
    /// Instruction complexity sub-score
    InstructionComplexity,
    /// Control flow complexity sub-score
    ControlFlowComplexity,
    /// Data flow complexity sub-score
    DataFlowComplexity,
    /// McCabe complexity
    CyclomaticComplexity,
    /// Predicted performance score
    PerformanceScore,
    /// Peak memory region utilisation in percent
    MemoryUsage,
    /// Overall transformation safety
    SafetyScore,
    /// Overall optimisation readiness
    OptimizationReadiness,
    /// Predicted average cycles
    AverageCycles,
    /// Prediction confidence, 0-1
    Confidence,
}

/// Direction of a gate comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Comparison {
    /// Pass when `actual <= threshold`
    AtMost,
    /// Pass when `actual >= threshold`
    AtLeast,
}

/// A user defined gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// Gate name
    pub name: String,
    /// Checked metric
    pub metric: GateMetric,
    /// Direction
    pub comparison: Comparison,
    /// Threshold
    pub threshold: f64,
    /// Importance
    pub importance: GateImportance,
}

/// Thresholds of the built-in gates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    /// Mandatory: overall complexity at most
    pub max_complexity: f64,
    /// Important: performance score at least
    pub min_performance_score: f64,
    /// Mandatory: peak memory utilisation at most, in percent
    pub max_memory_usage: f64,
    /// Mandatory: transformation safety at least
    pub min_safety_score: f64,
    /// Optional: optimisation readiness at least
    pub min_optimization_readiness: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            max_complexity: 70.0,
            min_performance_score: 50.0,
            max_memory_usage: 90.0,
            min_safety_score: 60.0,
            min_optimization_readiness: 20.0,
        }
    }
}

/// Configuration of the [`crate::metrics::QualityAnalyzer`].
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct QualityOptions {
    /// Compute complexity metrics
    pub enable_complexity: bool,
    /// Compute the performance prediction
    pub enable_performance: bool,
    /// Compute optimisation readiness
    pub enable_readiness: bool,
    /// Evaluate quality gates
    pub enable_gates: bool,
    /// Complexity normalisation
    pub thresholds: ComplexityThresholds,
    /// Complexity sub-score weights
    pub weights: ComplexityWeights,
    /// Built-in gate thresholds
    pub gates: GateThresholds,
    /// Additional gates
    pub custom_gates: Vec<CustomGate>,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            enable_complexity: true,
            enable_performance: true,
            enable_readiness: true,
            enable_gates: true,
            thresholds: ComplexityThresholds::default(),
            weights: ComplexityWeights::default(),
            gates: GateThresholds::default(),
            custom_gates: Vec::new(),
        }
    }
}

impl QualityOptions {
    /// Complexity only.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_performance: false,
            enable_readiness: false,
            enable_gates: false,
            ..Self::default()
        }
    }

    /// Everything, with a cyclomatic complexity gate on top of the built-in ones.
    #[must_use]
    pub fn comprehensive() -> Self {
        Self {
            custom_gates: vec![CustomGate {
                name: "cyclomatic_complexity".to_string(),
                metric: GateMetric::CyclomaticComplexity,
                comparison: Comparison::AtMost,
                threshold: 15.0,
                importance: GateImportance::Important,
            }],
            ..Self::default()
        }
    }

    /// Checks weights and thresholds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] for negative or all-zero weights, non-positive
    /// complexity thresholds, or non-finite gate thresholds.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.weights.instruction,
            self.weights.control_flow,
            self.weights.data_flow,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || self.weights.total() <= 0.0 {
            return Err(Error::InvalidConfiguration(
                "complexity weights must be non-negative and not all zero".to_string(),
            ));
        }

        let t = &self.thresholds;
        let limits = [
            t.max_instructions,
            t.max_branch_density,
            t.max_call_density,
            t.max_memory_density,
            t.max_blocks,
            t.max_edges,
            t.max_loop_depth,
            t.max_cyclomatic,
            t.max_variables,
            t.max_chain_length,
            t.max_live_variables,
            t.max_interference_edges,
        ];
        if limits.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(Error::InvalidConfiguration(
                "complexity thresholds must be positive".to_string(),
            ));
        }

        let g = &self.gates;
        let gates = [
            g.max_complexity,
            g.min_performance_score,
            g.max_memory_usage,
            g.min_safety_score,
            g.min_optimization_readiness,
        ];
        if gates
            .iter()
            .copied()
            .chain(self.custom_gates.iter().map(|c| c.threshold))
            .any(|v| !v.is_finite())
        {
            return Err(Error::InvalidConfiguration(
                "gate thresholds must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(QualityOptions::default().validate().is_ok());
        assert!(QualityOptions::minimal().validate().is_ok());
        assert!(QualityOptions::comprehensive().validate().is_ok());
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let options = QualityOptions {
            weights: ComplexityWeights {
                instruction: -1.0,
                ..ComplexityWeights::default()
            },
            ..QualityOptions::default()
        };
        assert!(matches!(options.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let options = QualityOptions {
            thresholds: ComplexityThresholds {
                max_blocks: 0.0,
                ..ComplexityThresholds::default()
            },
            ..QualityOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
