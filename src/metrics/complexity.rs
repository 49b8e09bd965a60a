//! Complexity metrics.
//!
//! Every component is normalised to 0-100 as `100 × value / threshold`, capped at 100.
//! The three sub-scores are weighted averages of their components, and the overall
//! score is the [`ComplexityWeights`] average of the sub-scores.

use serde::{Deserialize, Serialize};

use crate::{
    analysis::ControlFlowAnalysisResult,
    il::{IlFunction, IlOpcode},
    metrics::{clamp_score, ComplexityThresholds, ComplexityWeights},
};

/// Complexity of one function. Scores are 0-100, higher is more complex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// Instructions, including labels and comments
    pub total_instructions: usize,
    /// McCabe complexity, `1..=999`
    pub cyclomatic_complexity: usize,
    /// Branches per executable instruction
    pub branch_density: f64,
    /// Calls per executable instruction
    pub call_density: f64,
    /// Memory-accessing instructions per executable instruction
    pub memory_density: f64,
    /// Instruction sub-score
    pub instruction_complexity: f64,
    /// Control flow sub-score
    pub control_flow_complexity: f64,
    /// Data flow sub-score
    pub data_flow_complexity: f64,
    /// Weighted average of the sub-scores
    pub overall_complexity_score: f64,
}

impl ComplexityMetrics {
    /// Placeholder for a disabled sub-analysis: every figure is 0.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }
}

fn component(value: f64, threshold: f64) -> f64 {
    clamp_score(value * 100.0 / threshold)
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

pub(crate) fn analyze(
    function: &IlFunction,
    analysis: &ControlFlowAnalysisResult,
    thresholds: &ComplexityThresholds,
    weights: &ComplexityWeights,
) -> ComplexityMetrics {
    let executable: Vec<_> = function
        .instructions
        .iter()
        .filter(|i| !i.opcode.is_pseudo())
        .collect();
    let count = executable.len();

    let branch_density = ratio(executable.iter().filter(|i| i.opcode.is_branch()).count(), count);
    let call_density = ratio(
        executable.iter().filter(|i| i.opcode == IlOpcode::Call).count(),
        count,
    );
    let memory_density = ratio(
        executable
            .iter()
            .filter(|i| i.opcode.is_memory_access() || i.memory_operand_count() > 0)
            .count(),
        count,
    );

    let instruction_complexity = 0.4 * component(count as f64, thresholds.max_instructions)
        + 0.2 * component(branch_density, thresholds.max_branch_density)
        + 0.2 * component(call_density, thresholds.max_call_density)
        + 0.2 * component(memory_density, thresholds.max_memory_density);

    let metrics = &analysis.metrics;
    let cyclomatic_complexity = analysis.cfg.cyclomatic_complexity();
    let control_flow_complexity = 0.2 * component(metrics.block_count as f64, thresholds.max_blocks)
        + 0.2 * component(metrics.edge_count as f64, thresholds.max_edges)
        + 0.3 * component(metrics.max_loop_depth as f64, thresholds.max_loop_depth)
        + 0.3 * component(cyclomatic_complexity as f64, thresholds.max_cyclomatic);

    let data_flow = &analysis.data_flow;
    let data_flow_complexity = 0.25
        * component(data_flow.variables.len() as f64, thresholds.max_variables)
        + 0.25 * component(data_flow.average_chain_length(), thresholds.max_chain_length)
        + 0.25 * component(data_flow.max_live_variables as f64, thresholds.max_live_variables)
        + 0.25
            * component(
                data_flow.interference.edge_count() as f64,
                thresholds.max_interference_edges,
            );

    let overall_complexity_score = clamp_score(
        (weights.instruction * instruction_complexity
            + weights.control_flow * control_flow_complexity
            + weights.data_flow * data_flow_complexity)
            / weights.total(),
    );

    ComplexityMetrics {
        enabled: true,
        total_instructions: function.instructions.len(),
        cyclomatic_complexity,
        branch_density,
        call_density,
        memory_density,
        instruction_complexity: clamp_score(instruction_complexity),
        control_flow_complexity: clamp_score(control_flow_complexity),
        data_flow_complexity: clamp_score(data_flow_complexity),
        overall_complexity_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::ControlFlowAnalyzer,
        il::{FunctionBuilder, IlType, IlValue},
    };

    fn measure(function: &IlFunction) -> ComplexityMetrics {
        let cfa = ControlFlowAnalyzer::default().analyze_function(function).unwrap();
        analyze(
            function,
            &cfa,
            &ComplexityThresholds::default(),
            &ComplexityWeights::default(),
        )
    }

    #[test]
    fn test_straight_line() {
        let mut builder = FunctionBuilder::new("line");
        builder
            .load_immediate(IlValue::temp(0), IlValue::byte(42))
            .binary(IlOpcode::Add, IlValue::temp(1), IlValue::temp(0), IlValue::byte(1))
            .store_variable(IlValue::local("x", IlType::Byte), IlValue::temp(1))
            .ret(None);
        let metrics = measure(&builder.build());

        assert_eq!(metrics.total_instructions, 4);
        assert_eq!(metrics.cyclomatic_complexity, 1);
        assert_eq!(metrics.branch_density, 0.0);
        assert_eq!(metrics.memory_density, 0.25);
        assert!(metrics.overall_complexity_score > 0.0);
        assert!(metrics.overall_complexity_score < 20.0);
    }

    #[test]
    fn test_branchy_code_scores_higher() {
        let mut flat = FunctionBuilder::new("flat");
        flat.nop().nop().nop().ret(None);

        let mut branchy = FunctionBuilder::new("branchy");
        branchy
            .branch_if_true(IlValue::temp(0), "a")
            .branch_if_true(IlValue::temp(1), "b")
            .label("a")
            .nop()
            .label("b")
            .ret(None);

        let flat = measure(&flat.build());
        let branchy = measure(&branchy.build());
        assert!(branchy.control_flow_complexity > flat.control_flow_complexity);
        assert!(branchy.instruction_complexity > flat.instruction_complexity);
        assert!(branchy.cyclomatic_complexity >= 2);
    }

    #[test]
    fn test_empty_function() {
        let metrics = measure(&IlFunction::new("empty"));
        assert_eq!(metrics.total_instructions, 0);
        assert_eq!(metrics.cyclomatic_complexity, 1);
        assert!(metrics.enabled);
    }
}
