//! Stack depth and cycle budget checks.

use serde::{Deserialize, Serialize};

use crate::{
    analysis::{AnalysisIssue, IssueKind},
    il::{IlOpcode, StorageClass},
    timing::{context::FunctionContext, cycles::critical_path},
};

/// Bytes pushed by `JSR`, and by the return into the caller.
const RETURN_ADDRESS_BYTES: u32 = 2;
/// Stack utilisation above which a warning is raised, in percent.
const STACK_PRESSURE_PERCENT: f64 = 75.0;

/// Result of the hardware constraint sub-analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintAnalysis {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// `Call` instructions in the function
    pub call_count: usize,
    /// Bytes of stack-allocated locals
    pub stack_locals_bytes: u32,
    /// `2 × calls + stack locals + return address`
    pub estimated_stack_bytes: u32,
    /// Hardware stack size
    pub stack_limit_bytes: u32,
    /// `estimated / limit` in percent
    pub stack_utilization: f64,
    /// Longest acyclic path, loop iterations not multiplied
    pub worst_case_cycles: u64,
    /// The function is an interrupt handler
    pub is_interrupt_handler: bool,
    /// Interrupt handler budget
    pub interrupt_budget_cycles: u32,
    /// Optional per-function budget
    pub frame_budget_cycles: Option<u32>,
    /// Number of violated constraints
    pub violations: usize,
}

impl ConstraintAnalysis {
    /// Placeholder for a disabled sub-analysis.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }
}

pub(crate) fn analyze(
    ctx: &FunctionContext<'_>,
    interrupt_budget_cycles: u32,
    frame_budget_cycles: Option<u32>,
) -> (ConstraintAnalysis, Vec<AnalysisIssue>) {
    let function = ctx.function;
    let call_count = function
        .instructions
        .iter()
        .filter(|i| i.opcode == IlOpcode::Call)
        .count();
    let stack_locals_bytes: u32 = function
        .locals
        .iter()
        .filter(|l| l.allocation == StorageClass::Stack)
        .map(|l| l.ty.size_bytes())
        .sum();
    let calls = u32::try_from(call_count).unwrap_or(u32::MAX);
    let estimated_stack_bytes = calls
        .saturating_mul(2)
        .saturating_add(stack_locals_bytes)
        .saturating_add(RETURN_ADDRESS_BYTES);
    let stack_limit_bytes = ctx.analyzer.memory_map().stack_bytes;
    let stack_utilization = if stack_limit_bytes == 0 {
        100.0
    } else {
        f64::from(estimated_stack_bytes) * 100.0 / f64::from(stack_limit_bytes)
    };

    let mut issues = Vec::new();
    if estimated_stack_bytes > stack_limit_bytes {
        issues.push(AnalysisIssue::error(
            IssueKind::StackOverflow,
            format!(
                "{}: estimated stack depth {} bytes exceeds {} bytes",
                function.name, estimated_stack_bytes, stack_limit_bytes
            ),
        ));
    } else if stack_utilization > STACK_PRESSURE_PERCENT {
        issues.push(AnalysisIssue::warning(
            IssueKind::StackPressure,
            format!(
                "{}: estimated stack depth uses {:.1}% of the stack",
                function.name, stack_utilization
            ),
        ));
    }

    let worst_case_cycles = critical_path(ctx);
    if function.is_interrupt_handler && worst_case_cycles > u64::from(interrupt_budget_cycles) {
        issues.push(AnalysisIssue::error(
            IssueKind::InterruptBudgetExceeded,
            format!(
                "interrupt handler {} needs {} cycles, budget is {}",
                function.name, worst_case_cycles, interrupt_budget_cycles
            ),
        ));
    }
    if let Some(budget) = frame_budget_cycles {
        if worst_case_cycles > u64::from(budget) {
            issues.push(AnalysisIssue::warning(
                IssueKind::FrameBudgetExceeded,
                format!(
                    "{} needs {} cycles, frame budget is {}",
                    function.name, worst_case_cycles, budget
                ),
            ));
        }
    }

    (
        ConstraintAnalysis {
            enabled: true,
            call_count,
            stack_locals_bytes,
            estimated_stack_bytes,
            stack_limit_bytes,
            stack_utilization,
            worst_case_cycles,
            is_interrupt_handler: function.is_interrupt_handler,
            interrupt_budget_cycles,
            frame_budget_cycles,
            violations: issues.len(),
        },
        issues,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{ControlFlowAnalyzer, Severity},
        il::{FunctionBuilder, IlType},
        timing::Mos6510Analyzer,
    };

    fn run(
        builder: &FunctionBuilder,
        frame: Option<u32>,
    ) -> (ConstraintAnalysis, Vec<AnalysisIssue>) {
        let function = builder.build();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&function).unwrap();
        let ctx = FunctionContext::new(&function, &cfa, &Mos6510Analyzer).unwrap();
        analyze(&ctx, 100, frame)
    }

    #[test]
    fn test_stack_estimate() {
        let mut builder = FunctionBuilder::new("caller");
        builder
            .local("buf", IlType::array(IlType::Byte, 8), StorageClass::Stack)
            .call("a", vec![], None)
            .call("b", vec![], None)
            .ret(None);
        let (analysis, issues) = run(&builder, None);

        assert_eq!(analysis.call_count, 2);
        assert_eq!(analysis.estimated_stack_bytes, 2 * 2 + 8 + 2);
        assert_eq!(analysis.stack_limit_bytes, 256);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_stack_overflow_and_pressure() {
        let mut big = FunctionBuilder::new("big");
        big.local("frame", IlType::array(IlType::Byte, 255), StorageClass::Stack).ret(None);
        let (_, issues) = run(&big, None);
        assert_eq!(issues[0].kind, IssueKind::StackOverflow);
        assert_eq!(issues[0].severity, Severity::Error);

        let mut tight = FunctionBuilder::new("tight");
        tight
            .local("frame", IlType::array(IlType::Byte, 200), StorageClass::Stack)
            .ret(None);
        let (_, issues) = run(&tight, None);
        assert_eq!(issues[0].kind, IssueKind::StackPressure);
    }

    #[test]
    fn test_cycle_budgets() {
        let mut builder = FunctionBuilder::new("irq");
        builder.interrupt_handler(true);
        for _ in 0..10 {
            builder.call("update", vec![], None);
        }
        builder.ret(None);
        let (analysis, issues) = run(&builder, Some(20));

        // ten calls and a return
        assert_eq!(analysis.worst_case_cycles, 10 * 12 + 6);
        let kinds: Vec<IssueKind> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::InterruptBudgetExceeded, IssueKind::FrameBudgetExceeded]
        );
        assert_eq!(analysis.violations, 2);

        let (_, issues) = run(&builder, None);
        assert_eq!(issues.len(), 1);
    }
}
