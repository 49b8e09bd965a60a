//! Register pressure and spill risk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{
    analysis::{AnalysisIssue, IssueKind},
    il::{IlValue, PhysicalRegister},
    timing::context::FunctionContext,
};

/// Demand on one physical register.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegisterUsage {
    /// The register
    pub register: PhysicalRegister,
    /// Instructions naming the register as an operand or result
    pub operand_uses: usize,
    /// Instructions asking for their result in this register
    pub preferred_hints: usize,
    /// Share of instructions demanding the register, 0-100
    pub pressure: f64,
}

/// Result of the register sub-analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterAnalysis {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// Demand per register
    pub registers: BTreeMap<PhysicalRegister, RegisterUsage>,
    /// Registers available for variables
    pub allocatable_registers: usize,
    /// Peak simultaneously live variables, from the data flow analysis
    pub max_live_variables: usize,
    /// Edges of the interference graph
    pub interference_edges: usize,
    /// `max_live_variables / allocatable_registers` in percent, capped at 100
    pub overall_pressure: f64,
    /// More variables live at once than registers available
    pub spill_risk: bool,
}

impl RegisterAnalysis {
    /// Placeholder for a disabled sub-analysis.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }
}

pub(crate) fn analyze(ctx: &FunctionContext<'_>) -> (RegisterAnalysis, Vec<AnalysisIssue>) {
    let instructions = &ctx.function.instructions;
    let mut registers: BTreeMap<PhysicalRegister, RegisterUsage> = PhysicalRegister::iter()
        .map(|register| {
            (
                register,
                RegisterUsage {
                    register,
                    operand_uses: 0,
                    preferred_hints: 0,
                    pressure: 0.0,
                },
            )
        })
        .collect();

    for instruction in instructions {
        for value in instruction.operands.iter().chain(instruction.result.iter()) {
            if let IlValue::Register(register) = value {
                if let Some(usage) = registers.get_mut(register) {
                    usage.operand_uses += 1;
                }
            }
        }
        if let Some(register) = instruction.preferred_register() {
            if let Some(usage) = registers.get_mut(&register) {
                usage.preferred_hints += 1;
            }
        }
    }

    let executable = instructions.iter().filter(|i| !i.opcode.is_pseudo()).count();
    for usage in registers.values_mut() {
        usage.pressure = if executable == 0 {
            0.0
        } else {
            ((usage.operand_uses + usage.preferred_hints) as f64 * 100.0 / executable as f64)
                .min(100.0)
        };
    }

    let allocatable_registers = registers.len();
    let data_flow = &ctx.analysis.data_flow;
    let max_live_variables = data_flow.max_live_variables;
    let overall_pressure =
        (max_live_variables as f64 * 100.0 / allocatable_registers as f64).min(100.0);
    let spill_risk = max_live_variables > allocatable_registers;

    let mut issues = Vec::new();
    if spill_risk {
        issues.push(AnalysisIssue::warning(
            IssueKind::RegisterSpillRisk,
            format!(
                "{}: {} variables live at once, {} registers available",
                ctx.function.name, max_live_variables, allocatable_registers
            ),
        ));
    }

    (
        RegisterAnalysis {
            enabled: true,
            registers,
            allocatable_registers,
            max_live_variables,
            interference_edges: data_flow.interference.edge_count(),
            overall_pressure,
            spill_risk,
        },
        issues,
    )
}
