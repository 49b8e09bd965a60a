//! Memory layout validation against the variant's memory map.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    analysis::{AnalysisIssue, IssueKind},
    il::{IlValue, StorageClass, StorageHint, VariableScope},
    timing::context::FunctionContext,
};

/// Utilisation above which a region is reported as under pressure, in percent.
const PRESSURE_PERCENT: f64 = 80.0;

/// A memory region of the target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemoryRegion {
    /// `$00-$FF`
    ZeroPage,
    /// `$0100-$01FF`
    Stack,
    /// General RAM
    Ram,
}

/// Usage of one region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionUsage {
    /// The region
    pub region: MemoryRegion,
    /// Bytes the function needs
    pub used_bytes: u32,
    /// Bytes available
    pub capacity_bytes: u32,
    /// `used / capacity` in percent, 0 when the capacity is 0
    pub utilization: f64,
    /// `false` on overflow
    pub is_valid: bool,
}

impl RegionUsage {
    fn new(region: MemoryRegion, used_bytes: u32, capacity_bytes: u32) -> Self {
        let utilization = if capacity_bytes == 0 {
            0.0
        } else {
            f64::from(used_bytes) * 100.0 / f64::from(capacity_bytes)
        };
        RegionUsage {
            region,
            used_bytes,
            capacity_bytes,
            utilization,
            is_valid: used_bytes <= capacity_bytes,
        }
    }
}

/// Result of the memory layout sub-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryLayoutAnalysis {
    /// `false` for the disabled placeholder
    pub enabled: bool,
    /// Zero-page usage
    pub zero_page: RegionUsage,
    /// Hardware stack usage by stack-allocated data
    pub stack: RegionUsage,
    /// General RAM usage
    pub ram: RegionUsage,
    /// Locals kept in registers
    pub register_locals: usize,
    /// Instructions hinting an addressing mode the variant lacks
    pub unsupported_modes: usize,
}

impl MemoryLayoutAnalysis {
    /// Placeholder for a disabled sub-analysis: empty regions that are trivially valid.
    #[must_use]
    pub fn disabled() -> Self {
        MemoryLayoutAnalysis {
            enabled: false,
            zero_page: RegionUsage::new(MemoryRegion::ZeroPage, 0, 0),
            stack: RegionUsage::new(MemoryRegion::Stack, 0, 0),
            ram: RegionUsage::new(MemoryRegion::Ram, 0, 0),
            register_locals: 0,
            unsupported_modes: 0,
        }
    }

    /// The three regions, zero page first.
    #[must_use]
    pub fn regions(&self) -> [&RegionUsage; 3] {
        [&self.zero_page, &self.stack, &self.ram]
    }

    /// Returns `true` if no region overflows and every addressing mode is supported.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.regions().iter().all(|r| r.is_valid) && self.unsupported_modes == 0
    }

    /// Highest utilisation over all regions, in percent.
    #[must_use]
    pub fn peak_utilization(&self) -> f64 {
        self.regions()
            .iter()
            .map(|r| r.utilization)
            .fold(0.0, f64::max)
    }
}

pub(crate) fn analyze(ctx: &FunctionContext<'_>) -> (MemoryLayoutAnalysis, Vec<AnalysisIssue>) {
    let function = ctx.function;
    let map = ctx.analyzer.memory_map();

    let mut zero_page = 0u32;
    let mut stack = 0u32;
    let mut ram = 0u32;
    let mut register_locals = 0;
    let mut declared: BTreeSet<&str> = BTreeSet::new();

    for local in &function.locals {
        declared.insert(local.name.as_str());
        let size = local.ty.size_bytes();
        match local.allocation {
            StorageClass::Register => register_locals += 1,
            StorageClass::ZeroPage => zero_page += size,
            StorageClass::Stack => stack += size,
            StorageClass::Ram => ram += size,
        }
    }
    for parameter in &function.parameters {
        declared.insert(parameter.name.as_str());
        stack += parameter.ty.size_bytes();
    }

    // Undeclared locals placed by their storage hint
    let mut hinted: BTreeSet<&str> = BTreeSet::new();
    for instruction in &function.instructions {
        for value in instruction.operands.iter().chain(instruction.result.iter()) {
            let IlValue::Variable(variable) = value else {
                continue;
            };
            if variable.scope == VariableScope::Global
                || declared.contains(variable.name.as_str())
                || !hinted.insert(variable.name.as_str())
            {
                continue;
            }
            match variable.storage {
                StorageHint::ZeroPage => zero_page += variable.ty.size_bytes(),
                StorageHint::Ram => ram += variable.ty.size_bytes(),
                StorageHint::Auto | StorageHint::Register => {}
            }
        }
    }

    let mut issues = Vec::new();
    let regions = [
        RegionUsage::new(MemoryRegion::ZeroPage, zero_page, map.zero_page_bytes),
        RegionUsage::new(MemoryRegion::Stack, stack, map.stack_bytes),
        RegionUsage::new(MemoryRegion::Ram, ram, map.ram_bytes),
    ];
    for usage in &regions {
        if !usage.is_valid {
            issues.push(AnalysisIssue::error(
                IssueKind::MemoryOverflow,
                format!(
                    "{} needs {} bytes of {}, {} available",
                    function.name, usage.used_bytes, usage.region, usage.capacity_bytes
                ),
            ));
        } else if usage.utilization > PRESSURE_PERCENT {
            issues.push(AnalysisIssue::warning(
                IssueKind::MemoryPressure,
                format!(
                    "{} uses {:.1}% of {}",
                    function.name, usage.utilization, usage.region
                ),
            ));
        }
    }

    let mut unsupported_modes = 0;
    for (index, instruction) in function.instructions.iter().enumerate() {
        if let Some(mode) = instruction.addressing_mode() {
            if !ctx.table.supports_mode(mode) {
                unsupported_modes += 1;
                issues.push(
                    AnalysisIssue::error(
                        IssueKind::UnsupportedAddressingMode,
                        format!(
                            "{} addressing is not available on the {}",
                            mode,
                            ctx.analyzer.variant()
                        ),
                    )
                    .at_instruction(index),
                );
            }
        }
    }

    let [zero_page, stack, ram] = regions;
    (
        MemoryLayoutAnalysis {
            enabled: true,
            zero_page,
            stack,
            ram,
            register_locals,
            unsupported_modes,
        },
        issues,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{ControlFlowAnalyzer, Severity},
        il::{AddressingMode, FunctionBuilder, IlType, InstructionHints},
        timing::{Mos6502Analyzer, Wdc65C02Analyzer},
    };

    fn run(
        builder: &FunctionBuilder,
        analyzer: &dyn crate::timing::HardwareAnalyzer,
    ) -> (MemoryLayoutAnalysis, Vec<AnalysisIssue>) {
        let function = builder.build();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&function).unwrap();
        let ctx = FunctionContext::new(&function, &cfa, analyzer).unwrap();
        analyze(&ctx)
    }

    #[test]
    fn test_region_accounting() {
        let mut builder = FunctionBuilder::new("locals");
        builder
            .parameter("p", IlType::Word)
            .local("fast", IlType::Byte, StorageClass::ZeroPage)
            .local("buf", IlType::array(IlType::Byte, 40), StorageClass::Ram)
            .local("tmp", IlType::Byte, StorageClass::Stack)
            .local("acc", IlType::Byte, StorageClass::Register)
            .ret(None);
        let (layout, issues) = run(&builder, &Mos6502Analyzer);

        assert!(issues.is_empty());
        assert_eq!(layout.zero_page.used_bytes, 1);
        assert_eq!(layout.stack.used_bytes, 3);
        assert_eq!(layout.ram.used_bytes, 40);
        assert_eq!(layout.register_locals, 1);
        assert!(layout.is_valid());
    }

    #[test]
    fn test_zero_page_overflow_and_pressure() {
        let mut builder = FunctionBuilder::new("greedy");
        builder
            .local("table", IlType::array(IlType::Byte, 200), StorageClass::ZeroPage)
            .local("big", IlType::array(IlType::Word, 110), StorageClass::Stack)
            .ret(None);
        let (layout, issues) = run(&builder, &Mos6502Analyzer);

        assert!(!layout.zero_page.is_valid);
        assert_eq!(issues[0].kind, IssueKind::MemoryOverflow);
        assert_eq!(issues[0].severity, Severity::Error);
        // 220 of 256 stack bytes
        assert_eq!(issues[1].kind, IssueKind::MemoryPressure);
        assert_eq!(issues[1].severity, Severity::Warning);
    }

    #[test]
    fn test_unsupported_addressing_mode() {
        let mut builder = FunctionBuilder::new("indirect");
        builder
            .load_variable(IlValue::temp(0), IlValue::local("ptr", IlType::Pointer))
            .with_hints(InstructionHints {
                addressing_mode: Some(AddressingMode::ZeroPageIndirect),
                ..InstructionHints::default()
            })
            .ret(None);

        let (nmos, issues) = run(&builder, &Mos6502Analyzer);
        assert_eq!(nmos.unsupported_modes, 1);
        assert_eq!(issues[0].instruction, Some(0));

        let (cmos, issues) = run(&builder, &Wdc65C02Analyzer);
        assert_eq!(cmos.unsupported_modes, 0);
        assert!(issues.is_empty());
    }
}
