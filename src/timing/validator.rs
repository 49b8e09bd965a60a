use serde::{Deserialize, Serialize};

use crate::{
    analysis::{AnalysisIssue, ControlFlowAnalysisResult, IssueKind},
    il::IlFunction,
    timing::{
        constraints::{self, ConstraintAnalysis},
        context::FunctionContext,
        cycles::{self, CycleTimingAnalysis},
        hotspots::{self, HotspotAnalysis},
        memory::{self, MemoryLayoutAnalysis},
        recommendations::{self, RecommendationAnalysis},
        registers::{self, RegisterAnalysis},
        AnalyzerRegistry, HardwareAnalyzer, ProcessorVariant, TargetPlatform, TimingOptions,
    },
    Error, Result,
};

/// Everything the timing validator produced for one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingValidationResult {
    /// Name of the analysed function
    pub function_name: String,
    /// Target machine
    pub platform: TargetPlatform,
    /// Processor variant
    pub variant: ProcessorVariant,
    /// `false` iff any issue has error severity
    pub is_valid: bool,
    /// Cycle attribution and critical path
    pub cycle_timing: CycleTimingAnalysis,
    /// Memory region usage
    pub memory_layout: MemoryLayoutAnalysis,
    /// Register pressure
    pub registers: RegisterAnalysis,
    /// Hotspots and the headroom score
    pub hotspots: HotspotAnalysis,
    /// Stack depth and cycle budgets
    pub constraints: ConstraintAnalysis,
    /// Optimisation recommendations
    pub recommendations: RecommendationAnalysis,
    /// All findings, in sub-analysis order
    pub issues: Vec<AnalysisIssue>,
}

impl TimingValidationResult {
    fn failed(function: &IlFunction, options: &TimingOptions, error: &Error) -> Self {
        TimingValidationResult {
            function_name: function.name.clone(),
            platform: options.platform,
            variant: options.variant,
            is_valid: false,
            cycle_timing: CycleTimingAnalysis::disabled(),
            memory_layout: MemoryLayoutAnalysis::disabled(),
            registers: RegisterAnalysis::disabled(),
            hotspots: HotspotAnalysis::disabled(),
            constraints: ConstraintAnalysis::disabled(),
            recommendations: RecommendationAnalysis::disabled(),
            issues: vec![AnalysisIssue::error(IssueKind::AnalysisError, error.to_string())],
        }
    }

    /// Total cycles, the sum of all attributions.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.cycle_timing.total_cycles
    }

    /// Cycles along the longest acyclic path.
    #[must_use]
    pub fn critical_path_cycles(&self) -> u64 {
        self.cycle_timing.critical_path_cycles
    }

    /// The hotspot headroom score: 0-100, higher means more room to optimise.
    #[must_use]
    pub fn performance_score(&self) -> f64 {
        self.hotspots.performance_score
    }
}

/// Cycle-accurate timing and hardware constraint validation.
///
/// # Examples
///
/// ```rust
/// use ilscope::prelude::*;
///
/// let mut builder = FunctionBuilder::new("main");
/// builder
///     .binary(IlOpcode::Mul, IlValue::temp(0), IlValue::temp(1), IlValue::byte(4))
///     .ret(Some(IlValue::temp(0)));
/// let function = builder.build();
///
/// let cfa = ControlFlowAnalyzer::default().analyze_function(&function)?;
/// let validator = TimingValidator::new(TimingOptions::for_target("x16", "65c02")?);
/// let timing = validator.analyze_function(&function, &cfa)?;
///
/// assert!(timing.is_valid);
/// assert_eq!(timing.total_cycles(), 48 + 6);
/// assert!(!timing.recommendations.recommendations.is_empty());
/// # Ok::<(), ilscope::Error>(())
/// ```
pub struct TimingValidator {
    options: TimingOptions,
    registry: AnalyzerRegistry,
}

impl TimingValidator {
    /// A validator with the built-in analyzers.
    #[must_use]
    pub fn new(options: TimingOptions) -> Self {
        Self::with_registry(options, AnalyzerRegistry::default())
    }

    /// A validator with a custom registry.
    #[must_use]
    pub fn with_registry(options: TimingOptions, registry: AnalyzerRegistry) -> Self {
        TimingValidator { options, registry }
    }

    /// The configured options.
    #[must_use]
    pub fn options(&self) -> &TimingOptions {
        &self.options
    }

    /// Validates `function` against the configured target.
    ///
    /// # Errors
    ///
    /// Configuration errors only: [`Error::VariantPlatformMismatch`],
    /// [`Error::InvalidConfiguration`], and [`Error::UnsupportedVariant`] when no analyzer
    /// is registered for the variant. They are raised before any per-instruction work.
    /// Internal faults are returned as an invalid result with one `AnalysisError` issue.
    pub fn analyze_function(
        &self,
        function: &IlFunction,
        analysis: &ControlFlowAnalysisResult,
    ) -> Result<TimingValidationResult> {
        self.options.validate()?;
        let analyzer = self.registry.get(self.options.variant)?;

        match self.run(function, analysis, analyzer) {
            Ok(result) => Ok(result),
            Err(error) => {
                log::warn!("timing validation of {} failed: {error}", function.name);
                Ok(TimingValidationResult::failed(function, &self.options, &error))
            }
        }
    }

    fn run(
        &self,
        function: &IlFunction,
        analysis: &ControlFlowAnalysisResult,
        analyzer: &dyn HardwareAnalyzer,
    ) -> Result<TimingValidationResult> {
        let options = &self.options;
        let ctx = FunctionContext::new(function, analysis, analyzer)?;
        let mut issues = Vec::new();

        let cycle_timing = if options.enable_cycle_timing {
            cycles::analyze(&ctx)
        } else {
            CycleTimingAnalysis::disabled()
        };

        let memory_layout = if options.enable_memory_layout {
            let (layout, found) = memory::analyze(&ctx);
            issues.extend(found);
            layout
        } else {
            MemoryLayoutAnalysis::disabled()
        };

        let registers = if options.enable_register_analysis {
            let (registers, found) = registers::analyze(&ctx);
            issues.extend(found);
            registers
        } else {
            RegisterAnalysis::disabled()
        };

        let hotspots = if options.enable_hotspots {
            hotspots::analyze(&ctx)
        } else {
            HotspotAnalysis::disabled()
        };

        let constraints = if options.enable_constraints {
            let (constraints, found) = constraints::analyze(
                &ctx,
                options.interrupt_budget_cycles,
                options.frame_budget_cycles,
            );
            issues.extend(found);
            constraints
        } else {
            ConstraintAnalysis::disabled()
        };

        let recommendations = if options.enable_recommendations {
            recommendations::analyze(&ctx)
        } else {
            RecommendationAnalysis::disabled()
        };

        log::debug!(
            "{}: {} cycles on the {}, {} issues",
            function.name,
            ctx.total_cycles(),
            options.variant,
            issues.len()
        );

        Ok(TimingValidationResult {
            function_name: function.name.clone(),
            platform: options.platform,
            variant: options.variant,
            is_valid: !issues.iter().any(AnalysisIssue::is_error),
            cycle_timing,
            memory_layout,
            registers,
            hotspots,
            constraints,
            recommendations,
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{
        analysis::ControlFlowAnalyzer,
        il::{FunctionBuilder, IlOpcode, IlType, IlValue, StorageClass},
        timing::Mos6502Analyzer,
    };

    fn sample() -> IlFunction {
        let i = IlValue::local("i", IlType::Byte);
        let mut builder = FunctionBuilder::new("sample");
        builder
            .store_variable(i.clone(), IlValue::byte(0))
            .label("top")
            .load_variable(IlValue::temp(0), i.clone())
            .binary(IlOpcode::Mul, IlValue::temp(1), IlValue::temp(0), IlValue::byte(2))
            .binary(IlOpcode::Add, IlValue::temp(2), IlValue::temp(0), IlValue::byte(1))
            .store_variable(i, IlValue::temp(2))
            .binary(IlOpcode::CompareLt, IlValue::temp(3), IlValue::temp(2), IlValue::byte(10))
            .branch_if_true(IlValue::temp(3), "top")
            .ret(Some(IlValue::temp(1)));
        builder.build()
    }

    fn options_for(platform: TargetPlatform) -> TimingOptions {
        TimingOptions {
            platform,
            variant: platform.processor(),
            ..TimingOptions::default()
        }
    }

    #[test]
    fn test_cycle_additivity_for_every_variant() {
        let function = sample();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&function).unwrap();
        for platform in TargetPlatform::iter() {
            let result = TimingValidator::new(options_for(platform))
                .analyze_function(&function, &cfa)
                .unwrap();
            let sum: u64 = result
                .cycle_timing
                .attributions
                .iter()
                .map(|a| u64::from(a.cycles))
                .sum();
            assert_eq!(result.total_cycles(), sum, "{platform}");
            assert_eq!(result.cycle_timing.attributions.len(), function.instructions.len());
            assert!(result.is_valid);
        }
    }

    #[test]
    fn test_disabled_sub_analyses_are_placeholders() {
        let function = sample();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&function).unwrap();
        let options = TimingOptions {
            enable_cycle_timing: false,
            ..TimingOptions::minimal()
        };
        let result = TimingValidator::new(options).analyze_function(&function, &cfa).unwrap();

        assert_eq!(result.cycle_timing, CycleTimingAnalysis::disabled());
        assert_eq!(result.memory_layout, MemoryLayoutAnalysis::disabled());
        assert_eq!(result.registers, RegisterAnalysis::disabled());
        assert_eq!(result.hotspots, HotspotAnalysis::disabled());
        assert_eq!(result.constraints, ConstraintAnalysis::disabled());
        assert_eq!(result.recommendations, RecommendationAnalysis::disabled());
        assert_eq!(result.total_cycles(), 0);
        assert!(result.is_valid);
    }

    #[test]
    fn test_configuration_errors_come_first() {
        let function = sample();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&function).unwrap();

        let mismatched = TimingOptions {
            platform: TargetPlatform::Vic20,
            variant: ProcessorVariant::Wdc65C02,
            ..TimingOptions::default()
        };
        assert!(matches!(
            TimingValidator::new(mismatched).analyze_function(&function, &cfa),
            Err(Error::VariantPlatformMismatch { .. })
        ));

        let mut registry = AnalyzerRegistry::empty();
        registry.register(Box::new(Mos6502Analyzer));
        let validator = TimingValidator::with_registry(TimingOptions::default(), registry);
        assert!(matches!(
            validator.analyze_function(&function, &cfa),
            Err(Error::UnsupportedVariant(_))
        ));
    }

    #[test]
    fn test_internal_fault_is_caught() {
        let function = sample();
        let other = FunctionBuilder::new("other").ret(None).build();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&other).unwrap();

        let result = TimingValidator::new(TimingOptions::default())
            .analyze_function(&function, &cfa)
            .unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::AnalysisError);
    }

    #[test]
    fn test_validity_follows_error_issues() {
        let mut builder = FunctionBuilder::new("overflow");
        builder
            .local("huge", IlType::array(IlType::Byte, 4000), StorageClass::Ram)
            .ret(None);
        let function = builder.build();
        let cfa = ControlFlowAnalyzer::default().analyze_function(&function).unwrap();

        let vic = TimingValidator::new(options_for(TargetPlatform::Vic20))
            .analyze_function(&function, &cfa)
            .unwrap();
        assert!(!vic.is_valid);
        assert!(vic.issues.iter().any(|i| i.kind == IssueKind::MemoryOverflow));

        let c64 = TimingValidator::new(options_for(TargetPlatform::C64))
            .analyze_function(&function, &cfa)
            .unwrap();
        assert!(c64.is_valid);
    }
}
