use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    analysis::{ControlFlowAnalysisResult, Severity},
    error::analysis_error,
    il::IlFunction,
    metrics::{
        clamp_score, complexity,
        gates::{self, GateInputs},
        performance, readiness, ComplexityMetrics, GateImportance, GateResults, GateStatus,
        OptimizationReadiness, PerformancePrediction, QualityOptions, QualityReport,
        QualitySummary,
    },
    timing::TimingValidationResult,
    utils::Stopwatch,
    Result,
};

/// Number of timing recommendations copied into the summary.
const SUMMARY_RECOMMENDATIONS: usize = 3;

/// Overall score deducted per error-severity control flow issue.
const CFG_ERROR_PENALTY: f64 = 20.0;

/// Fuses control flow and timing results into a [`QualityReport`].
///
/// # Examples
///
/// ```rust
/// use ilscope::prelude::*;
///
/// let mut builder = FunctionBuilder::new("main");
/// builder
///     .load_immediate(IlValue::temp(0), IlValue::byte(1))
///     .ret(Some(IlValue::temp(0)));
/// let function = builder.build();
///
/// let cfa = ControlFlowAnalyzer::default().analyze_function(&function)?;
/// let timing = TimingValidator::new(TimingOptions::default()).analyze_function(&function, &cfa)?;
///
/// let report = QualityAnalyzer::default().analyze_function(&function, Some(&cfa), Some(&timing));
/// assert!(report.overall_quality_score > 0.0);
/// assert_eq!(report.complexity.cyclomatic_complexity, 1);
///
/// let report = QualityAnalyzer::default().analyze_function(&function, None, None);
/// assert_eq!(report.overall_quality_score, 0.0);
/// assert!(report.has_critical_issues());
/// # Ok::<(), ilscope::Error>(())
/// ```
pub struct QualityAnalyzer {
    options: QualityOptions,
    analyzed: AtomicUsize,
}

impl Default for QualityAnalyzer {
    fn default() -> Self {
        QualityAnalyzer {
            options: QualityOptions::default(),
            analyzed: AtomicUsize::new(0),
        }
    }
}

impl QualityAnalyzer {
    /// Creates an analyzer with `options`.
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidConfiguration`] if the options do not validate.
    pub fn new(options: QualityOptions) -> Result<Self> {
        options.validate()?;
        Ok(QualityAnalyzer {
            options,
            analyzed: AtomicUsize::new(0),
        })
    }

    /// The configured options.
    #[must_use]
    pub fn options(&self) -> &QualityOptions {
        &self.options
    }

    /// Number of reports this instance has produced.
    #[must_use]
    pub fn analyzed_count(&self) -> usize {
        self.analyzed.load(Ordering::Relaxed)
    }

    /// Produces the quality report of `function`.
    ///
    /// Never fails. A missing control flow result, one with structural errors, or an
    /// internal fault yields a report with a critical issue and an overall score of 0.
    /// Any other error-severity control flow issue is reported as critical and lowers
    /// the overall score by a fixed penalty.
    #[must_use]
    pub fn analyze_function(
        &self,
        function: &IlFunction,
        analysis: Option<&ControlFlowAnalysisResult>,
        timing: Option<&TimingValidationResult>,
    ) -> QualityReport {
        self.analyzed.fetch_add(1, Ordering::Relaxed);

        let Some(analysis) = analysis else {
            return QualityReport::malformed(
                &function.name,
                vec!["no control flow analysis result".to_string()],
            );
        };
        if analysis.has_structural_errors() {
            let issues = analysis
                .issues
                .iter()
                .filter(|issue| issue.is_error() && issue.kind.is_structural())
                .map(|issue| format!("malformed control flow graph: {}", issue.message))
                .collect();
            return QualityReport::malformed(&function.name, issues);
        }

        let watch = Stopwatch::start();
        let report = match self.run(function, analysis, timing) {
            Ok(report) => report,
            Err(error) => {
                log::warn!("quality analysis of {} failed: {error}", function.name);
                QualityReport::malformed(
                    &function.name,
                    vec![format!("internal analysis fault: {error}")],
                )
            }
        };
        log::debug!(
            "{}: quality {:.1} in {:.3}ms",
            function.name,
            report.overall_quality_score,
            watch.elapsed_ms()
        );
        report
    }

    fn run(
        &self,
        function: &IlFunction,
        analysis: &ControlFlowAnalysisResult,
        timing: Option<&TimingValidationResult>,
    ) -> Result<QualityReport> {
        if analysis.function_name != function.name {
            return Err(analysis_error!(
                "control flow result belongs to {}, not {}",
                analysis.function_name,
                function.name
            ));
        }
        if analysis.metrics.instruction_count != function.instructions.len() {
            return Err(analysis_error!(
                "control flow result covers {} instructions, function has {}",
                analysis.metrics.instruction_count,
                function.instructions.len()
            ));
        }
        if let Some(timing) = timing {
            if timing.function_name != function.name {
                return Err(analysis_error!(
                    "timing result belongs to {}, not {}",
                    timing.function_name,
                    function.name
                ));
            }
        }

        let options = &self.options;

        let measured =
            complexity::analyze(function, analysis, &options.thresholds, &options.weights);
        let predicted = performance::predict(function, analysis, timing);
        let assessed = options.enable_readiness.then(|| {
            readiness::assess(
                function,
                analysis,
                measured.overall_complexity_score,
                &predicted,
                timing,
            )
        });

        let complexity = if options.enable_complexity {
            measured
        } else {
            ComplexityMetrics::disabled()
        };
        let performance = if options.enable_performance {
            predicted
        } else {
            PerformancePrediction::disabled()
        };
        let readiness = assessed.unwrap_or_else(OptimizationReadiness::disabled);

        let gates = if options.enable_gates {
            let inputs = GateInputs {
                complexity: options.enable_complexity.then_some(&complexity),
                performance: options.enable_performance.then_some(&performance),
                readiness: options.enable_readiness.then_some(&readiness),
                timing,
            };
            gates::evaluate(&inputs, &options.gates, &options.custom_gates)
        } else {
            GateResults::disabled()
        };

        let mut parts = Vec::new();
        if complexity.enabled {
            parts.push(100.0 - complexity.overall_complexity_score);
        }
        if performance.enabled {
            parts.push(performance.performance_score);
        }
        if readiness.enabled {
            parts.push(readiness.safety.overall_safety);
        }
        if gates.enabled {
            parts.push(gates.gate_quality_score);
        }
        let base = if parts.is_empty() {
            100.0
        } else {
            parts.iter().sum::<f64>() / parts.len() as f64
        };
        let cfg_errors = analysis.issues.iter().filter(|i| i.is_error()).count();
        let overall_quality_score = clamp_score(base - CFG_ERROR_PENALTY * cfg_errors as f64);

        let summary = summarize(analysis, timing, &complexity, &performance, &readiness, &gates);

        Ok(QualityReport {
            function_name: function.name.clone(),
            complexity,
            performance,
            readiness,
            gates,
            overall_quality_score,
            summary,
        })
    }
}

fn summarize(
    analysis: &ControlFlowAnalysisResult,
    timing: Option<&TimingValidationResult>,
    complexity: &ComplexityMetrics,
    performance: &PerformancePrediction,
    readiness: &OptimizationReadiness,
    gates: &GateResults,
) -> QualitySummary {
    let mut summary = QualitySummary::default();

    for gate in &gates.gates {
        let actual = gate.actual.unwrap_or_default();
        let line = format!(
            "gate {} {}: {actual:.1} against {:.1}",
            gate.name, gate.status, gate.threshold
        );
        match (gate.importance, gate.status) {
            (GateImportance::Mandatory, GateStatus::Fail) => summary.critical_issues.push(line),
            (_, GateStatus::Fail | GateStatus::Warning) => summary.warnings.push(line),
            _ => {}
        }
    }

    for issue in &analysis.issues {
        match issue.severity {
            Severity::Error => summary.critical_issues.push(issue.message.clone()),
            Severity::Warning => summary.warnings.push(issue.message.clone()),
            Severity::Info => {}
        }
    }

    if let Some(timing) = timing {
        for issue in &timing.issues {
            match issue.severity {
                Severity::Error => summary.critical_issues.push(issue.message.clone()),
                Severity::Warning => summary.warnings.push(issue.message.clone()),
                Severity::Info => {}
            }
        }
        summary.recommendations = timing
            .recommendations
            .recommendations
            .iter()
            .take(SUMMARY_RECOMMENDATIONS)
            .map(|r| r.description.clone())
            .collect();
    }

    if complexity.enabled && complexity.overall_complexity_score < 30.0 {
        summary.strengths.push("low complexity".to_string());
    }
    if performance.enabled && performance.performance_score >= 80.0 {
        summary.strengths.push("efficient for the target".to_string());
    }
    if readiness.enabled && readiness.safety.overall_safety >= 80.0 {
        summary.strengths.push("safe to transform".to_string());
    }

    summary
}
