//! Control flow analysis orchestration.
//!
//! [`ControlFlowAnalyzer`] sequences the per-function analyses (CFG construction,
//! dominance, loops and data flow), validates the assembled graph and packages
//! everything into one [`ControlFlowAnalysisResult`].
//!
//! # Fail-soft behaviour
//!
//! A malformed but parseable function never produces an error. Structural findings are
//! collected as [`AnalysisIssue`] values and the result is flagged
//! [`AnalysisQuality::Degraded`]. Only configuration problems and a program without any
//! function are reported as [`crate::Error`].
//!
//! # Examples
//!
//! ```rust
//! use ilscope::prelude::*;
//!
//! let mut builder = FunctionBuilder::new("main");
//! builder
//!     .load_immediate(IlValue::temp(0), IlValue::byte(42))
//!     .ret(Some(IlValue::temp(0)));
//!
//! let analyzer = ControlFlowAnalyzer::new(AnalysisOptions::default());
//! let result = analyzer.analyze_function(&builder.build())?;
//! assert_eq!(result.cfg.block_count(), 1);
//! assert_eq!(result.analysis_quality, AnalysisQuality::Complete);
//! # Ok::<(), ilscope::Error>(())
//! ```

use std::{
    collections::BTreeSet,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    analysis::{
        dataflow::{DataFlowAnalysis, DataFlowPrecision, DataFlowResult},
        loops::{find_loops, irreducible_back_edges, loop_depth, NaturalLoop},
        validation::{validate_instructions, validate_structure, AnalysisIssue, IssueKind, Severity},
        ControlFlowGraph, DominanceTree,
    },
    il::{IlFunction, IlProgram},
    utils::{graph::NodeId, Stopwatch},
    Error, Result,
};

/// Configuration for [`ControlFlowAnalyzer`].
///
/// CFG construction always runs. Loop detection needs the dominance tree, so enabling
/// loops while disabling dominance is rejected as an invalid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalysisOptions {
    /// Compute the dominance tree
    pub enable_dominance: bool,
    /// Detect natural loops
    pub enable_loops: bool,
    /// Run def/use, liveness and interference analysis
    pub enable_data_flow: bool,
    /// Validate CFG structure and instruction shape
    pub enable_validation: bool,
    /// Liveness precision used by the data flow phase
    pub precision: DataFlowPrecision,
    /// Soft budget; exceeding it is logged only
    pub max_analysis_time: Duration,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            enable_dominance: true,
            enable_loops: true,
            enable_data_flow: true,
            enable_validation: true,
            precision: DataFlowPrecision::Precise,
            max_analysis_time: Duration::from_millis(1000),
        }
    }
}

impl AnalysisOptions {
    /// CFG construction and structural validation only.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_dominance: false,
            enable_loops: false,
            enable_data_flow: false,
            enable_validation: true,
            precision: DataFlowPrecision::Coarse,
            max_analysis_time: Duration::from_millis(100),
        }
    }

    /// Every phase, precise liveness and a generous time budget.
    #[must_use]
    pub fn comprehensive() -> Self {
        Self {
            max_analysis_time: Duration::from_secs(10),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<()> {
        if self.enable_loops && !self.enable_dominance {
            return Err(Error::InvalidConfiguration(
                "loop detection requires the dominance analysis".to_string(),
            ));
        }
        if self.max_analysis_time.is_zero() {
            return Err(Error::InvalidConfiguration(
                "max_analysis_time must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Overall trust level of a [`ControlFlowAnalysisResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisQuality {
    /// No error or warning issue was found
    Complete,
    /// At least one error or warning issue was found
    Degraded,
}

/// Deterministic size figures of an analysed function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Instructions in the function
    pub instruction_count: usize,
    /// Basic blocks
    pub block_count: usize,
    /// CFG edges
    pub edge_count: usize,
    /// Blocks reachable from the entry
    pub reachable_block_count: usize,
    /// Natural loops
    pub loop_count: usize,
    /// Deepest loop nesting
    pub max_loop_depth: usize,
    /// McCabe complexity of the CFG
    pub cyclomatic_complexity: usize,
    /// Distinct variables and temporaries
    pub variable_count: usize,
    /// Edges of the interference graph
    pub interference_edges: usize,
}

/// Wall-clock duration of each phase, in milliseconds.
///
/// Never part of the serialised result, so identical input always serialises to
/// identical output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimings {
    /// CFG construction
    pub cfg_ms: f64,
    /// Dominance tree
    pub dominance_ms: f64,
    /// Loop detection
    pub loops_ms: f64,
    /// Data flow
    pub data_flow_ms: f64,
    /// Validation
    pub validation_ms: f64,
    /// Whole analysis
    pub total_ms: f64,
}

/// Everything the control flow analysis produced for one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlFlowAnalysisResult {
    /// Name of the analysed function
    pub function_name: String,
    /// The control flow graph, with loop flags set
    pub cfg: ControlFlowGraph,
    /// Dominance tree (empty when disabled)
    pub dominance: DominanceTree,
    /// Natural loops (empty when disabled)
    pub loops: Vec<NaturalLoop>,
    /// Data flow facts (empty when disabled)
    pub data_flow: DataFlowResult,
    /// Non-fatal findings
    pub issues: Vec<AnalysisIssue>,
    /// Overall trust level
    pub analysis_quality: AnalysisQuality,
    /// Size figures
    pub metrics: AnalysisMetrics,
    /// Phase durations
    #[serde(skip)]
    pub timings: PhaseTimings,
}

impl ControlFlowAnalysisResult {
    /// Returns `true` if any issue has error severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(AnalysisIssue::is_error)
    }

    /// Returns `true` if an error-severity issue breaks the graph invariants.
    ///
    /// Such a graph cannot be measured. Other errors, like dangling branch targets,
    /// leave a usable but degraded graph.
    #[must_use]
    pub fn has_structural_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.is_error() && issue.kind.is_structural())
    }

    /// Returns `true` for [`AnalysisQuality::Complete`].
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.analysis_quality == AnalysisQuality::Complete
    }

    /// Loop nesting depth of `block`, 0 outside loops.
    #[must_use]
    pub fn loop_depth(&self, block: NodeId) -> usize {
        loop_depth(&self.loops, block)
    }

    /// Loop nesting depth of the block containing instruction `index`.
    #[must_use]
    pub fn instruction_loop_depth(&self, index: usize) -> usize {
        self.cfg
            .blocks()
            .iter()
            .find(|b| b.start <= index && index < b.end)
            .map_or(0, |b| self.loop_depth(b.id))
    }
}

/// Runs the per-function control flow and data flow analyses.
///
/// The analyzer holds configuration and an instance-local counter, so one instance can
/// be shared between threads.
pub struct ControlFlowAnalyzer {
    options: AnalysisOptions,
    analyzed: AtomicUsize,
}

impl Default for ControlFlowAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisOptions::default())
    }
}

impl ControlFlowAnalyzer {
    /// Creates an analyzer with `options`.
    #[must_use]
    pub fn new(options: AnalysisOptions) -> Self {
        ControlFlowAnalyzer {
            options,
            analyzed: AtomicUsize::new(0),
        }
    }

    /// The configured options.
    #[must_use]
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Number of functions this instance has analysed.
    #[must_use]
    pub fn analyzed_count(&self) -> usize {
        self.analyzed.load(Ordering::Relaxed)
    }

    /// Analyses one function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for contradictory options. Problems in the
    /// function itself are reported as issues in the result.
    pub fn analyze_function(&self, function: &IlFunction) -> Result<ControlFlowAnalysisResult> {
        self.options.check()?;
        let total = Stopwatch::start();
        let mut timings = PhaseTimings::default();

        let watch = Stopwatch::start();
        let mut cfg = ControlFlowGraph::build(function);
        timings.cfg_ms = watch.elapsed_ms();
        log::trace!(
            "{}: {} blocks, {} edges",
            function.name,
            cfg.block_count(),
            cfg.edge_count()
        );

        let watch = Stopwatch::start();
        let dominance = if self.options.enable_dominance {
            DominanceTree::compute(&cfg)
        } else {
            DominanceTree::default()
        };
        timings.dominance_ms = watch.elapsed_ms();

        let watch = Stopwatch::start();
        let mut issues = Vec::new();
        let loops = if self.options.enable_loops {
            let loops = find_loops(&cfg, &dominance);
            let headers: BTreeSet<NodeId> = loops.iter().map(|l| l.header).collect();
            let exits: BTreeSet<NodeId> = loops
                .iter()
                .flat_map(|l| l.exits.iter().copied())
                .collect();
            cfg.mark_loops(&headers, &exits);

            for (latch, header) in irreducible_back_edges(&cfg, &dominance) {
                issues.push(
                    AnalysisIssue::warning(
                        IssueKind::IrreducibleLoop,
                        format!(
                            "back edge {latch} -> {header} enters a cycle with multiple entries"
                        ),
                    )
                    .at_block(latch),
                );
            }
            loops
        } else {
            Vec::new()
        };
        timings.loops_ms = watch.elapsed_ms();

        let watch = Stopwatch::start();
        let data_flow = if self.options.enable_data_flow {
            DataFlowAnalysis::analyze(&cfg, self.options.precision)
        } else {
            DataFlowResult {
                precision: self.options.precision,
                ..DataFlowResult::default()
            }
        };
        timings.data_flow_ms = watch.elapsed_ms();

        let watch = Stopwatch::start();
        if self.options.enable_validation {
            let mut found = validate_structure(&cfg);
            found.extend(validate_instructions(function));
            found.append(&mut issues);
            issues = found;
        }
        timings.validation_ms = watch.elapsed_ms();

        let analysis_quality = if issues
            .iter()
            .any(|i| matches!(i.severity, Severity::Error | Severity::Warning))
        {
            AnalysisQuality::Degraded
        } else {
            AnalysisQuality::Complete
        };

        let metrics = AnalysisMetrics {
            instruction_count: function.instruction_count(),
            block_count: cfg.block_count(),
            edge_count: cfg.edge_count(),
            reachable_block_count: cfg.reachable_blocks().len(),
            loop_count: loops.len(),
            max_loop_depth: loops.iter().map(|l| l.depth).max().unwrap_or(0),
            cyclomatic_complexity: cfg.cyclomatic_complexity(),
            variable_count: data_flow.variables.len(),
            interference_edges: data_flow.interference.edge_count(),
        };

        timings.total_ms = total.elapsed_ms();
        log::debug!(
            "{}: cfg {:.3}ms, dominance {:.3}ms, loops {:.3}ms, data flow {:.3}ms, \
             validation {:.3}ms",
            function.name,
            timings.cfg_ms,
            timings.dominance_ms,
            timings.loops_ms,
            timings.data_flow_ms,
            timings.validation_ms
        );
        if total.elapsed() > self.options.max_analysis_time {
            log::warn!(
                "{}: analysis took {:.3}ms, budget is {}ms",
                function.name,
                timings.total_ms,
                self.options.max_analysis_time.as_millis()
            );
        }

        self.analyzed.fetch_add(1, Ordering::Relaxed);

        Ok(ControlFlowAnalysisResult {
            function_name: function.name.clone(),
            cfg,
            dominance,
            loops,
            data_flow,
            issues,
            analysis_quality,
            metrics,
            timings,
        })
    }

    /// Analyses the first function of `program`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if the program holds no function, or any error of
    /// [`ControlFlowAnalyzer::analyze_function`].
    pub fn analyze_program(&self, program: &IlProgram) -> Result<ControlFlowAnalysisResult> {
        let function = program.first_function().ok_or_else(|| {
            Error::MissingInput(format!("program '{}' contains no function", program.name))
        })?;
        self.analyze_function(function)
    }

    /// Analyses every function of `program` in parallel, in program order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if the program holds no function, or the first
    /// error of [`ControlFlowAnalyzer::analyze_function`].
    pub fn analyze_program_all(
        &self,
        program: &IlProgram,
    ) -> Result<Vec<ControlFlowAnalysisResult>> {
        let functions: Vec<&IlFunction> = program.functions().collect();
        if functions.is_empty() {
            return Err(Error::MissingInput(format!(
                "program '{}' contains no function",
                program.name
            )));
        }
        functions
            .par_iter()
            .map(|function| self.analyze_function(function))
            .collect()
    }

    /// Structural validation of any control flow graph.
    #[must_use]
    pub fn validate_cfg(cfg: &ControlFlowGraph) -> Vec<AnalysisIssue> {
        validate_structure(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{FunctionBuilder, IlModule, IlOpcode, IlType, IlValue};

    fn if_else() -> IlFunction {
        let cond = IlValue::temp(0);
        let mut builder = FunctionBuilder::new("if_else");
        builder
            .binary(
                IlOpcode::CompareLt,
                cond.clone(),
                IlValue::local("a", IlType::Byte),
                IlValue::byte(10),
            )
            .branch_if_false(cond, "else")
            .load_immediate(IlValue::temp(1), IlValue::byte(1))
            .branch("end")
            .label("else")
            .load_immediate(IlValue::temp(1), IlValue::byte(2))
            .label("end")
            .ret(Some(IlValue::temp(1)));
        builder.build()
    }

    fn counting_loop() -> IlFunction {
        let i = IlValue::local("i", IlType::Byte);
        let mut builder = FunctionBuilder::new("count");
        builder
            .store_variable(i.clone(), IlValue::byte(0))
            .label("head")
            .load_variable(IlValue::temp(0), i.clone())
            .binary(IlOpcode::CompareLt, IlValue::temp(1), IlValue::temp(0), IlValue::byte(10))
            .branch_if_false(IlValue::temp(1), "done")
            .binary(IlOpcode::Add, IlValue::temp(2), IlValue::temp(0), IlValue::byte(1))
            .store_variable(i, IlValue::temp(2))
            .branch("head")
            .label("done")
            .ret(None);
        builder.build()
    }

    #[test]
    fn test_if_else_is_complete() {
        let result = ControlFlowAnalyzer::default().analyze_function(&if_else()).unwrap();
        assert_eq!(result.analysis_quality, AnalysisQuality::Complete);
        assert!(result.issues.is_empty());
        assert!(result.loops.is_empty());
        assert_eq!(result.metrics.cyclomatic_complexity, 2);
        assert_eq!(result.metrics.block_count, 4);
    }

    #[test]
    fn test_loop_flags_are_marked() {
        let result = ControlFlowAnalyzer::default().analyze_function(&counting_loop()).unwrap();
        assert_eq!(result.loops.len(), 1);
        let header = result.loops[0].header;
        assert!(result.cfg.block(header).unwrap().is_loop_header);
        for exit in &result.loops[0].exits {
            assert!(result.cfg.block(*exit).unwrap().is_loop_exit);
        }
        assert_eq!(result.metrics.max_loop_depth, 1);
        assert_eq!(result.loop_depth(header), 1);
        assert_eq!(result.instruction_loop_depth(0), 0);
    }

    #[test]
    fn test_dangling_target_degrades() {
        let mut builder = FunctionBuilder::new("dangling");
        builder.branch("nowhere").ret(None);
        let result = ControlFlowAnalyzer::default().analyze_function(&builder.build()).unwrap();
        assert_eq!(result.analysis_quality, AnalysisQuality::Degraded);
        assert!(result.has_errors());
        assert!(result
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::DanglingBranchTarget));
    }

    #[test]
    fn test_empty_function_is_valid() {
        let result = ControlFlowAnalyzer::default()
            .analyze_function(&IlFunction::new("empty"))
            .unwrap();
        assert!(result.is_complete());
        assert_eq!(result.metrics.cyclomatic_complexity, 1);
    }

    #[test]
    fn test_minimal_options_skip_phases() {
        let analyzer = ControlFlowAnalyzer::new(AnalysisOptions::minimal());
        let result = analyzer.analyze_function(&counting_loop()).unwrap();
        assert!(result.dominance.is_empty());
        assert!(result.loops.is_empty());
        assert!(result.data_flow.def_use.is_empty());
        assert!(result.cfg.block_count() > 0);
    }

    #[test]
    fn test_invalid_options() {
        let options = AnalysisOptions {
            enable_dominance: false,
            ..AnalysisOptions::default()
        };
        let err = ControlFlowAnalyzer::new(options)
            .analyze_function(&if_else())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_program_without_function() {
        let program = IlProgram {
            name: "empty".into(),
            modules: vec![IlModule {
                name: "main".into(),
                functions: vec![],
                globals: vec![],
            }],
        };
        let analyzer = ControlFlowAnalyzer::default();
        assert!(matches!(analyzer.analyze_program(&program), Err(Error::MissingInput(_))));
        assert!(matches!(analyzer.analyze_program_all(&program), Err(Error::MissingInput(_))));
        assert_eq!(analyzer.analyzed_count(), 0);
    }

    #[test]
    fn test_program_all_keeps_order() {
        let program = IlProgram {
            name: "demo".into(),
            modules: vec![IlModule {
                name: "main".into(),
                functions: vec![if_else(), counting_loop()],
                globals: vec![],
            }],
        };
        let analyzer = ControlFlowAnalyzer::default();
        let results = analyzer.analyze_program_all(&program).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.function_name.as_str()).collect();
        assert_eq!(names, vec!["if_else", "count"]);
        assert_eq!(analyzer.analyzed_count(), 2);
        assert_eq!(analyzer.analyze_program(&program).unwrap().function_name, "if_else");
    }
}
