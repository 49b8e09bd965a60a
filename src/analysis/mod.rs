//! Control flow and data flow analysis of IL functions.
//!
//! This module provides the per-function analyses that every later stage builds on.
//! It builds upon the generic graph infrastructure in [`crate::utils::graph`] to provide
//! IL-specific analysis tools.
//!
//! # Architecture
//!
//! - [`cfg`] - Control flow graph construction from an instruction list
//! - [`DominanceTree`] - Immediate dominators, dominator tree and dominance frontiers
//! - [`find_loops`] - Natural loop detection, nesting and classification
//! - [`dataflow`] - Def/use chains, liveness, live ranges and interference
//! - [`ControlFlowAnalyzer`] - Sequences the above and validates the result
//!
//! # Usage
//!
//! ```rust
//! use ilscope::analysis::{ControlFlowGraph, DominanceTree, find_loops};
//! use ilscope::il::FunctionBuilder;
//!
//! let mut builder = FunctionBuilder::new("spin");
//! builder.label("top").nop().branch("top");
//! let cfg = ControlFlowGraph::build(&builder.build());
//!
//! let dominance = DominanceTree::compute(&cfg);
//! let loops = find_loops(&cfg, &dominance);
//! assert_eq!(loops.len(), 1);
//! ```

pub mod cfg;
pub mod dataflow;

mod dominance;
mod loops;
mod orchestrator;
mod validation;

pub use cfg::{BasicBlock, CfgEdge, CfgEdgeKind, ControlFlowGraph};
pub use dataflow::{
    BlockLiveness, DataFlowAnalysis, DataFlowPrecision, DataFlowResult, DefUseChain,
    InstructionLocation, InterferenceGraph, LiveRange, UseDefChain, UseRole, VariableSites,
};
pub use dominance::DominanceTree;
pub use loops::{find_loops, loop_depth, LoopCharacteristics, LoopKind, NaturalLoop};
pub use orchestrator::{
    AnalysisMetrics, AnalysisOptions, AnalysisQuality, ControlFlowAnalysisResult,
    ControlFlowAnalyzer, PhaseTimings,
};
pub use validation::{AnalysisIssue, IssueKind, Severity};
