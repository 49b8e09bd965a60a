//! # ilscope Prelude
//!
//! The types needed to build IL functions and run the full analysis pipeline on them.
//! Import with `use ilscope::prelude::*;`.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all ilscope operations
pub use crate::Error;

/// The result type used throughout ilscope
pub use crate::Result;

// ================================================================================================
// IL Model
// ================================================================================================

/// Functions, modules and programs
pub use crate::il::{IlFunction, IlModule, IlProgram, StorageClass};

/// Instructions and their operands
pub use crate::il::{IlInstruction, IlOpcode, IlType, IlValue, PhysicalRegister};

/// Instruction construction
pub use crate::il::{AddressingMode, FunctionBuilder, InstructionHints};

// ================================================================================================
// Control Flow and Data Flow
// ================================================================================================

/// Graph identifiers
pub use crate::utils::graph::NodeId;

/// Control flow graph
pub use crate::analysis::{BasicBlock, ControlFlowGraph};

/// Dominance, loops and data flow
pub use crate::analysis::{DataFlowAnalysis, DataFlowPrecision, DominanceTree, NaturalLoop};

/// The per-function orchestrator and its result
pub use crate::analysis::{
    AnalysisOptions, AnalysisQuality, ControlFlowAnalysisResult, ControlFlowAnalyzer,
};

/// Findings
pub use crate::analysis::{AnalysisIssue, IssueKind, Severity};

// ================================================================================================
// Timing
// ================================================================================================

/// Targets
pub use crate::timing::{ProcessorVariant, TargetPlatform};

/// The validator and its result
pub use crate::timing::{TimingOptions, TimingValidationResult, TimingValidator};

// ================================================================================================
// Quality Metrics
// ================================================================================================

/// The metrics engine and its report
pub use crate::metrics::{GateStatus, QualityAnalyzer, QualityOptions, QualityReport};
