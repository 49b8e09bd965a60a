//! Cycle-accurate timing and hardware constraint validation.
//!
//! The [`TimingValidator`] takes an IL function together with its
//! [`crate::analysis::ControlFlowAnalysisResult`] and checks it against one target:
//!
//! | Platform | Variant |
//! |----------|---------|
//! | `c64`    | `6510`  |
//! | `vic20`  | `6502`  |
//! | `x16`    | `65c02` |
//!
//! # Sub-analyses
//!
//! - **Cycle timing**: per-instruction attribution, a per-opcode histogram and the
//!   critical path
//! - **Memory layout**: zero page, stack and RAM usage against the variant memory map,
//!   and addressing mode support
//! - **Registers**: demand on A, X and Y, and spill risk from the data flow analysis
//! - **Hotspots**: loop-weighted ranking and the headroom score
//! - **Constraints**: stack depth, interrupt and frame cycle budgets
//! - **Recommendations**: variant-aware optimisation suggestions
//!
//! Every sub-analysis can be disabled through [`TimingOptions`] and is then reported as
//! its `disabled()` placeholder.
//!
//! # Errors
//!
//! Configuration problems are returned as [`crate::Error`] before any instruction is
//! looked at. Faults inside a sub-analysis never escape: the validator returns an invalid
//! result carrying a single `AnalysisError` issue instead.
//!
//! # Examples
//!
//! ```rust
//! use ilscope::{timing::TimingOptions, Error};
//!
//! let options = TimingOptions::for_target("vic20", "6502")?;
//! assert!(options.enable_cycle_timing);
//!
//! assert!(matches!(
//!     TimingOptions::for_target("vic20", "65c02"),
//!     Err(Error::VariantPlatformMismatch { .. })
//! ));
//! # Ok::<(), Error>(())
//! ```

mod analyzer;
mod constraints;
mod context;
mod cycles;
mod hotspots;
mod memory;
mod options;
mod recommendations;
mod registers;
mod tables;
mod validator;
mod variant;

pub use analyzer::{
    AnalyzerRegistry, HardwareAnalyzer, Mos6502Analyzer, Mos6510Analyzer, Wdc65C02Analyzer,
};
pub use constraints::ConstraintAnalysis;
pub use cycles::{CycleAttribution, CycleTimingAnalysis};
pub use hotspots::{Hotspot, HotspotAnalysis};
pub use memory::{MemoryLayoutAnalysis, MemoryRegion, RegionUsage};
pub use options::TimingOptions;
pub use recommendations::{Difficulty, Recommendation, RecommendationAnalysis, RecommendationKind};
pub use registers::{RegisterAnalysis, RegisterUsage};
pub use tables::CycleTable;
pub use validator::{TimingValidationResult, TimingValidator};
pub use variant::{MemoryMap, ProcessorVariant, TargetPlatform, VariantFeatures};
