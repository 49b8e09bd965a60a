// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # ilscope
//!
//! The analysis core of a 6502-family compiler toolchain. `ilscope` takes functions in a
//! small three-address Intermediate Language (IL) and answers the questions an optimiser
//! needs answered before it touches them: what the control flow looks like, which values
//! are live where, how many cycles each instruction costs on the target processor, whether
//! the code fits the hardware, and how ready it is for optimisation.
//!
//! ## Features
//!
//! - **Control flow** - basic blocks, dominance tree and frontiers, natural loops
//! - **Data flow** - def-use and use-def chains, liveness, live ranges, interference
//! - **Cycle-accurate timing** - exact per-variant cycle tables for the 6502, 6510 and 65C02
//! - **Hardware constraints** - zero page, stack and RAM budgets, interrupt and frame budgets
//! - **Quality metrics** - complexity, performance prediction, readiness and quality gates
//! - **Deterministic** - identical input gives identical results, down to the ordering
//!
//! ## Quick Start
//!
//! ```rust
//! use ilscope::prelude::*;
//!
//! let mut builder = FunctionBuilder::new("count");
//! builder
//!     .load_immediate(IlValue::temp(0), IlValue::byte(0))
//!     .label("loop")
//!     .binary(IlOpcode::Add, IlValue::temp(0), IlValue::temp(0), IlValue::byte(1))
//!     .binary(IlOpcode::CompareLt, IlValue::temp(1), IlValue::temp(0), IlValue::byte(10))
//!     .branch_if_true(IlValue::temp(1), "loop")
//!     .ret(Some(IlValue::temp(0)));
//! let function = builder.build();
//!
//! let cfa = ControlFlowAnalyzer::default().analyze_function(&function)?;
//! assert_eq!(cfa.loops.len(), 1);
//!
//! let timing = TimingValidator::new(TimingOptions::for_target("c64", "6510")?)
//!     .analyze_function(&function, &cfa)?;
//! assert!(timing.is_valid);
//!
//! let report = QualityAnalyzer::default().analyze_function(&function, Some(&cfa), Some(&timing));
//! assert!((0.0..=100.0).contains(&report.overall_quality_score));
//! # Ok::<(), ilscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`il`] - The IL program model and the [`il::FunctionBuilder`]
//! - [`analysis`] - CFG construction, dominance, loops, data flow and the orchestrator
//! - [`timing`] - Cycle timing and hardware constraint validation per target
//! - [`metrics`] - The quality metrics engine
//! - [`bridge`] - Ranking of external optimisation patterns against a quality report
//! - [`utils`] - Graph primitives and algorithms shared by the analyses
//! - [`prelude`] - Re-exports of the most commonly used types
//!
//! ## Error Handling
//!
//! Only configuration problems and missing input are [`Error`]s. Everything the analyses
//! find in the code itself is reported as an [`analysis::AnalysisIssue`] inside the result.
//!
//! ## Logging
//!
//! Phase timings and notable findings are emitted through the [`log`] facade; install any
//! logger implementation to see them.

mod error;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use ilscope::prelude::*;
///
/// let function = FunctionBuilder::new("empty").build();
/// let cfa = ControlFlowAnalyzer::default().analyze_function(&function)?;
/// assert_eq!(cfa.cfg.block_count(), 0);
/// # Ok::<(), ilscope::Error>(())
/// ```
pub mod prelude;

/// The Intermediate Language program model.
///
/// Opcodes, values, instructions, functions, modules and programs, plus the
/// [`il::FunctionBuilder`] that assigns instruction ids.
pub mod il;

/// Control flow and data flow analysis.
pub mod analysis;

/// Cycle-accurate timing and hardware constraint validation.
pub mod timing;

/// The IL quality metrics engine.
pub mod metrics;

/// Ranking of optimisation patterns against quality reports.
pub mod bridge;

/// Graph primitives, algorithms and small shared helpers.
pub mod utils;

/// `ilscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `ilscope` Error type
///
/// # Examples
///
/// ```rust
/// use ilscope::{timing::TimingOptions, Error};
///
/// match TimingOptions::for_target("c128", "8502") {
///     Err(Error::UnsupportedPlatform(platform)) => assert_eq!(platform, "c128"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
pub use error::Error;
