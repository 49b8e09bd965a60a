//! Shared utilities for the analysis passes.
//!
//! - [`graph`] - Node/edge identifiers, graph traits and graph algorithms
//! - [`BitSet`] - Dense bit vector for the data-flow solver
//! - [`escape_dot`] - Graphviz label escaping
//! - [`Stopwatch`] - Phase timing with a coarse-clock fallback

mod bitset;
mod dot;
mod timer;

pub mod graph;

pub use bitset::BitSet;
pub use dot::escape_dot;
pub use timer::Stopwatch;
