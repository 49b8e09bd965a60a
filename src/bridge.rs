//! Ranking of optimisation patterns against a quality report.
//!
//! The crate does not ship patterns. A pattern library implements [`PatternCatalog`] and
//! [`rank_patterns`] scores each [`PatternDescriptor`] against the analysis results of
//! one function.
//!
//! # Examples
//!
//! ```rust
//! use ilscope::bridge::{rank_patterns, PatternDescriptor};
//! use ilscope::metrics::OptimizationCategory;
//! use ilscope::prelude::*;
//! use ilscope::timing::VariantFeatures;
//!
//! let mut builder = FunctionBuilder::new("main");
//! builder
//!     .binary(IlOpcode::Mul, IlValue::temp(0), IlValue::temp(1), IlValue::byte(4))
//!     .ret(Some(IlValue::temp(0)));
//! let function = builder.build();
//!
//! let cfa = ControlFlowAnalyzer::default().analyze_function(&function)?;
//! let timing = TimingValidator::new(TimingOptions::default()).analyze_function(&function, &cfa)?;
//! let report = QualityAnalyzer::default().analyze_function(&function, Some(&cfa), Some(&timing));
//!
//! let catalog = vec![
//!     PatternDescriptor::new("mul_pow2_to_shift", OptimizationCategory::Arithmetic, 10.0, 40.0),
//!     PatternDescriptor::new("stz", OptimizationCategory::HardwareSpecific, 0.0, 10.0)
//!         .requires(VariantFeatures::STORE_ZERO),
//! ];
//!
//! // The default target is a 6510, which has no STZ.
//! let ranked = rank_patterns(&report, &cfa, &timing, &catalog);
//! assert_eq!(ranked.len(), 1);
//! assert_eq!(ranked[0].pattern_id, "mul_pow2_to_shift");
//! # Ok::<(), ilscope::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    analysis::ControlFlowAnalysisResult,
    metrics::{OptimizationCategory, QualityReport},
    timing::{TimingValidationResult, VariantFeatures},
};

/// A pattern as described by its library.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternDescriptor {
    /// Unique id
    pub id: String,
    /// Category the pattern belongs to
    pub category: OptimizationCategory,
    /// Category readiness below which the pattern is not considered, 0-100
    pub min_readiness: f64,
    /// Features the target variant must have
    pub required_features: VariantFeatures,
    /// Benefit at full applicability
    pub base_benefit: f64,
}

impl PatternDescriptor {
    /// A descriptor without feature requirements.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        category: OptimizationCategory,
        min_readiness: f64,
        base_benefit: f64,
    ) -> Self {
        PatternDescriptor {
            id: id.into(),
            category,
            min_readiness,
            required_features: VariantFeatures::empty(),
            base_benefit,
        }
    }

    /// Adds required variant features.
    #[must_use]
    pub fn requires(mut self, features: VariantFeatures) -> Self {
        self.required_features |= features;
        self
    }
}

/// A source of pattern descriptors.
pub trait PatternCatalog {
    /// All patterns of the catalog.
    fn patterns(&self) -> Vec<PatternDescriptor>;
}

impl PatternCatalog for Vec<PatternDescriptor> {
    fn patterns(&self) -> Vec<PatternDescriptor> {
        self.clone()
    }
}

/// A pattern that applies to the analysed function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCandidate {
    /// Pattern id
    pub pattern_id: String,
    /// Pattern category
    pub category: OptimizationCategory,
    /// 0-100
    pub applicability: f64,
    /// Readiness of the category
    pub readiness: f64,
    /// `base_benefit` scaled by applicability
    pub estimated_benefit: f64,
}

/// Scores the patterns of `catalog` and returns the applicable ones, best first.
///
/// Applicability blends the category readiness (50%), the transformation safety (30%)
/// and a feature score (20%): 100 for patterns that use variant features the target has,
/// 50 for patterns that need none. Degraded control flow results and invalid timing results
/// scale it down. Patterns whose category readiness is below their minimum, or that need
/// features the target lacks, are dropped.
#[must_use]
pub fn rank_patterns(
    report: &QualityReport,
    analysis: &ControlFlowAnalysisResult,
    timing: &TimingValidationResult,
    catalog: &dyn PatternCatalog,
) -> Vec<PatternCandidate> {
    let features = timing.variant.features();
    let safety = report.readiness.safety.overall_safety;
    let mut scale = 1.0;
    if !analysis.is_complete() {
        scale *= 0.8;
    }
    if !timing.is_valid {
        scale *= 0.5;
    }

    let mut candidates: Vec<PatternCandidate> = catalog
        .patterns()
        .into_iter()
        .filter(|pattern| features.contains(pattern.required_features))
        .filter_map(|pattern| {
            let readiness = report
                .readiness
                .category(pattern.category)
                .map_or(0.0, |c| c.readiness_score);
            if readiness < pattern.min_readiness {
                return None;
            }
            let feature_score = if pattern.required_features.is_empty() {
                50.0
            } else {
                100.0
            };
            let applicability =
                ((0.5 * readiness + 0.3 * safety + 0.2 * feature_score) * scale).clamp(0.0, 100.0);
            Some(PatternCandidate {
                estimated_benefit: pattern.base_benefit * applicability / 100.0,
                pattern_id: pattern.id,
                category: pattern.category,
                applicability,
                readiness,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.applicability
            .total_cmp(&a.applicability)
            .then_with(|| b.estimated_benefit.total_cmp(&a.estimated_benefit))
            .then_with(|| a.pattern_id.cmp(&b.pattern_id))
    });
    log::debug!(
        "{}: {} applicable patterns",
        report.function_name,
        candidates.len()
    );
    candidates
}
