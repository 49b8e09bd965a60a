use std::str::FromStr;

use crate::{
    timing::{ProcessorVariant, TargetPlatform},
    Error, Result,
};

/// Configuration of the [`crate::timing::TimingValidator`].
///
/// Each sub-analysis can be switched off independently. A disabled sub-analysis still
/// appears in the result, as its `disabled()` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct TimingOptions {
    /// Target machine
    pub platform: TargetPlatform,
    /// Processor variant, must run on `platform`
    pub variant: ProcessorVariant,
    /// Per-instruction cycle attribution and critical path
    pub enable_cycle_timing: bool,
    /// Zero page, stack and RAM usage and addressing mode support
    pub enable_memory_layout: bool,
    /// Register pressure and spill risk
    pub enable_register_analysis: bool,
    /// Hotspot ranking and the headroom score
    pub enable_hotspots: bool,
    /// Stack depth and cycle budgets
    pub enable_constraints: bool,
    /// Optimisation recommendations
    pub enable_recommendations: bool,
    /// Cycle budget of an interrupt handler
    pub interrupt_budget_cycles: u32,
    /// Optional cycle budget for any function
    pub frame_budget_cycles: Option<u32>,
}

impl Default for TimingOptions {
    fn default() -> Self {
        Self {
            platform: TargetPlatform::C64,
            variant: ProcessorVariant::Mos6510,
            enable_cycle_timing: true,
            enable_memory_layout: true,
            enable_register_analysis: true,
            enable_hotspots: true,
            enable_constraints: true,
            enable_recommendations: true,
            interrupt_budget_cycles: 1000,
            frame_budget_cycles: None,
        }
    }
}

impl TimingOptions {
    /// Default options for a platform/variant pair given as identifiers.
    ///
    /// Identifiers are matched case-insensitively: `c64`, `vic20`, `x16` and `6510`,
    /// `6502`, `65c02`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedPlatform`] and [`Error::UnsupportedVariant`] for unknown
    /// identifiers, [`Error::VariantPlatformMismatch`] when the variant does not run on
    /// the platform.
    pub fn for_target(platform: &str, variant: &str) -> Result<Self> {
        let parsed_platform = TargetPlatform::from_str(platform)
            .map_err(|_| Error::UnsupportedPlatform(platform.to_string()))?;
        let parsed_variant = ProcessorVariant::from_str(variant)
            .map_err(|_| Error::UnsupportedVariant(variant.to_string()))?;

        let options = Self {
            platform: parsed_platform,
            variant: parsed_variant,
            ..Self::default()
        };
        options.validate()?;
        Ok(options)
    }

    /// Cycle timing only.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_memory_layout: false,
            enable_register_analysis: false,
            enable_hotspots: false,
            enable_constraints: false,
            enable_recommendations: false,
            ..Self::default()
        }
    }

    /// Every sub-analysis, with a PAL frame budget.
    #[must_use]
    pub fn comprehensive() -> Self {
        Self {
            frame_budget_cycles: Some(19_656),
            ..Self::default()
        }
    }

    /// Checks the options for contradictions.
    ///
    /// # Errors
    ///
    /// [`Error::VariantPlatformMismatch`] or [`Error::InvalidConfiguration`].
    pub fn validate(&self) -> Result<()> {
        if !self.platform.supports(self.variant) {
            return Err(Error::VariantPlatformMismatch {
                platform: self.platform.to_string(),
                variant: self.variant.to_string(),
            });
        }
        if self.interrupt_budget_cycles == 0 {
            return Err(Error::InvalidConfiguration(
                "interrupt_budget_cycles must be positive".to_string(),
            ));
        }
        if self.frame_budget_cycles == Some(0) {
            return Err(Error::InvalidConfiguration(
                "frame_budget_cycles must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_target() {
        let options = TimingOptions::for_target("X16", "65c02").unwrap();
        assert_eq!(options.platform, TargetPlatform::X16);
        assert_eq!(options.variant, ProcessorVariant::Wdc65C02);
        assert!(options.enable_hotspots);
    }

    #[test]
    fn test_for_target_errors() {
        assert!(matches!(
            TimingOptions::for_target("c64", "z80"),
            Err(Error::UnsupportedVariant(v)) if v == "z80"
        ));
        assert!(matches!(
            TimingOptions::for_target("apple2", "6502"),
            Err(Error::UnsupportedPlatform(p)) if p == "apple2"
        ));
        assert!(matches!(
            TimingOptions::for_target("c64", "65c02"),
            Err(Error::VariantPlatformMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_budget_is_invalid() {
        let options = TimingOptions {
            interrupt_budget_cycles: 0,
            ..TimingOptions::default()
        };
        assert!(matches!(options.validate(), Err(Error::InvalidConfiguration(_))));
    }
}
