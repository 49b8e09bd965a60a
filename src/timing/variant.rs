//! Target platforms, processor variants and their hardware properties.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// A supported target machine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumCount,
    EnumString,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum TargetPlatform {
    /// Commodore 64
    #[strum(serialize = "c64")]
    #[serde(rename = "c64")]
    C64,
    /// Commodore VIC-20
    #[strum(serialize = "vic20")]
    #[serde(rename = "vic20")]
    Vic20,
    /// Commander X16
    #[strum(serialize = "x16")]
    #[serde(rename = "x16")]
    X16,
}

impl TargetPlatform {
    /// The processor variant the platform ships with.
    #[must_use]
    pub fn processor(self) -> ProcessorVariant {
        match self {
            TargetPlatform::C64 => ProcessorVariant::Mos6510,
            TargetPlatform::Vic20 => ProcessorVariant::Mos6502,
            TargetPlatform::X16 => ProcessorVariant::Wdc65C02,
        }
    }

    /// Returns `true` if `variant` runs on this platform.
    #[must_use]
    pub fn supports(self, variant: ProcessorVariant) -> bool {
        self.processor() == variant
    }
}

/// A supported member of the 6502 family.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumCount,
    EnumString,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum ProcessorVariant {
    /// MOS 6502 (NMOS)
    #[strum(serialize = "6502")]
    #[serde(rename = "6502")]
    Mos6502,
    /// MOS 6510, a 6502 core with an on-chip I/O port
    #[strum(serialize = "6510")]
    #[serde(rename = "6510")]
    Mos6510,
    /// WDC 65C02 (CMOS)
    #[strum(serialize = "65c02")]
    #[serde(rename = "65c02")]
    Wdc65C02,
}

impl ProcessorVariant {
    /// Instruction set and hardware features.
    #[must_use]
    pub fn features(self) -> VariantFeatures {
        match self {
            ProcessorVariant::Mos6502 => VariantFeatures::DECIMAL_MODE,
            ProcessorVariant::Mos6510 => VariantFeatures::DECIMAL_MODE | VariantFeatures::IO_PORT,
            ProcessorVariant::Wdc65C02 => {
                VariantFeatures::DECIMAL_MODE
                    | VariantFeatures::ZERO_PAGE_INDIRECT
                    | VariantFeatures::STORE_ZERO
                    | VariantFeatures::BRANCH_ALWAYS
                    | VariantFeatures::ACCUMULATOR_INC_DEC
                    | VariantFeatures::INDEX_STACK_OPS
                    | VariantFeatures::TEST_AND_SET_BITS
            }
        }
    }

    /// Memory regions available to compiled code.
    #[must_use]
    pub fn memory_map(self) -> MemoryMap {
        match self {
            // $02-$8F free while BASIC is banked in, program area $0801-$9FFF
            ProcessorVariant::Mos6510 => MemoryMap {
                zero_page_bytes: 142,
                stack_bytes: 256,
                ram_bytes: 38_911,
            },
            // unexpanded machine, $1001-$1DFF
            ProcessorVariant::Mos6502 => MemoryMap {
                zero_page_bytes: 112,
                stack_bytes: 256,
                ram_bytes: 3_583,
            },
            // $22-$7F user zero page, $0801-$9EFF
            ProcessorVariant::Wdc65C02 => MemoryMap {
                zero_page_bytes: 94,
                stack_bytes: 256,
                ram_bytes: 38_655,
            },
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Optional features of a processor variant
    pub struct VariantFeatures : u32 {
        /// BCD arithmetic through the D flag
        const DECIMAL_MODE = 0x0001;
        /// On-chip I/O port at $00/$01
        const IO_PORT = 0x0002;
        /// `(zp)` addressing without an index register
        const ZERO_PAGE_INDIRECT = 0x0004;
        /// `STZ`
        const STORE_ZERO = 0x0008;
        /// `BRA`
        const BRANCH_ALWAYS = 0x0010;
        /// `INC A` / `DEC A`
        const ACCUMULATOR_INC_DEC = 0x0020;
        /// `PHX` / `PHY` / `PLX` / `PLY`
        const INDEX_STACK_OPS = 0x0040;
        /// `TSB` / `TRB`
        const TEST_AND_SET_BITS = 0x0080;
    }
}

/// Capacities of the memory regions, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryMap {
    /// Zero-page bytes usable by compiled code
    pub zero_page_bytes: u32,
    /// Hardware stack size
    pub stack_bytes: u32,
    /// General RAM usable by compiled code
    pub ram_bytes: u32,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_parse_identifiers() {
        assert_eq!(TargetPlatform::from_str("C64").unwrap(), TargetPlatform::C64);
        assert_eq!(TargetPlatform::from_str("x16").unwrap(), TargetPlatform::X16);
        assert_eq!(ProcessorVariant::from_str("65C02").unwrap(), ProcessorVariant::Wdc65C02);
        assert_eq!(ProcessorVariant::from_str("6510").unwrap(), ProcessorVariant::Mos6510);
        assert!(ProcessorVariant::from_str("z80").is_err());
        assert_eq!(ProcessorVariant::Mos6502.to_string(), "6502");
        assert_eq!(TargetPlatform::Vic20.to_string(), "vic20");
    }

    #[test]
    fn test_every_platform_supports_exactly_one_variant() {
        for platform in TargetPlatform::iter() {
            let supported = ProcessorVariant::iter()
                .filter(|v| platform.supports(*v))
                .count();
            assert_eq!(supported, 1, "{platform}");
        }
    }

    #[test]
    fn test_cmos_features() {
        let features = ProcessorVariant::Wdc65C02.features();
        assert!(features.contains(VariantFeatures::STORE_ZERO | VariantFeatures::BRANCH_ALWAYS));
        assert!(!ProcessorVariant::Mos6502
            .features()
            .intersects(VariantFeatures::STORE_ZERO | VariantFeatures::ZERO_PAGE_INDIRECT));
        assert!(ProcessorVariant::Mos6510.features().contains(VariantFeatures::IO_PORT));
    }
}
