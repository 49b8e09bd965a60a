//! Per-variant hardware analyzers and their registry.

use std::collections::BTreeMap;

use crate::{
    il::IlInstruction,
    timing::{CycleTable, MemoryMap, ProcessorVariant, VariantFeatures},
    Error, Result,
};

/// Hardware knowledge about one processor variant.
///
/// Implementations hold no per-call state and are shared read-only between threads.
pub trait HardwareAnalyzer: Send + Sync {
    /// The variant this analyzer describes.
    fn variant(&self) -> ProcessorVariant;

    /// Cycles above which a single instruction is a hotspot.
    fn hotspot_threshold(&self) -> u32;

    /// The variant's cycle table.
    fn cycle_table(&self) -> CycleTable {
        CycleTable::new(self.variant())
    }

    /// Optional instruction set features.
    fn features(&self) -> VariantFeatures {
        self.variant().features()
    }

    /// Memory region capacities.
    fn memory_map(&self) -> MemoryMap {
        self.variant().memory_map()
    }

    /// Cycle cost of one instruction.
    fn instruction_cycles(&self, instruction: &IlInstruction) -> u32 {
        self.cycle_table().instruction_cycles(instruction)
    }
}

/// NMOS 6502.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mos6502Analyzer;

impl HardwareAnalyzer for Mos6502Analyzer {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::Mos6502
    }

    fn hotspot_threshold(&self) -> u32 {
        40
    }
}

/// 6510, the C64's 6502 with an I/O port.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mos6510Analyzer;

impl HardwareAnalyzer for Mos6510Analyzer {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::Mos6510
    }

    fn hotspot_threshold(&self) -> u32 {
        40
    }
}

/// CMOS 65C02.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wdc65C02Analyzer;

impl HardwareAnalyzer for Wdc65C02Analyzer {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::Wdc65C02
    }

    fn hotspot_threshold(&self) -> u32 {
        36
    }
}

/// Maps processor variants to their analyzers.
pub struct AnalyzerRegistry {
    analyzers: BTreeMap<ProcessorVariant, Box<dyn HardwareAnalyzer>>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Mos6502Analyzer));
        registry.register(Box::new(Mos6510Analyzer));
        registry.register(Box::new(Wdc65C02Analyzer));
        registry
    }
}

impl AnalyzerRegistry {
    /// A registry without analyzers.
    #[must_use]
    pub fn empty() -> Self {
        AnalyzerRegistry {
            analyzers: BTreeMap::new(),
        }
    }

    /// Registers `analyzer`, replacing any analyzer of the same variant.
    pub fn register(&mut self, analyzer: Box<dyn HardwareAnalyzer>) {
        self.analyzers.insert(analyzer.variant(), analyzer);
    }

    /// The analyzer for `variant`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedVariant`] if no analyzer is registered.
    pub fn get(&self, variant: ProcessorVariant) -> Result<&dyn HardwareAnalyzer> {
        self.analyzers
            .get(&variant)
            .map(|analyzer| &**analyzer)
            .ok_or_else(|| Error::UnsupportedVariant(variant.to_string()))
    }

    /// Registered variants.
    pub fn variants(&self) -> impl Iterator<Item = ProcessorVariant> + '_ {
        self.analyzers.keys().copied()
    }
}
