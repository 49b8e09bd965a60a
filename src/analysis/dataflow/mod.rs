//! Data flow analysis over the IL control flow graph.
//!
//! # Analyses
//!
//! - Reaching definitions, giving def-use and use-def chains
//! - Live variables, per block and per instruction
//! - Live ranges per variable
//! - The variable interference graph and the peak number of live variables
//!
//! A definition is the instruction `result` if present, otherwise operand 0 of a
//! definition-producing opcode (see [`crate::il::IlOpcode::defines_first_operand`]).
//! Every other variable or temporary operand is a use, tagged with a [`UseRole`].
//!
//! # Precision
//!
//! [`DataFlowPrecision::Precise`] (the default) derives live ranges and interference from
//! the block-level liveness fixed point: a definition interferes with every variable
//! live right after it. [`DataFlowPrecision::Coarse`] keeps the instruction-index
//! approximation: a live range spans from the first definition or use to the last use,
//! and two variables interfere when their spans overlap.
//!
//! Only blocks reachable from the entry take part. Dead code contributes no chains, no
//! ranges and no conflicts.

mod interference;
mod liveness;
mod reaching;
mod solver;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{analysis::ControlFlowGraph, utils::graph::NodeId};

pub use interference::InterferenceGraph;

/// How live ranges and interference are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataFlowPrecision {
    /// Block liveness fixed point with per-instruction interference.
    #[default]
    Precise,
    /// Instruction-index overlap of first-def/last-use spans.
    Coarse,
}

/// Why a variable operand is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UseRole {
    /// Condition of a conditional branch
    BranchCondition,
    /// Index of an array access
    ArrayIndex,
    /// Argument of a call
    CallArgument,
    /// Value returned from the function
    ReturnValue,
    /// Any other read
    PlainRead,
}

/// Position of an instruction: its block and its index in the function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstructionLocation {
    /// Containing block
    pub block: NodeId,
    /// Index in the function's instruction list
    pub index: usize,
}

impl InstructionLocation {
    /// Creates a location.
    #[must_use]
    pub const fn new(block: NodeId, index: usize) -> Self {
        InstructionLocation { block, index }
    }
}

/// A definition and the uses it reaches before being overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefUseChain {
    /// Defining instruction
    pub definition: InstructionLocation,
    /// Defined variable
    pub variable: String,
    /// Uses reached by this definition
    pub uses: BTreeSet<InstructionLocation>,
}

/// A use and the definitions reaching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseDefChain {
    /// Using instruction
    pub location: InstructionLocation,
    /// Used variable
    pub variable: String,
    /// Role of the use
    pub role: UseRole,
    /// Reaching definitions; empty for reads of undefined values (parameters, globals)
    pub definitions: BTreeSet<InstructionLocation>,
}

/// Definition and use sites of one variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSites {
    /// Defining instructions
    pub definitions: BTreeSet<InstructionLocation>,
    /// Using instructions
    pub uses: BTreeSet<InstructionLocation>,
}

/// Live-in and live-out sets of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLiveness {
    /// Live on entry
    pub live_in: BTreeSet<String>,
    /// Live on exit
    pub live_out: BTreeSet<String>,
}

/// Instruction-index span over which a variable holds a needed value.
///
/// A range starts at or before every use and ends at or after every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRange {
    /// First instruction index
    pub start: usize,
    /// Last instruction index
    pub end: usize,
}

impl LiveRange {
    /// Returns `true` if the two spans share an instruction index.
    #[must_use]
    pub fn overlaps(&self, other: &LiveRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of instructions spanned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always `false`; a range spans at least one instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Everything the data flow analysis computes for one function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlowResult {
    /// Precision the result was computed with
    pub precision: DataFlowPrecision,
    /// One chain per definition, in instruction order
    pub def_use: Vec<DefUseChain>,
    /// One chain per use, in instruction order
    pub use_def: Vec<UseDefChain>,
    /// Definition and use sites per variable
    pub variables: BTreeMap<String, VariableSites>,
    /// Live-in/live-out per reachable block
    pub block_liveness: BTreeMap<NodeId, BlockLiveness>,
    /// Live range per variable
    pub live_ranges: BTreeMap<String, LiveRange>,
    /// Conflicts between variables
    pub interference: InterferenceGraph,
    /// Peak number of simultaneously live variables
    pub max_live_variables: usize,
}

impl DataFlowResult {
    /// Mean number of uses reached per definition.
    #[must_use]
    pub fn average_chain_length(&self) -> f64 {
        if self.def_use.is_empty() {
            return 0.0;
        }
        let total: usize = self.def_use.iter().map(|c| c.uses.len()).sum();
        total as f64 / self.def_use.len() as f64
    }
}

/// Entry point of the data flow analysis.
pub struct DataFlowAnalysis;

impl DataFlowAnalysis {
    /// Analyses the reachable blocks of `cfg`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ilscope::prelude::*;
    ///
    /// let x = IlValue::local("x", IlType::Byte);
    /// let mut builder = FunctionBuilder::new("main");
    /// builder
    ///     .store_variable(x.clone(), IlValue::byte(1))
    ///     .load_variable(IlValue::temp(0), x)
    ///     .ret(Some(IlValue::temp(0)));
    /// let cfg = ControlFlowGraph::build(&builder.build());
    ///
    /// let result = DataFlowAnalysis::analyze(&cfg, DataFlowPrecision::Precise);
    /// assert_eq!(result.def_use.len(), 2);
    /// assert_eq!(result.max_live_variables, 1);
    /// ```
    #[must_use]
    pub fn analyze(cfg: &ControlFlowGraph, precision: DataFlowPrecision) -> DataFlowResult {
        let reachable = cfg.reverse_postorder();
        let chains = reaching::reaching_definitions(cfg, &reachable);
        let liveness = liveness::live_variables(cfg, &reachable);

        let mut interference = InterferenceGraph::default();
        for name in chains.variables.keys() {
            interference.add_node(name);
        }

        let mut live_ranges = BTreeMap::new();
        let max_live_variables;

        match precision {
            DataFlowPrecision::Precise => {
                let mut live_points: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
                let mut peak = 0;
                for point in &liveness.instructions {
                    peak = peak.max(point.live_before.count()).max(point.live_after.count());
                    for v in point.live_before.iter() {
                        let span = live_points
                            .entry(liveness.names[v].as_str())
                            .or_insert((point.index, point.index));
                        span.0 = span.0.min(point.index);
                        span.1 = span.1.max(point.index);
                    }
                    if let Some(d) = point.def {
                        for other in point.live_after.iter() {
                            if other != d && Some(other) != point.copy_source {
                                interference.add_edge(&liveness.names[d], &liveness.names[other]);
                            }
                        }
                    }
                }
                max_live_variables = peak;

                for (name, sites) in &chains.variables {
                    let first = sites
                        .definitions
                        .iter()
                        .chain(sites.uses.iter())
                        .map(|l| l.index)
                        .min();
                    let last_use = sites.uses.iter().map(|l| l.index).max();
                    let Some(mut start) = first else {
                        continue;
                    };
                    let mut end = last_use.unwrap_or(start);
                    if let Some(&(lo, hi)) = live_points.get(name.as_str()) {
                        start = start.min(lo);
                        end = end.max(hi);
                    }
                    live_ranges.insert(name.clone(), LiveRange { start, end: end.max(start) });
                }
            }
            DataFlowPrecision::Coarse => {
                for (name, sites) in &chains.variables {
                    let first = sites
                        .definitions
                        .iter()
                        .chain(sites.uses.iter())
                        .map(|l| l.index)
                        .min();
                    let Some(start) = first else {
                        continue;
                    };
                    let end = sites.uses.iter().map(|l| l.index).max().unwrap_or(start);
                    live_ranges.insert(name.clone(), LiveRange { start, end: end.max(start) });
                }

                let ranges: Vec<(&String, &LiveRange)> = live_ranges.iter().collect();
                for (i, (a, ra)) in ranges.iter().enumerate() {
                    for (b, rb) in &ranges[i + 1..] {
                        if ra.overlaps(rb) {
                            interference.add_edge(a, b);
                        }
                    }
                }

                let mut events: BTreeMap<usize, isize> = BTreeMap::new();
                for range in live_ranges.values() {
                    *events.entry(range.start).or_default() += 1;
                    *events.entry(range.end + 1).or_default() -= 1;
                }
                let mut current = 0isize;
                let mut peak = 0isize;
                for delta in events.values() {
                    current += delta;
                    peak = peak.max(current);
                }
                max_live_variables = usize::try_from(peak).unwrap_or(0);
            }
        }

        DataFlowResult {
            precision,
            def_use: chains.def_use,
            use_def: chains.use_def,
            variables: chains.variables,
            block_liveness: liveness.blocks,
            live_ranges,
            interference,
            max_live_variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{FunctionBuilder, IlOpcode, IlType, IlValue};

    fn two_temps() -> ControlFlowGraph {
        // t0 and t1 overlap, t2 only starts once both are dead
        let mut builder = FunctionBuilder::new("sum");
        builder
            .load_immediate(IlValue::temp(0), IlValue::byte(1))
            .load_immediate(IlValue::temp(1), IlValue::byte(2))
            .binary(IlOpcode::Add, IlValue::temp(2), IlValue::temp(0), IlValue::temp(1))
            .ret(Some(IlValue::temp(2)));
        ControlFlowGraph::build(&builder.build())
    }

    #[test]
    fn test_precise_interference() {
        let result = DataFlowAnalysis::analyze(&two_temps(), DataFlowPrecision::Precise);

        assert!(result.interference.interferes("%t0", "%t1"));
        assert!(!result.interference.interferes("%t0", "%t2"));
        assert!(!result.interference.interferes("%t1", "%t2"));
        assert_eq!(result.max_live_variables, 2);
        assert_eq!(result.live_ranges["%t0"], LiveRange { start: 0, end: 2 });
        assert_eq!(result.live_ranges["%t2"], LiveRange { start: 2, end: 3 });
    }

    #[test]
    fn test_coarse_interference_uses_index_overlap() {
        let result = DataFlowAnalysis::analyze(&two_temps(), DataFlowPrecision::Coarse);

        // t0 [0,2] and t2 [2,3] share index 2
        assert!(result.interference.interferes("%t0", "%t2"));
        assert!(result.interference.interferes("%t0", "%t1"));
        assert_eq!(result.max_live_variables, 3);
    }

    #[test]
    fn test_copy_does_not_interfere_with_source() {
        let mut builder = FunctionBuilder::new("copy");
        builder
            .load_immediate(IlValue::temp(0), IlValue::byte(7))
            .copy(IlValue::temp(1), IlValue::temp(0))
            .binary(IlOpcode::Add, IlValue::temp(2), IlValue::temp(0), IlValue::temp(1))
            .ret(Some(IlValue::temp(2)));
        let result = DataFlowAnalysis::analyze(
            &ControlFlowGraph::build(&builder.build()),
            DataFlowPrecision::Precise,
        );
        assert!(!result.interference.interferes("%t0", "%t1"));
    }

    #[test]
    fn test_live_range_covers_loop() {
        let i = IlValue::local("i", IlType::Byte);
        let mut builder = FunctionBuilder::new("loop");
        builder
            .store_variable(i.clone(), IlValue::byte(0))
            .label("top")
            .binary(IlOpcode::CompareLt, IlValue::temp(0), i.clone(), IlValue::byte(10))
            .branch_if_false(IlValue::temp(0), "done")
            .binary(IlOpcode::Add, i.clone(), i.clone(), IlValue::byte(1))
            .branch("top")
            .label("done")
            .ret(None);
        let result = DataFlowAnalysis::analyze(
            &ControlFlowGraph::build(&builder.build()),
            DataFlowPrecision::Precise,
        );

        let range = result.live_ranges["i"];
        assert_eq!(range.start, 0);
        assert!(range.end >= 5);
        for site in &result.variables["i"].uses {
            assert!(range.start <= site.index && site.index <= range.end);
        }
    }

    #[test]
    fn test_unreachable_code_is_ignored() {
        let mut builder = FunctionBuilder::new("dead");
        builder
            .ret(None)
            .load_immediate(IlValue::temp(9), IlValue::byte(0))
            .ret(Some(IlValue::temp(9)));
        let result = DataFlowAnalysis::analyze(
            &ControlFlowGraph::build(&builder.build()),
            DataFlowPrecision::Precise,
        );
        assert!(result.variables.is_empty());
        assert_eq!(result.max_live_variables, 0);
    }
}
