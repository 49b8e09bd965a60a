use crate::{
    analysis::ControlFlowAnalysisResult,
    error::analysis_error,
    il::IlFunction,
    timing::{CycleTable, HardwareAnalyzer},
    Result,
};

/// Per-instruction facts shared by the timing sub-analyses.
pub(crate) struct FunctionContext<'a> {
    pub function: &'a IlFunction,
    pub analysis: &'a ControlFlowAnalysisResult,
    pub analyzer: &'a dyn HardwareAnalyzer,
    pub table: CycleTable,
    /// Loop depth of each instruction
    pub depths: Vec<usize>,
    /// Cycle cost of each instruction
    pub cycles: Vec<u32>,
}

impl<'a> FunctionContext<'a> {
    /// Fails when `analysis` was not computed from `function`.
    pub fn new(
        function: &'a IlFunction,
        analysis: &'a ControlFlowAnalysisResult,
        analyzer: &'a dyn HardwareAnalyzer,
    ) -> Result<Self> {
        if analysis.function_name != function.name {
            return Err(analysis_error!(
                "control flow result of '{}' passed for function '{}'",
                analysis.function_name,
                function.name
            ));
        }

        let count = function.instructions.len();
        if analysis.cfg.instruction_count() != count {
            return Err(analysis_error!(
                "control flow graph covers {} instructions, function '{}' has {}",
                analysis.cfg.instruction_count(),
                function.name,
                count
            ));
        }

        let mut depths = vec![0; count];
        for block in analysis.cfg.blocks() {
            if block.end > count || block.start > block.end {
                return Err(analysis_error!(
                    "block {} spans {}..{} outside of {} instructions",
                    block.id,
                    block.start,
                    block.end,
                    count
                ));
            }
            let depth = analysis.loop_depth(block.id);
            for slot in &mut depths[block.start..block.end] {
                *slot = depth;
            }
        }

        let cycles = function
            .instructions
            .iter()
            .map(|i| analyzer.instruction_cycles(i))
            .collect();

        Ok(FunctionContext {
            function,
            analysis,
            analyzer,
            table: analyzer.cycle_table(),
            depths,
            cycles,
        })
    }

    pub fn total_cycles(&self) -> u64 {
        self.cycles.iter().map(|&c| u64::from(c)).sum()
    }
}
