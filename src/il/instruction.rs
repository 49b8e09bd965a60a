//! IL instructions.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::il::{IlOpcode, IlValue, PhysicalRegister};

/// 6502-family addressing modes, as hinted by the lowering stage.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AddressingMode {
    /// No operand
    Implied,
    /// `#$nn`
    Immediate,
    /// `$nn`
    ZeroPage,
    /// `$nn,X`
    ZeroPageX,
    /// `$nn,Y`
    ZeroPageY,
    /// `$nnnn`
    Absolute,
    /// `$nnnn,X`
    AbsoluteX,
    /// `$nnnn,Y`
    AbsoluteY,
    /// `($nnnn)`, jumps only
    Indirect,
    /// `($nn,X)`
    IndexedIndirect,
    /// `($nn),Y`
    IndirectIndexed,
    /// `($nn)`, 65C02 only
    ZeroPageIndirect,
    /// Branch offset
    Relative,
}

/// Source position the instruction was lowered from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file, if known
    pub file: Option<String>,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

/// Optional per-instruction hints for timing and optimisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionHints {
    /// Addressing mode the code generator intends to use
    pub addressing_mode: Option<AddressingMode>,
    /// Register the result should be kept in
    pub preferred_register: Option<PhysicalRegister>,
    /// The front end marked this instruction as performance critical
    pub hot_path: bool,
}

/// One IL instruction.
///
/// The `id` is unique and monotonically increasing within its function; it is assigned
/// by [`crate::il::FunctionBuilder`] and is independent of the instruction's position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IlInstruction {
    /// Per-function instruction id
    pub id: u32,
    /// Operation
    pub opcode: IlOpcode,
    /// Ordered operands, see [`IlOpcode::operand_layout`]
    pub operands: Vec<IlValue>,
    /// Explicit result destination (used by `Call`)
    pub result: Option<IlValue>,
    /// Source position
    pub source: Option<SourceLocation>,
    /// Timing and optimisation hints
    pub hints: Option<InstructionHints>,
}

impl IlInstruction {
    /// Creates an instruction without result, source or hints.
    #[must_use]
    pub fn new(id: u32, opcode: IlOpcode, operands: Vec<IlValue>) -> Self {
        IlInstruction {
            id,
            opcode,
            operands,
            result: None,
            source: None,
            hints: None,
        }
    }

    /// The value this instruction writes, if any.
    ///
    /// The explicit `result` wins; otherwise operand 0 of a defining opcode.
    #[must_use]
    pub fn definition(&self) -> Option<&IlValue> {
        if let Some(result) = &self.result {
            return Some(result);
        }
        if self.opcode.defines_first_operand() {
            return self.operands.first();
        }
        None
    }

    /// Index of the first operand that is read rather than written.
    #[must_use]
    pub fn first_read_operand(&self) -> usize {
        usize::from(self.result.is_none() && self.opcode.defines_first_operand())
    }

    /// Label named by a branch instruction.
    #[must_use]
    pub fn branch_target(&self) -> Option<&str> {
        match self.opcode {
            IlOpcode::Branch => self.operands.first().and_then(IlValue::as_label),
            IlOpcode::BranchIfTrue | IlOpcode::BranchIfFalse => {
                self.operands.get(1).and_then(IlValue::as_label)
            }
            _ => None,
        }
    }

    /// Label defined by a `Label` instruction.
    #[must_use]
    pub fn label_name(&self) -> Option<&str> {
        if self.opcode == IlOpcode::Label {
            self.operands.first().and_then(IlValue::as_label)
        } else {
            None
        }
    }

    /// Returns `true` if the operand count matches the opcode layout.
    #[must_use]
    pub fn has_valid_arity(&self) -> bool {
        self.opcode.operand_layout().accepts(self.operands.len())
    }

    /// Number of operands addressed in memory.
    #[must_use]
    pub fn memory_operand_count(&self) -> usize {
        self.operands
            .iter()
            .chain(self.result.iter())
            .filter(|v| v.is_memory_operand())
            .count()
    }

    /// Addressing mode hint, if any.
    #[must_use]
    pub fn addressing_mode(&self) -> Option<AddressingMode> {
        self.hints.as_ref().and_then(|h| h.addressing_mode)
    }

    /// Preferred register hint, if any.
    #[must_use]
    pub fn preferred_register(&self) -> Option<PhysicalRegister> {
        self.hints.as_ref().and_then(|h| h.preferred_register)
    }
}

impl fmt::Display for IlInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (index, operand) in self.operands.iter().enumerate() {
            let sep = if index == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        if let Some(result) = &self.result {
            write!(f, " -> {result}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::IlType;

    #[test]
    fn test_definition_from_first_operand() {
        let add = IlInstruction::new(
            0,
            IlOpcode::Add,
            vec![IlValue::temp(1), IlValue::temp(0), IlValue::byte(1)],
        );
        assert_eq!(add.definition(), Some(&IlValue::temp(1)));
        assert_eq!(add.first_read_operand(), 1);
    }

    #[test]
    fn test_call_result_is_the_definition() {
        let mut call = IlInstruction::new(0, IlOpcode::Call, vec![IlValue::label("getc")]);
        assert_eq!(call.definition(), None);
        call.result = Some(IlValue::local("ch", IlType::Byte));
        assert_eq!(call.definition(), Some(&IlValue::local("ch", IlType::Byte)));
        assert_eq!(call.first_read_operand(), 0);
    }

    #[test]
    fn test_branch_targets() {
        let jump = IlInstruction::new(0, IlOpcode::Branch, vec![IlValue::label("end")]);
        let cond = IlInstruction::new(
            1,
            IlOpcode::BranchIfFalse,
            vec![IlValue::temp(0), IlValue::label("else")],
        );
        assert_eq!(jump.branch_target(), Some("end"));
        assert_eq!(cond.branch_target(), Some("else"));
    }

    #[test]
    fn test_display() {
        let store = IlInstruction::new(
            4,
            IlOpcode::StoreVariable,
            vec![IlValue::local("x", IlType::Byte), IlValue::temp(2)],
        );
        assert_eq!(store.to_string(), "STORE_VARIABLE x, %t2");
    }
}
