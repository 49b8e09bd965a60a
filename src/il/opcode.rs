//! The closed IL opcode set and its static properties.
//!
//! Every analysis matches on [`IlOpcode`] exhaustively: the CFG builder uses the
//! control-transfer classification, the data-flow analyzer the definition classification,
//! the timing tables the per-opcode cycle costs, and the quality engine the categories.
//! Adding an opcode is therefore a compile-time checked change across the crate.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// Operation performed by an [`crate::il::IlInstruction`].
///
/// Operand layouts are fixed per opcode, see [`IlOpcode::operand_layout`].
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IlOpcode {
    /// `dest = left + right`
    Add,
    /// `dest = left - right`
    Sub,
    /// `dest = left * right`, a software routine on every supported variant
    Mul,
    /// `dest = left / right`, a software routine on every supported variant
    Div,
    /// `dest = left % right`
    Mod,
    /// `dest = -src`
    Neg,
    /// `dest = left && right`
    LogicalAnd,
    /// `dest = left || right`
    LogicalOr,
    /// `dest = !src`
    LogicalNot,
    /// `dest = left & right`
    BitwiseAnd,
    /// `dest = left | right`
    BitwiseOr,
    /// `dest = left ^ right`
    BitwiseXor,
    /// `dest = ~src`
    BitwiseNot,
    /// `dest = left << right`
    ShiftLeft,
    /// `dest = left >> right`
    ShiftRight,
    /// `dest = left == right`
    CompareEq,
    /// `dest = left != right`
    CompareNe,
    /// `dest = left < right`
    CompareLt,
    /// `dest = left <= right`
    CompareLe,
    /// `dest = left > right`
    CompareGt,
    /// `dest = left >= right`
    CompareGe,
    /// Unconditional jump to a label
    Branch,
    /// Jump to a label when the condition holds
    BranchIfTrue,
    /// Jump to a label when the condition does not hold
    BranchIfFalse,
    /// Subroutine call, execution continues with the next instruction
    Call,
    /// Return from the function, optionally with a value
    Return,
    /// `dest = constant`
    LoadImmediate,
    /// `dest = variable`
    LoadVariable,
    /// `variable = src`
    StoreVariable,
    /// `dest = array[index]`
    LoadArray,
    /// `array[index] = value`
    StoreArray,
    /// `dest = src`
    Copy,
    /// Branch target marker
    Label,
    /// `dest = memory[address]`
    Peek,
    /// `memory[address] = value`
    Poke,
    /// Set a processor status flag
    SetFlag,
    /// Clear a processor status flag
    ClearFlag,
    /// No operation
    Nop,
    /// Source-level comment, emits no code
    Comment,
}

/// Coarse classification of opcodes used by the metrics engine.
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
pub enum OpcodeCategory {
    /// Add, subtract, multiply, divide, modulo, negate
    Arithmetic,
    /// Boolean connectives
    Logical,
    /// Bitwise and/or/xor/not
    Bitwise,
    /// Shifts
    Shift,
    /// Comparisons producing a boolean
    Comparison,
    /// Branches, calls and returns
    ControlFlow,
    /// Loads, stores and copies
    DataMovement,
    /// Labels
    Label,
    /// Direct hardware access (peek/poke, status flags)
    Hardware,
    /// No-ops and comments
    Meta,
}

/// Allowed operand count range for an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandLayout {
    /// Minimum number of operands
    pub min: usize,
    /// Maximum number of operands, `None` for variadic opcodes
    pub max: Option<usize>,
}

impl OperandLayout {
    const fn exact(count: usize) -> Self {
        OperandLayout {
            min: count,
            max: Some(count),
        }
    }

    /// Returns `true` if `count` operands satisfy this layout.
    #[must_use]
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl IlOpcode {
    /// Returns the category of this opcode.
    #[must_use]
    pub const fn category(self) -> OpcodeCategory {
        match self {
            IlOpcode::Add
            | IlOpcode::Sub
            | IlOpcode::Mul
            | IlOpcode::Div
            | IlOpcode::Mod
            | IlOpcode::Neg => OpcodeCategory::Arithmetic,
            IlOpcode::LogicalAnd | IlOpcode::LogicalOr | IlOpcode::LogicalNot => {
                OpcodeCategory::Logical
            }
            IlOpcode::BitwiseAnd
            | IlOpcode::BitwiseOr
            | IlOpcode::BitwiseXor
            | IlOpcode::BitwiseNot => OpcodeCategory::Bitwise,
            IlOpcode::ShiftLeft | IlOpcode::ShiftRight => OpcodeCategory::Shift,
            IlOpcode::CompareEq
            | IlOpcode::CompareNe
            | IlOpcode::CompareLt
            | IlOpcode::CompareLe
            | IlOpcode::CompareGt
            | IlOpcode::CompareGe => OpcodeCategory::Comparison,
            IlOpcode::Branch
            | IlOpcode::BranchIfTrue
            | IlOpcode::BranchIfFalse
            | IlOpcode::Call
            | IlOpcode::Return => OpcodeCategory::ControlFlow,
            IlOpcode::LoadImmediate
            | IlOpcode::LoadVariable
            | IlOpcode::StoreVariable
            | IlOpcode::LoadArray
            | IlOpcode::StoreArray
            | IlOpcode::Copy => OpcodeCategory::DataMovement,
            IlOpcode::Label => OpcodeCategory::Label,
            IlOpcode::Peek | IlOpcode::Poke | IlOpcode::SetFlag | IlOpcode::ClearFlag => {
                OpcodeCategory::Hardware
            }
            IlOpcode::Nop | IlOpcode::Comment => OpcodeCategory::Meta,
        }
    }

    /// Operand counts accepted for this opcode.
    ///
    /// | Opcodes | Operands |
    /// |---------|----------|
    /// | binary arithmetic, logical, bitwise, shift, compare | `[dest, left, right]` |
    /// | `Neg`, `LogicalNot`, `BitwiseNot`, `Copy` | `[dest, src]` |
    /// | `LoadImmediate` | `[dest, constant]` |
    /// | `LoadVariable` | `[dest, variable]` |
    /// | `StoreVariable` | `[variable, src]` |
    /// | `LoadArray` | `[dest, array, index]` |
    /// | `StoreArray` | `[array, index, value]` |
    /// | `Branch` | `[label]` |
    /// | `BranchIfTrue`, `BranchIfFalse` | `[condition, label]` |
    /// | `Call` | `[callee, args...]` |
    /// | `Return` | `[]` or `[value]` |
    /// | `Label` | `[label]` |
    /// | `Peek` | `[dest, address]` |
    /// | `Poke` | `[address, value]` |
    /// | `SetFlag`, `ClearFlag` | `[flag]` |
    /// | `Nop` | `[]` |
    /// | `Comment` | `[]` or `[text]` |
    #[must_use]
    pub const fn operand_layout(self) -> OperandLayout {
        match self {
            IlOpcode::Add
            | IlOpcode::Sub
            | IlOpcode::Mul
            | IlOpcode::Div
            | IlOpcode::Mod
            | IlOpcode::LogicalAnd
            | IlOpcode::LogicalOr
            | IlOpcode::BitwiseAnd
            | IlOpcode::BitwiseOr
            | IlOpcode::BitwiseXor
            | IlOpcode::ShiftLeft
            | IlOpcode::ShiftRight
            | IlOpcode::CompareEq
            | IlOpcode::CompareNe
            | IlOpcode::CompareLt
            | IlOpcode::CompareLe
            | IlOpcode::CompareGt
            | IlOpcode::CompareGe
            | IlOpcode::LoadArray
            | IlOpcode::StoreArray => OperandLayout::exact(3),
            IlOpcode::Neg
            | IlOpcode::LogicalNot
            | IlOpcode::BitwiseNot
            | IlOpcode::Copy
            | IlOpcode::LoadImmediate
            | IlOpcode::LoadVariable
            | IlOpcode::StoreVariable
            | IlOpcode::BranchIfTrue
            | IlOpcode::BranchIfFalse
            | IlOpcode::Peek
            | IlOpcode::Poke => OperandLayout::exact(2),
            IlOpcode::Branch | IlOpcode::Label | IlOpcode::SetFlag | IlOpcode::ClearFlag => {
                OperandLayout::exact(1)
            }
            IlOpcode::Call => OperandLayout { min: 1, max: None },
            IlOpcode::Return | IlOpcode::Comment => OperandLayout {
                min: 0,
                max: Some(1),
            },
            IlOpcode::Nop => OperandLayout::exact(0),
        }
    }

    /// Returns `true` for jumps: `Branch`, `BranchIfTrue` and `BranchIfFalse`.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            IlOpcode::Branch | IlOpcode::BranchIfTrue | IlOpcode::BranchIfFalse
        )
    }

    /// Returns `true` for `BranchIfTrue` and `BranchIfFalse`.
    #[must_use]
    pub const fn is_conditional_branch(self) -> bool {
        matches!(self, IlOpcode::BranchIfTrue | IlOpcode::BranchIfFalse)
    }

    /// Returns `true` if the instruction after this one starts a new basic block.
    #[must_use]
    pub const fn ends_block(self) -> bool {
        self.is_branch() || matches!(self, IlOpcode::Call | IlOpcode::Return)
    }

    /// Returns `true` if operand 0 is written by this opcode.
    ///
    /// This is the case for arithmetic, logical, bitwise, shift and comparison results,
    /// for the load family, `Copy`, `StoreVariable` and `Peek`.
    #[must_use]
    pub const fn defines_first_operand(self) -> bool {
        match self.category() {
            OpcodeCategory::Arithmetic
            | OpcodeCategory::Logical
            | OpcodeCategory::Bitwise
            | OpcodeCategory::Shift
            | OpcodeCategory::Comparison => true,
            OpcodeCategory::DataMovement => !matches!(self, IlOpcode::StoreArray),
            OpcodeCategory::Hardware => matches!(self, IlOpcode::Peek),
            OpcodeCategory::ControlFlow | OpcodeCategory::Label | OpcodeCategory::Meta => false,
        }
    }

    /// Returns `true` if the opcode reads or writes memory on the target.
    #[must_use]
    pub const fn is_memory_access(self) -> bool {
        matches!(
            self,
            IlOpcode::LoadVariable
                | IlOpcode::StoreVariable
                | IlOpcode::LoadArray
                | IlOpcode::StoreArray
                | IlOpcode::Peek
                | IlOpcode::Poke
        )
    }

    /// Returns `true` for indexed array accesses.
    #[must_use]
    pub const fn is_array_access(self) -> bool {
        matches!(self, IlOpcode::LoadArray | IlOpcode::StoreArray)
    }

    /// Returns `true` for opcodes that generate no machine code.
    #[must_use]
    pub const fn is_pseudo(self) -> bool {
        matches!(self, IlOpcode::Label | IlOpcode::Comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_display_uses_screaming_snake_case() {
        assert_eq!(IlOpcode::LoadImmediate.to_string(), "LOAD_IMMEDIATE");
        assert_eq!(IlOpcode::BranchIfFalse.to_string(), "BRANCH_IF_FALSE");
        assert_eq!("COMPARE_LT".parse::<IlOpcode>(), Ok(IlOpcode::CompareLt));
    }

    #[test]
    fn test_block_terminators() {
        let terminators: Vec<IlOpcode> = IlOpcode::iter().filter(|op| op.ends_block()).collect();
        assert_eq!(
            terminators,
            vec![
                IlOpcode::Branch,
                IlOpcode::BranchIfTrue,
                IlOpcode::BranchIfFalse,
                IlOpcode::Call,
                IlOpcode::Return
            ]
        );
    }

    #[test]
    fn test_definition_classification() {
        assert!(IlOpcode::Add.defines_first_operand());
        assert!(IlOpcode::StoreVariable.defines_first_operand());
        assert!(IlOpcode::Peek.defines_first_operand());
        assert!(!IlOpcode::StoreArray.defines_first_operand());
        assert!(!IlOpcode::Poke.defines_first_operand());
        assert!(!IlOpcode::Call.defines_first_operand());
    }

    #[test]
    fn test_operand_layouts() {
        assert!(IlOpcode::Add.operand_layout().accepts(3));
        assert!(!IlOpcode::Add.operand_layout().accepts(2));
        assert!(IlOpcode::Call.operand_layout().accepts(5));
        assert!(!IlOpcode::Call.operand_layout().accepts(0));
        assert!(IlOpcode::Return.operand_layout().accepts(0));
        assert!(IlOpcode::Return.operand_layout().accepts(1));
        assert!(!IlOpcode::Nop.operand_layout().accepts(1));
    }
}
