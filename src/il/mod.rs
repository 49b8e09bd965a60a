//! The IL program model.
//!
//! The analyses consume IL produced by the (external) AST lowering stage. The model is a
//! small closed instruction set over typed values:
//!
//! - [`IlOpcode`] - Closed opcode set with static control-transfer and definition properties
//! - [`IlValue`] - Operand kinds: constants, variables, registers, temporaries, memory, labels
//! - [`IlInstruction`] - Opcode, operands, optional result, source location and hints
//! - [`IlFunction`], [`IlModule`], [`IlProgram`] - Containers
//! - [`FunctionBuilder`] - Explicit builder returning immutable snapshots

mod builder;
mod function;
mod instruction;
mod opcode;
mod value;

pub use builder::{FunctionBuilder, InstructionIdGenerator};
pub use function::{IlFunction, IlModule, IlProgram, Parameter, StorageClass, VariableDecl};
pub use instruction::{AddressingMode, IlInstruction, InstructionHints, SourceLocation};
pub use opcode::{IlOpcode, OpcodeCategory, OperandLayout};
pub use value::{
    IlConstant, IlTemporary, IlType, IlValue, IlVariable, MemoryLocation, PhysicalRegister,
    StorageHint, TemporaryScope, VariableScope,
};
