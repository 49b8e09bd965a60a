//! Explicit construction of IL functions.
//!
//! [`FunctionBuilder`] owns the instruction arena and the [`InstructionIdGenerator`] of one
//! function. Every call to [`FunctionBuilder::build`] returns an independent snapshot, so
//! the analyses never share a mutable instruction list with the builder.

use crate::il::{
    IlFunction, IlInstruction, IlOpcode, IlType, IlValue, InstructionHints, Parameter,
    SourceLocation, StorageClass, VariableDecl,
};

/// Hands out per-function instruction ids.
///
/// Ids start at 0 and increase by one per instruction. The generator is owned by one
/// builder; there is no process-wide counter.
#[derive(Debug, Clone, Default)]
pub struct InstructionIdGenerator {
    next: u32,
}

impl InstructionIdGenerator {
    /// Creates a generator starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.next
    }
}

/// Builder for [`IlFunction`].
///
/// # Examples
///
/// ```rust
/// use ilscope::il::{FunctionBuilder, IlOpcode, IlType, IlValue};
///
/// let x = IlValue::local("x", IlType::Byte);
/// let mut builder = FunctionBuilder::new("main");
/// builder
///     .load_immediate(IlValue::temp(0), IlValue::byte(42))
///     .binary(IlOpcode::Add, IlValue::temp(1), IlValue::temp(0), IlValue::byte(1))
///     .store_variable(x, IlValue::temp(1))
///     .ret(None);
///
/// let function = builder.build();
/// assert_eq!(function.instructions.len(), 4);
/// assert_eq!(function.instructions[3].id, 3);
/// ```
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    function: IlFunction,
    ids: InstructionIdGenerator,
}

impl FunctionBuilder {
    /// Starts a new function.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        FunctionBuilder {
            function: IlFunction::new(name),
            ids: InstructionIdGenerator::new(),
        }
    }

    /// Adds a parameter.
    pub fn parameter(&mut self, name: impl Into<String>, ty: IlType) -> &mut Self {
        self.function.parameters.push(Parameter {
            name: name.into(),
            ty,
        });
        self
    }

    /// Sets the return type.
    pub fn returns(&mut self, ty: IlType) -> &mut Self {
        self.function.return_type = ty;
        self
    }

    /// Declares a local variable.
    pub fn local(
        &mut self,
        name: impl Into<String>,
        ty: IlType,
        allocation: StorageClass,
    ) -> &mut Self {
        self.function.locals.push(VariableDecl {
            name: name.into(),
            ty,
            allocation,
        });
        self
    }

    /// Marks the function as an interrupt handler.
    pub fn interrupt_handler(&mut self, is_handler: bool) -> &mut Self {
        self.function.is_interrupt_handler = is_handler;
        self
    }

    /// Appends an instruction with the given operands.
    pub fn emit(&mut self, opcode: IlOpcode, operands: Vec<IlValue>) -> &mut Self {
        let id = self.ids.next_id();
        self.function
            .instructions
            .push(IlInstruction::new(id, opcode, operands));
        self
    }

    /// Attaches hints to the most recently emitted instruction.
    pub fn with_hints(&mut self, hints: InstructionHints) -> &mut Self {
        if let Some(last) = self.function.instructions.last_mut() {
            last.hints = Some(hints);
        }
        self
    }

    /// Attaches a source location to the most recently emitted instruction.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        if let Some(last) = self.function.instructions.last_mut() {
            last.source = Some(SourceLocation {
                file: None,
                line,
                column,
            });
        }
        self
    }

    /// `dest = constant`
    pub fn load_immediate(&mut self, dest: IlValue, constant: IlValue) -> &mut Self {
        self.emit(IlOpcode::LoadImmediate, vec![dest, constant])
    }

    /// `dest = variable`
    pub fn load_variable(&mut self, dest: IlValue, variable: IlValue) -> &mut Self {
        self.emit(IlOpcode::LoadVariable, vec![dest, variable])
    }

    /// `variable = src`
    pub fn store_variable(&mut self, variable: IlValue, src: IlValue) -> &mut Self {
        self.emit(IlOpcode::StoreVariable, vec![variable, src])
    }

    /// `dest = array[index]`
    pub fn load_array(&mut self, dest: IlValue, array: IlValue, index: IlValue) -> &mut Self {
        self.emit(IlOpcode::LoadArray, vec![dest, array, index])
    }

    /// `array[index] = value`
    pub fn store_array(&mut self, array: IlValue, index: IlValue, value: IlValue) -> &mut Self {
        self.emit(IlOpcode::StoreArray, vec![array, index, value])
    }

    /// `dest = src`
    pub fn copy(&mut self, dest: IlValue, src: IlValue) -> &mut Self {
        self.emit(IlOpcode::Copy, vec![dest, src])
    }

    /// Binary operation `dest = left op right` (arithmetic, logical, bitwise, shift, compare).
    pub fn binary(
        &mut self,
        opcode: IlOpcode,
        dest: IlValue,
        left: IlValue,
        right: IlValue,
    ) -> &mut Self {
        self.emit(opcode, vec![dest, left, right])
    }

    /// Unary operation `dest = op src`.
    pub fn unary(&mut self, opcode: IlOpcode, dest: IlValue, src: IlValue) -> &mut Self {
        self.emit(opcode, vec![dest, src])
    }

    /// Unconditional branch.
    pub fn branch(&mut self, label: &str) -> &mut Self {
        self.emit(IlOpcode::Branch, vec![IlValue::label(label)])
    }

    /// Branch when `condition` holds.
    pub fn branch_if_true(&mut self, condition: IlValue, label: &str) -> &mut Self {
        self.emit(IlOpcode::BranchIfTrue, vec![condition, IlValue::label(label)])
    }

    /// Branch when `condition` does not hold.
    pub fn branch_if_false(&mut self, condition: IlValue, label: &str) -> &mut Self {
        self.emit(IlOpcode::BranchIfFalse, vec![condition, IlValue::label(label)])
    }

    /// Subroutine call with an optional result destination.
    pub fn call(&mut self, callee: &str, args: Vec<IlValue>, result: Option<IlValue>) -> &mut Self {
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(IlValue::label(callee));
        operands.extend(args);
        self.emit(IlOpcode::Call, operands);
        if let Some(last) = self.function.instructions.last_mut() {
            last.result = result;
        }
        self
    }

    /// Return, optionally with a value.
    pub fn ret(&mut self, value: Option<IlValue>) -> &mut Self {
        self.emit(IlOpcode::Return, value.into_iter().collect())
    }

    /// Label definition.
    pub fn label(&mut self, name: &str) -> &mut Self {
        self.emit(IlOpcode::Label, vec![IlValue::label(name)])
    }

    /// `dest = memory[address]`
    pub fn peek(&mut self, dest: IlValue, address: IlValue) -> &mut Self {
        self.emit(IlOpcode::Peek, vec![dest, address])
    }

    /// `memory[address] = value`
    pub fn poke(&mut self, address: IlValue, value: IlValue) -> &mut Self {
        self.emit(IlOpcode::Poke, vec![address, value])
    }

    /// Sets a status flag (`carry`, `decimal`, `interrupt`, `overflow`).
    pub fn set_flag(&mut self, flag: &str) -> &mut Self {
        self.emit(IlOpcode::SetFlag, vec![IlValue::label(flag)])
    }

    /// Clears a status flag.
    pub fn clear_flag(&mut self, flag: &str) -> &mut Self {
        self.emit(IlOpcode::ClearFlag, vec![IlValue::label(flag)])
    }

    /// No operation.
    pub fn nop(&mut self) -> &mut Self {
        self.emit(IlOpcode::Nop, Vec::new())
    }

    /// Returns an immutable snapshot of the function built so far.
    #[must_use]
    pub fn build(&self) -> IlFunction {
        self.function.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_per_builder() {
        let mut first = FunctionBuilder::new("a");
        let mut second = FunctionBuilder::new("b");
        first.nop().nop();
        second.nop();

        let a = first.build();
        let b = second.build();
        assert_eq!(a.instructions.iter().map(|i| i.id).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(b.instructions[0].id, 0);
    }

    #[test]
    fn test_snapshots_are_independent() {
        let mut builder = FunctionBuilder::new("main");
        builder.nop();
        let snapshot = builder.build();
        builder.ret(None);

        assert_eq!(snapshot.instructions.len(), 1);
        assert_eq!(builder.build().instructions.len(), 2);
    }

    #[test]
    fn test_call_records_result() {
        let mut builder = FunctionBuilder::new("main");
        builder.call("getc", vec![], Some(IlValue::temp(0)));
        let function = builder.build();
        assert_eq!(function.instructions[0].result, Some(IlValue::temp(0)));
        assert_eq!(function.instructions[0].operands, vec![IlValue::label("getc")]);
    }
}
