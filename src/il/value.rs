//! IL operand and result values.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Semantic type of an IL value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IlType {
    /// No value
    Void,
    /// Unsigned 8-bit value
    Byte,
    /// Unsigned 16-bit value
    Word,
    /// Boolean, stored as a byte
    Boolean,
    /// 16-bit address
    Pointer,
    /// Fixed-length array
    Array {
        /// Element type
        element: Box<IlType>,
        /// Number of elements
        length: u16,
    },
}

impl IlType {
    /// Fixed-length array of `element`.
    #[must_use]
    pub fn array(element: IlType, length: u16) -> Self {
        IlType::Array {
            element: Box::new(element),
            length,
        }
    }

    /// Storage size in bytes on the target.
    #[must_use]
    pub fn size_bytes(&self) -> u32 {
        match self {
            IlType::Void => 0,
            IlType::Byte | IlType::Boolean => 1,
            IlType::Word | IlType::Pointer => 2,
            IlType::Array { element, length } => element.size_bytes() * u32::from(*length),
        }
    }

    /// Returns `true` for 16-bit types, which cost two 8-bit operations each.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        matches!(self, IlType::Word | IlType::Pointer)
    }
}

/// Storage-class preference attached to a variable by the front end.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StorageHint {
    /// No preference
    #[default]
    Auto,
    /// Prefer a zero-page slot
    ZeroPage,
    /// Prefer a processor register
    Register,
    /// Prefer general RAM
    Ram,
}

/// Visibility scope of a named variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VariableScope {
    /// Module-level variable
    Global,
    /// Function-local variable
    Local,
    /// Compiler-introduced named temporary
    Temporary,
}

/// Lifetime tier of a compiler temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemporaryScope {
    /// Lives within one expression
    Expression,
    /// Lives within one statement
    Statement,
    /// Lives within one basic block
    Block,
    /// Lives for the whole function
    Function,
}

/// Physical 6502 registers available to the allocator.
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
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum PhysicalRegister {
    /// Accumulator
    A,
    /// X index register
    X,
    /// Y index register
    Y,
}

/// A typed literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IlConstant {
    /// Semantic type
    pub ty: IlType,
    /// Literal value
    pub value: i32,
}

impl IlConstant {
    /// Returns `true` if the value is a positive power of two.
    #[must_use]
    pub fn is_power_of_two(&self) -> bool {
        self.value > 0 && (self.value as u32).is_power_of_two()
    }
}

/// A named variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IlVariable {
    /// Qualified name, e.g. `main.counter` or `screen_base`
    pub name: String,
    /// Semantic type
    pub ty: IlType,
    /// Storage preference
    pub storage: StorageHint,
    /// Visibility scope
    pub scope: VariableScope,
}

/// A compiler temporary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IlTemporary {
    /// Numeric id, unique within the function
    pub id: u32,
    /// Semantic type
    pub ty: IlType,
    /// Lifetime tier
    pub scope: TemporaryScope,
}

/// An absolute memory address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryLocation {
    /// 16-bit address
    pub address: u16,
    /// Type of the value stored there
    pub ty: IlType,
}

impl MemoryLocation {
    /// Returns `true` for addresses inside page zero.
    #[must_use]
    pub fn is_zero_page(&self) -> bool {
        self.address < 0x100
    }
}

/// An IL operand or result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IlValue {
    /// Literal constant
    Constant(IlConstant),
    /// Named variable
    Variable(IlVariable),
    /// Physical register
    Register(PhysicalRegister),
    /// Compiler temporary
    Temporary(IlTemporary),
    /// Absolute memory address
    Memory(MemoryLocation),
    /// Label name (branch target, callee or flag name)
    Label(String),
}

impl IlValue {
    /// Byte constant.
    #[must_use]
    pub fn byte(value: u8) -> Self {
        IlValue::Constant(IlConstant {
            ty: IlType::Byte,
            value: i32::from(value),
        })
    }

    /// Word constant.
    #[must_use]
    pub fn word(value: u16) -> Self {
        IlValue::Constant(IlConstant {
            ty: IlType::Word,
            value: i32::from(value),
        })
    }

    /// Boolean constant.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        IlValue::Constant(IlConstant {
            ty: IlType::Boolean,
            value: i32::from(value),
        })
    }

    /// Function-local variable without storage preference.
    #[must_use]
    pub fn local(name: impl Into<String>, ty: IlType) -> Self {
        IlValue::Variable(IlVariable {
            name: name.into(),
            ty,
            storage: StorageHint::Auto,
            scope: VariableScope::Local,
        })
    }

    /// Module-level variable without storage preference.
    #[must_use]
    pub fn global(name: impl Into<String>, ty: IlType) -> Self {
        IlValue::Variable(IlVariable {
            name: name.into(),
            ty,
            storage: StorageHint::Auto,
            scope: VariableScope::Global,
        })
    }

    /// Byte temporary with expression scope.
    #[must_use]
    pub fn temp(id: u32) -> Self {
        IlValue::Temporary(IlTemporary {
            id,
            ty: IlType::Byte,
            scope: TemporaryScope::Expression,
        })
    }

    /// Physical register.
    #[must_use]
    pub fn register(register: PhysicalRegister) -> Self {
        IlValue::Register(register)
    }

    /// Byte at an absolute address.
    #[must_use]
    pub fn memory(address: u16) -> Self {
        IlValue::Memory(MemoryLocation {
            address,
            ty: IlType::Byte,
        })
    }

    /// Label reference.
    #[must_use]
    pub fn label(name: impl Into<String>) -> Self {
        IlValue::Label(name.into())
    }

    /// Key identifying the storage this value names, for data-flow tracking.
    ///
    /// Variables are keyed by their qualified name and temporaries by `%t<id>`. Every
    /// other value kind is not tracked and yields `None`.
    #[must_use]
    pub fn variable_key(&self) -> Option<String> {
        match self {
            IlValue::Variable(var) => Some(var.name.clone()),
            IlValue::Temporary(temp) => Some(format!("%t{}", temp.id)),
            IlValue::Constant(_)
            | IlValue::Register(_)
            | IlValue::Memory(_)
            | IlValue::Label(_) => None,
        }
    }

    /// Returns the constant if this is one.
    #[must_use]
    pub fn as_constant(&self) -> Option<&IlConstant> {
        match self {
            IlValue::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    /// Returns the label name if this is a label.
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            IlValue::Label(name) => Some(name),
            _ => None,
        }
    }

    /// Returns `true` for operands the target addresses in memory.
    ///
    /// Named variables and absolute addresses live in memory; registers, constants and
    /// temporaries do not (temporaries are assumed to stay in registers).
    #[must_use]
    pub fn is_memory_operand(&self) -> bool {
        matches!(self, IlValue::Variable(_) | IlValue::Memory(_))
    }

    /// Returns `true` for variables with global scope.
    #[must_use]
    pub fn is_global_variable(&self) -> bool {
        matches!(self, IlValue::Variable(var) if var.scope == VariableScope::Global)
    }

    /// Semantic type of the value. Labels are `Void`.
    #[must_use]
    pub fn ty(&self) -> IlType {
        match self {
            IlValue::Constant(c) => c.ty.clone(),
            IlValue::Variable(v) => v.ty.clone(),
            IlValue::Register(_) => IlType::Byte,
            IlValue::Temporary(t) => t.ty.clone(),
            IlValue::Memory(m) => m.ty.clone(),
            IlValue::Label(_) => IlType::Void,
        }
    }
}

impl fmt::Display for IlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IlValue::Constant(c) => write!(f, "#{}", c.value),
            IlValue::Variable(v) => write!(f, "{}", v.name),
            IlValue::Register(r) => write!(f, "{r}"),
            IlValue::Temporary(t) => write!(f, "%t{}", t.id),
            IlValue::Memory(m) => write!(f, "${:04X}", m.address),
            IlValue::Label(name) => write!(f, "@{name}"),
        }
    }
}
