//! IL functions, modules and programs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::il::{IlInstruction, IlType};

/// Where a declared variable is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StorageClass {
    /// Kept in a processor register
    Register,
    /// Zero-page slot
    ZeroPage,
    /// Hardware stack
    Stack,
    /// General RAM
    Ram,
}

/// A declared local or global variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableDecl {
    /// Qualified name
    pub name: String,
    /// Declared type
    pub ty: IlType,
    /// Allocation class
    pub allocation: StorageClass,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: IlType,
}

/// An IL function, the unit every analysis runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IlFunction {
    /// Function name
    pub name: String,
    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,
    /// Return type
    pub return_type: IlType,
    /// Instruction sequence
    pub instructions: Vec<IlInstruction>,
    /// Declared locals
    pub locals: Vec<VariableDecl>,
    /// The function runs as an interrupt service routine
    pub is_interrupt_handler: bool,
}

impl IlFunction {
    /// Creates an empty function returning `Void`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        IlFunction {
            name: name.into(),
            parameters: Vec::new(),
            return_type: IlType::Void,
            instructions: Vec::new(),
            locals: Vec::new(),
            is_interrupt_handler: false,
        }
    }

    /// Number of instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Maps every label to the index of its first `Label` instruction.
    #[must_use]
    pub fn label_positions(&self) -> BTreeMap<&str, usize> {
        let mut positions = BTreeMap::new();
        for (index, instruction) in self.instructions.iter().enumerate() {
            if let Some(name) = instruction.label_name() {
                positions.entry(name).or_insert(index);
            }
        }
        positions
    }
}

/// A compilation unit grouping functions and globals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IlModule {
    /// Module name
    pub name: String,
    /// Functions in declaration order
    pub functions: Vec<IlFunction>,
    /// Module-level variables
    pub globals: Vec<VariableDecl>,
}

/// A whole program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IlProgram {
    /// Program name
    pub name: String,
    /// Modules in link order
    pub modules: Vec<IlModule>,
}

impl IlProgram {
    /// All functions, module by module.
    pub fn functions(&self) -> impl Iterator<Item = &IlFunction> {
        self.modules.iter().flat_map(|m| m.functions.iter())
    }

    /// The first function of the first module that has one.
    #[must_use]
    pub fn first_function(&self) -> Option<&IlFunction> {
        self.functions().next()
    }
}
