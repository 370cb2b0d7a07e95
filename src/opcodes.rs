//! Output of compiling mode.
//!
//! Compilation constant-folds each top-level form and records the folded value
//! as a single [`Opcode::Push`]. The resulting [`Opcodes`] sequence is
//! append-only and renders as text with one `PUSH <value>` per line.

use crate::ast::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    Push(Value),
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Push(value) => write!(f, "PUSH {value}"),
        }
    }
}

/// Append-only emission sequence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Opcodes(Vec<Opcode>);

impl Opcodes {
    pub fn new() -> Self {
        Opcodes(Vec::new())
    }

    pub fn push(&mut self, opcode: Opcode) {
        self.0.push(opcode);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Opcode> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Opcode] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Opcodes {
    type Item = &'a Opcode;
    type IntoIter = std::slice::Iter<'a, Opcode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for Opcodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, opcode) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{opcode}")?;
        }
        Ok(())
    }
}

/// Compile-time constants visible to identifier resolution in compiling mode
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolTable {
    constants: HashMap<String, Value>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            constants: HashMap::new(),
        }
    }

    /// Declare or replace a constant
    pub fn declare_constant(&mut self, name: impl Into<String>, value: Value) {
        self.constants.insert(name.into(), value);
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}
