//! Source-level debug records attached to LIR functions.
//!
//! These mirror the `dbg.declare`/`dbg.addr`/`dbg.value` records a frontend
//! leaves behind: a target value, the source-level type of the variable, and
//! the number of expression operations applied to the location. Only records
//! with a zero-length expression describe the value itself.

use super::{Value, ValueKey};

/// Encoding of a basic source-level type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiEncoding {
    Signed,
    Unsigned,
    Bool,
    SignedChar,
    UnsignedChar,
    Float,
}

impl DiEncoding {
    pub fn is_signed(self) -> bool {
        matches!(self, DiEncoding::Signed | DiEncoding::SignedChar)
    }
}

/// Source-level type description.
#[derive(Debug, Clone, PartialEq)]
pub enum DiType {
    Basic {
        name: String,
        bits: u32,
        encoding: DiEncoding,
    },
    Pointer(Box<DiType>),
    Array {
        element: Box<DiType>,
        count: u64,
    },
    Struct {
        name: String,
        members: Vec<DiType>,
    },
}

impl DiType {
    pub fn basic(name: impl Into<String>, bits: u32, encoding: DiEncoding) -> Self {
        DiType::Basic {
            name: name.into(),
            bits,
            encoding,
        }
    }

    pub fn pointer_to(pointee: DiType) -> Self {
        DiType::Pointer(Box::new(pointee))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// `dbg.declare`: the target is the address of the variable.
    Declare,
    /// `dbg.addr`: like `Declare`, for a variable that is not always in
    /// memory.
    Addr,
    /// `dbg.value`: the target is the value of the variable.
    Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableRecord {
    pub target: Value,
    pub di_type: DiType,
    /// Number of location-expression operations; zero means the record
    /// describes the target directly.
    pub expression_ops: u32,
    pub kind: RecordKind,
}

impl VariableRecord {
    pub fn is_identity(&self) -> bool {
        self.expression_ops == 0
    }
}

impl super::Function {
    /// First identity `dbg.declare`/`dbg.addr` record targeting `key`.
    pub fn find_dbg_addr(&self, key: ValueKey) -> Option<&VariableRecord> {
        self.debug_records.iter().find(|record| {
            matches!(record.kind, RecordKind::Declare | RecordKind::Addr)
                && record.is_identity()
                && record.target.key() == Some(key)
        })
    }

    /// First identity `dbg.value` record targeting `key`.
    pub fn find_dbg_value(&self, key: ValueKey) -> Option<&VariableRecord> {
        self.debug_records.iter().find(|record| {
            record.kind == RecordKind::Value
                && record.is_identity()
                && record.target.key() == Some(key)
        })
    }
}
