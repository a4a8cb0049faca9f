use std::result;

use eyre::Error as EyreError;
use thiserror::Error;

/// Errors raised while importing LIR into AIR.
///
/// An import error is terminal for the function being translated, and by
/// policy for the whole module load. There are no retries and no partial
/// outputs.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("function @{function} has more than one {kind} block (use a merge-return pass?)")]
    MultipleSpecialBlocks {
        function: String,
        kind: &'static str,
    },
    #[error("select instruction not supported (use a select-lowering pass?)")]
    SelectNotSupported,
    #[error("switch instruction not supported (use a switch-lowering pass?)")]
    SwitchNotSupported,
    #[error("unsupported instruction (opcode: {0})")]
    UnsupportedInstruction(String),
    #[error("unsupported cast opcode: {0}")]
    UnsupportedCast(&'static str),
    #[error("unexpected bitcast from {from} to {to}")]
    InvalidBitcast { from: String, to: String },
    #[error("cannot reconcile phi incoming value of type {from} with result of type {to}")]
    InvalidPhiIncoming { from: String, to: String },
    #[error("unexpected condition for conditional branch")]
    UnexpectedBranchCondition,
    #[error("unsupported float comparison predicate: {0}")]
    UnsupportedFloatPredicate(&'static str),
    #[error("unexpected value in {context}")]
    InvalidOperand { context: &'static str },
    #[error("unexpected type in {context}")]
    UnexpectedType { context: &'static str },
    #[error("{0}")]
    Invariant(String),
    #[error("import error: {0}")]
    Generic(EyreError),
}

pub type Result<T> = result::Result<T, ImportError>;

impl From<EyreError> for ImportError {
    fn from(err: EyreError) -> Self {
        ImportError::Generic(err)
    }
}

impl From<String> for ImportError {
    fn from(s: String) -> Self {
        ImportError::Invariant(s)
    }
}

impl From<&str> for ImportError {
    fn from(s: &str) -> Self {
        ImportError::Invariant(s.to_string())
    }
}
