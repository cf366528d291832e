//! Translation errors.
//!
//! A failure aborts the translation of one function only. The error names
//! the function, the offset and opcode of the failing instruction, and
//! what went wrong.

use il2c_common::{DecodeError, Opcode, Token};
use thiserror::Error;

/// What went wrong while translating an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The byte stream could not be decoded.
    #[error("malformed input: {0}")]
    MalformedInput(DecodeError),

    /// An instruction popped from an empty evaluation stack.
    #[error("stack underflow")]
    StackUnderflow,

    /// Two paths reach the same offset with different stack shapes.
    #[error("stack mismatch at IL_{target:04x}: expected [{expected}], found [{found}]")]
    StackMergeMismatch {
        target: u32,
        expected: String,
        found: String,
    },

    /// The opcode is known but has no handler, or the byte value is not
    /// an opcode at all.
    #[error("unsupported instruction {value:#04x}")]
    UnsupportedInstruction { value: u16 },

    /// Operand stack types do not fit the operation.
    #[error("invalid operand types: {0}")]
    InvalidOperandTypes(String),

    /// A value cannot be stored into a location of the given type.
    #[error("no viable conversion from {from} to {to}")]
    NoViableConversion { from: String, to: String },

    /// `ret` left values behind.
    #[error("{depth} value(s) on the stack at return, expected {expected}")]
    NonEmptyStackAtReturn { depth: usize, expected: usize },

    /// An argument or local index beyond the declared count.
    #[error("{what} index {index} out of range ({count} declared)")]
    InvalidIndex {
        what: &'static str,
        index: u16,
        count: usize,
    },

    /// The catalog has no entry for a metadata token.
    #[error("unresolved token {0}")]
    UnresolvedToken(Token),
}

impl From<DecodeError> for ErrorKind {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnknownOpcode { value, .. } => ErrorKind::UnsupportedInstruction { value },
            other => ErrorKind::MalformedInput(other),
        }
    }
}

/// A translation failure, located within a function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{function}: IL_{at:04x}{}: {kind}", opcode_suffix(.opcode))]
pub struct TranslateError {
    /// Full name of the method being translated.
    pub function: String,
    /// Offset of the failing instruction.
    pub at: u32,
    /// The failing opcode, when it decoded.
    pub opcode: Option<Opcode>,
    pub kind: ErrorKind,
}

fn opcode_suffix(opcode: &Option<Opcode>) -> String {
    opcode.map(|op| format!(" ({op})")).unwrap_or_default()
}
