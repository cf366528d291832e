//! Error types for the CIL assembler.

use il2c_common::DecodeError;
use thiserror::Error;

/// Errors produced while assembling text or disassembling bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// An unrecognized opcode mnemonic was encountered.
    #[error("line {line}: unknown opcode '{token}'")]
    UnknownOpcode { line: usize, token: String },

    /// An unrecognized directive was encountered.
    #[error("line {line}: unknown directive '{token}'")]
    UnknownDirective { line: usize, token: String },

    /// An unrecognized type spelling was encountered.
    #[error("line {line}: unknown type '{token}'")]
    UnknownType { line: usize, token: String },

    /// An opcode or directive did not have enough arguments.
    #[error("line {line}: {opcode} expects {expected} argument(s)")]
    MissingArgument {
        line: usize,
        opcode: &'static str,
        expected: usize,
    },

    /// A numeric literal could not be parsed or is out of range.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// A token appeared where it was not expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },

    /// An instruction or method-level directive outside `.method`/`.end`.
    #[error("line {line}: '{token}' outside of a method")]
    OutsideMethod { line: usize, token: String },

    /// A `.method` without its closing `.end`.
    #[error("line {line}: method is missing .end")]
    UnterminatedMethod { line: usize },

    #[error("line {line}: label '{label}' defined twice")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: undefined label '{label}'")]
    UndefinedLabel { line: usize, label: String },

    /// A short branch whose displacement does not fit in a signed byte.
    #[error("line {line}: branch to '{label}' out of range for a short branch ({displacement})")]
    BranchOutOfRange {
        line: usize,
        label: String,
        displacement: i64,
    },

    #[error("line {line}: unknown method '{name}'")]
    UnknownMethod { line: usize, name: String },

    #[error("line {line}: unknown field '{name}'")]
    UnknownField { line: usize, name: String },

    /// A method body that does not decode.
    #[error("{method}: {source}")]
    Decode {
        method: String,
        #[source]
        source: DecodeError,
    },
}
