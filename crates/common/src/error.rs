//! Decode errors for CIL method bodies.

use thiserror::Error;

/// Errors that occur while decoding a CIL instruction stream.
///
/// Every variant carries the byte offset (`at`) of the instruction whose
/// decoding failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The opcode byte (or `0xFE`-prefixed pair) is not in the opcode table.
    #[error("unknown opcode {value:#06x} at IL_{at:04x}")]
    UnknownOpcode { at: u32, value: u16 },

    /// The stream ended before the opcode or its operand was complete.
    #[error("truncated instruction at IL_{at:04x}: needs {needed} byte(s), {available} available")]
    Truncated {
        at: u32,
        needed: usize,
        available: usize,
    },

    /// A branch or switch target falls outside the method body.
    #[error("branch target {target} out of range at IL_{at:04x}")]
    TargetOutOfRange { at: u32, target: i64 },

    /// A branch or switch target does not start an instruction.
    #[error("branch target IL_{target:04x} is not an instruction boundary (from IL_{at:04x})")]
    MisalignedTarget { at: u32, target: u32 },

    /// A switch table declares more entries than the body can hold.
    #[error("switch at IL_{at:04x} declares {count} targets")]
    OversizedSwitch { at: u32, count: u32 },

    /// Control runs past the last byte of the body.
    #[error("control falls through the end of the body after IL_{at:04x}")]
    FallsThroughEnd { at: u32 },
}

impl DecodeError {
    /// Byte offset of the failing instruction.
    pub fn offset(&self) -> u32 {
        match self {
            DecodeError::UnknownOpcode { at, .. }
            | DecodeError::Truncated { at, .. }
            | DecodeError::TargetOutOfRange { at, .. }
            | DecodeError::MisalignedTarget { at, .. }
            | DecodeError::OversizedSwitch { at, .. }
            | DecodeError::FallsThroughEnd { at } => *at,
        }
    }
}
