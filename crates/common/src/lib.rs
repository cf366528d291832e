//! IL2C common types and instruction decoding.
//!
//! This crate provides the foundational data structures shared by the
//! translator, the assembler and the CLI:
//!
//! - [`Opcode`]: the CIL opcode subset, one- and two-byte encodings
//! - [`Operand`] and [`decode_operand`]: operand decoding and branch targets
//! - [`Instruction`]: a decoded instruction with offset and length
//! - [`StackType`]: the coarse type of an evaluation stack entry
//! - [`TypeDescriptor`]: declared types of params, locals and fields
//! - [`Module`]: methods, fields and classes addressed by token
//! - [`DecodeError`]: errors from decoding byte streams

pub mod error;
pub mod instruction;
pub mod module;
pub mod opcode;
pub mod operand;
pub mod stack_type;
pub mod types;

// Re-export commonly used types at the crate root.
pub use error::DecodeError;
pub use instruction::{decode_all, Instruction};
pub use module::{ClassDef, FieldDef, MethodBody, Module, NativeBinding, Param};
pub use opcode::{FlowControl, Opcode};
pub use operand::{decode_operand, Operand, OperandKind, Token};
pub use stack_type::StackType;
pub use types::TypeDescriptor;
