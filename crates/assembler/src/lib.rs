//! CIL assembler: text ↔ module with encoded method bodies.
//!
//! The assembler is a mechanical translation used to write translator
//! inputs by hand. No optimization: short and long branch forms are kept
//! exactly as written.
//!
//! # Usage
//!
//! ```
//! use il2c_assembler::{assemble, disassemble};
//!
//! let text = "\
//! .method Demo.Program.Three int32
//!   ldc.i4.1
//!   ldc.i4.2
//!   add
//!   ret
//! .end
//! ";
//! let module = assemble(text).unwrap();
//! assert_eq!(module.methods[0].code, vec![0x17, 0x18, 0x58, 0x2A]);
//! let canonical = disassemble(&module).unwrap();
//! assert_eq!(assemble(&canonical).unwrap(), module);
//! ```
//!
//! # Roundtrip Guarantee
//!
//! `assemble(disassemble(module)) == module` holds for every module whose
//! bodies decode. The disassembler labels every instruction `IL_xxxx`; the
//! assembler accepts any label names.

pub mod error;

mod disassembler;
mod lexer;
mod parser;

pub use disassembler::{disassemble_code, format_instruction};
pub use error::AsmError;

use il2c_common::Module;
use lexer::tokenize_line;
use parser::Parser;

/// Assemble text into a module.
///
/// Returns the first error encountered. Fix one error at a time.
pub fn assemble(text: &str) -> Result<Module, AsmError> {
    let mut parser = Parser::new();
    for (idx, line) in text.lines().enumerate() {
        parser.line(&tokenize_line(line), idx + 1)?;
    }
    parser.finish()
}

/// Disassemble a module into canonical assembly text.
pub fn disassemble(module: &Module) -> Result<String, AsmError> {
    disassembler::disassemble(module)
}
