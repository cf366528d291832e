//! Decoded CIL instructions.
//!
//! An instruction is decoded from a method body at a byte offset:
//! ```text
//! [0xFE]? opcode   operand (0, 1, 4, 8 bytes, or a switch table)
//! ```
//! Branch operands are stored as absolute target offsets, so an
//! instruction must know its own offset and length to be re-encoded.

use crate::error::DecodeError;
use crate::opcode::Opcode;
use crate::operand::{decode_operand, Operand, OperandKind};

/// A single decoded CIL instruction. Immutable once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation to perform.
    pub opcode: Opcode,
    /// The decoded operand.
    pub operand: Operand,
    /// Byte offset of the first opcode byte.
    pub offset: u32,
    /// Total encoded length, opcode plus operand.
    pub length: u32,
}

impl Instruction {
    /// Create an instruction at `offset`, computing its encoded length.
    pub fn new(opcode: Opcode, operand: Operand, offset: u32) -> Self {
        let length = encoded_len(opcode, &operand) as u32;
        Self {
            opcode,
            operand,
            offset,
            length,
        }
    }

    /// Decode the instruction starting at `offset` in `bytes`.
    pub fn decode(bytes: &[u8], offset: u32) -> Result<Self, DecodeError> {
        let cursor = offset as usize;
        let (opcode, op_size) = Opcode::decode(bytes, cursor)?;
        let (operand, operand_size) =
            decode_operand(opcode.operand_kind(), bytes, cursor + op_size, offset)?;

        Ok(Self {
            opcode,
            operand,
            offset,
            length: (op_size + operand_size) as u32,
        })
    }

    /// Offset of the instruction that textually follows this one.
    pub fn next_offset(&self) -> u32 {
        self.offset + self.length
    }

    /// Explicit branch targets of this instruction (excluding fallthrough).
    pub fn targets(&self) -> Vec<u32> {
        match &self.operand {
            Operand::Target(t) => vec![*t],
            Operand::Switch(ts) => ts.clone(),
            _ => Vec::new(),
        }
    }

    /// Encode this instruction (little-endian operands).
    ///
    /// Short branch displacements are truncated to 8 bits; callers that
    /// build instructions by hand must keep targets within range.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length as usize);
        self.opcode.encode_into(&mut out);
        let next = self.next_offset() as i64;

        match (&self.operand, self.opcode.operand_kind()) {
            (Operand::None, _) => {}
            (Operand::Int32(v), OperandKind::ShortInt) => out.push(*v as i8 as u8),
            (Operand::Int32(v), _) => out.extend_from_slice(&v.to_le_bytes()),
            (Operand::Int64(v), _) => out.extend_from_slice(&v.to_le_bytes()),
            (Operand::Float32(v), _) => out.extend_from_slice(&v.to_le_bytes()),
            (Operand::Float64(v), _) => out.extend_from_slice(&v.to_le_bytes()),
            (Operand::Var(v), _) => out.push(*v as u8),
            (Operand::Target(t), OperandKind::ShortBranch) => {
                out.push((*t as i64 - next) as i8 as u8)
            }
            (Operand::Target(t), _) => {
                out.extend_from_slice(&((*t as i64 - next) as i32).to_le_bytes())
            }
            (Operand::Switch(ts), _) => {
                out.extend_from_slice(&(ts.len() as u32).to_le_bytes());
                for t in ts {
                    out.extend_from_slice(&((*t as i64 - next) as i32).to_le_bytes());
                }
            }
            (Operand::Token(tok), _) => out.extend_from_slice(&tok.0.to_le_bytes()),
        }

        out
    }
}

/// Encoded length of `opcode` with `operand`.
pub fn encoded_len(opcode: Opcode, operand: &Operand) -> usize {
    let operand_len = match (opcode.operand_kind().fixed_size(), operand) {
        (Some(n), _) => n,
        (None, Operand::Switch(ts)) => 4 + 4 * ts.len(),
        (None, _) => 4,
    };
    opcode.size() + operand_len
}

/// Linearly decode a whole method body.
///
/// Besides decoding every instruction, this checks that every branch and
/// switch target lands on an instruction boundary.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut instrs = Vec::new();
    let mut offset = 0u32;
    while (offset as usize) < bytes.len() {
        let instr = Instruction::decode(bytes, offset)?;
        offset = instr.next_offset();
        instrs.push(instr);
    }

    let mut boundary = vec![false; bytes.len()];
    for instr in &instrs {
        boundary[instr.offset as usize] = true;
    }
    for instr in &instrs {
        for target in instr.targets() {
            if !boundary[target as usize] {
                return Err(DecodeError::MisalignedTarget {
                    at: instr.offset,
                    target,
                });
            }
        }
    }

    Ok(instrs)
}
