//! Operand encodings and the operand decoder.
//!
//! Branch displacements are relative to the address immediately following
//! the operand: `target = offset_after_operand + displacement`. Switch
//! displacements are relative to the end of the whole switch instruction.

use crate::error::DecodeError;

/// Encoding of the operand that follows an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// No operand.
    None,
    /// Signed 8-bit immediate (`ldc.i4.s`).
    ShortInt,
    /// Little-endian 32-bit immediate.
    Int32,
    /// Little-endian 64-bit immediate.
    Int64,
    /// IEEE 754 single.
    Float32,
    /// IEEE 754 double.
    Float64,
    /// Unsigned 8-bit argument or local index.
    ShortVar,
    /// Signed 8-bit branch displacement.
    ShortBranch,
    /// Signed 32-bit branch displacement.
    Branch,
    /// `u32` count followed by that many 32-bit displacements.
    Switch,
    /// 32-bit metadata token.
    Token,
}

impl OperandKind {
    /// Fixed operand width in bytes. `None` for variable-width switch tables.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            OperandKind::None => Some(0),
            OperandKind::ShortInt | OperandKind::ShortVar | OperandKind::ShortBranch => Some(1),
            OperandKind::Int32 | OperandKind::Float32 | OperandKind::Branch | OperandKind::Token => {
                Some(4)
            }
            OperandKind::Int64 | OperandKind::Float64 => Some(8),
            OperandKind::Switch => None,
        }
    }
}

/// A metadata token: table id in the high byte, row number in the low 24 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Table id of the `MethodDef` table.
    pub const METHOD_TABLE: u8 = 0x06;
    /// Table id of the `Field` table.
    pub const FIELD_TABLE: u8 = 0x04;
    /// Table id of the `TypeDef` table.
    pub const TYPE_TABLE: u8 = 0x02;

    /// Build a token from a table id and a 1-based row.
    pub fn new(table: u8, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A decoded operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    /// 32-bit integer immediate (`ldc.i4.s` is sign-extended into this).
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Argument or local index.
    Var(u16),
    /// Absolute branch target offset.
    Target(u32),
    /// Absolute switch target offsets, in table order.
    Switch(Vec<u32>),
    Token(Token),
}

/// Decode the operand of kind `kind` starting at `cursor`.
///
/// `at` is the offset of the instruction's first opcode byte and is only
/// used for error reporting. Returns the operand and the number of bytes
/// consumed.
pub fn decode_operand(
    kind: OperandKind,
    stream: &[u8],
    cursor: usize,
    at: u32,
) -> Result<(Operand, usize), DecodeError> {
    match kind {
        OperandKind::None => Ok((Operand::None, 0)),
        OperandKind::ShortInt => {
            let [b] = read::<1>(stream, cursor, at)?;
            Ok((Operand::Int32(b as i8 as i32), 1))
        }
        OperandKind::Int32 => {
            let bytes = read::<4>(stream, cursor, at)?;
            Ok((Operand::Int32(i32::from_le_bytes(bytes)), 4))
        }
        OperandKind::Int64 => {
            let bytes = read::<8>(stream, cursor, at)?;
            Ok((Operand::Int64(i64::from_le_bytes(bytes)), 8))
        }
        OperandKind::Float32 => {
            let bytes = read::<4>(stream, cursor, at)?;
            Ok((Operand::Float32(f32::from_le_bytes(bytes)), 4))
        }
        OperandKind::Float64 => {
            let bytes = read::<8>(stream, cursor, at)?;
            Ok((Operand::Float64(f64::from_le_bytes(bytes)), 8))
        }
        OperandKind::ShortVar => {
            let [b] = read::<1>(stream, cursor, at)?;
            Ok((Operand::Var(b as u16), 1))
        }
        OperandKind::ShortBranch => {
            let [b] = read::<1>(stream, cursor, at)?;
            let target = resolve_target(stream, cursor + 1, b as i8 as i64, at)?;
            Ok((Operand::Target(target), 1))
        }
        OperandKind::Branch => {
            let bytes = read::<4>(stream, cursor, at)?;
            let disp = i32::from_le_bytes(bytes) as i64;
            let target = resolve_target(stream, cursor + 4, disp, at)?;
            Ok((Operand::Target(target), 4))
        }
        OperandKind::Token => {
            let bytes = read::<4>(stream, cursor, at)?;
            Ok((Operand::Token(Token(u32::from_le_bytes(bytes))), 4))
        }
        OperandKind::Switch => {
            let count = u32::from_le_bytes(read::<4>(stream, cursor, at)?);
            let table_start = cursor + 4;
            let remaining = stream.len().saturating_sub(table_start);
            if count as usize > remaining / 4 {
                return Err(DecodeError::OversizedSwitch { at, count });
            }
            let end = table_start + 4 * count as usize;
            let mut targets = Vec::with_capacity(count as usize);
            for i in 0..count as usize {
                let bytes = read::<4>(stream, table_start + 4 * i, at)?;
                let disp = i32::from_le_bytes(bytes) as i64;
                targets.push(resolve_target(stream, end, disp, at)?);
            }
            Ok((Operand::Switch(targets), end - cursor))
        }
    }
}

fn read<const N: usize>(stream: &[u8], cursor: usize, at: u32) -> Result<[u8; N], DecodeError> {
    stream
        .get(cursor..cursor + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(DecodeError::Truncated {
            at,
            needed: N,
            available: stream.len().saturating_sub(cursor),
        })
}

fn resolve_target(stream: &[u8], base: usize, disp: i64, at: u32) -> Result<u32, DecodeError> {
    let target = base as i64 + disp;
    if target < 0 || target >= stream.len() as i64 {
        return Err(DecodeError::TargetOutOfRange { at, target });
    }
    Ok(target as u32)
}
