//! Opcode definitions for the CIL subset understood by the translator.
//!
//! Single-byte opcodes use their byte value; two-byte opcodes are encoded
//! as `0xFE` followed by a second byte and are stored here as `0xFEnn`.
//! See ECMA-335 Partition III for the semantics of each opcode.

use crate::error::DecodeError;
use crate::operand::OperandKind;

/// How an instruction transfers control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowControl {
    /// Falls through to the next instruction.
    Next,
    /// Calls another method, then falls through.
    Call,
    /// Unconditional jump.
    Branch,
    /// Conditional jump (or switch): branch target(s) plus fallthrough.
    CondBranch,
    /// Leaves the method with an optional value.
    Return,
    /// Raises an exception.
    Throw,
}

macro_rules! opcode_table {
    ($( $(#[$doc:meta])* $name:ident = $value:literal, $mnemonic:literal, $operand:ident, $flow:ident; )*) => {
        /// Identifies a CIL operation.
        ///
        /// The `#[repr(u16)]` discriminant is the encoded opcode value.
        #[repr(u16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Opcode {
            $( $(#[$doc])* $name = $value, )*
        }

        /// Every opcode the decoder recognizes, in encoding order.
        pub const ALL_OPCODES: &[Opcode] = &[ $( Opcode::$name, )* ];

        impl Opcode {
            /// Look up an opcode by its encoded value.
            pub fn from_value(value: u16) -> Option<Self> {
                match value {
                    $( $value => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Returns the assembly mnemonic for this opcode.
            pub fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// The encoding of the operand that follows the opcode.
            pub fn operand_kind(&self) -> OperandKind {
                match self {
                    $( Opcode::$name => OperandKind::$operand, )*
                }
            }

            /// How this opcode affects control flow.
            pub fn flow(&self) -> FlowControl {
                match self {
                    $( Opcode::$name => FlowControl::$flow, )*
                }
            }
        }
    };
}

opcode_table! {
    Nop = 0x00, "nop", None, Next;
    Break = 0x01, "break", None, Next;

    // Arguments and locals
    Ldarg0 = 0x02, "ldarg.0", None, Next;
    Ldarg1 = 0x03, "ldarg.1", None, Next;
    Ldarg2 = 0x04, "ldarg.2", None, Next;
    Ldarg3 = 0x05, "ldarg.3", None, Next;
    Ldloc0 = 0x06, "ldloc.0", None, Next;
    Ldloc1 = 0x07, "ldloc.1", None, Next;
    Ldloc2 = 0x08, "ldloc.2", None, Next;
    Ldloc3 = 0x09, "ldloc.3", None, Next;
    Stloc0 = 0x0A, "stloc.0", None, Next;
    Stloc1 = 0x0B, "stloc.1", None, Next;
    Stloc2 = 0x0C, "stloc.2", None, Next;
    Stloc3 = 0x0D, "stloc.3", None, Next;
    LdargS = 0x0E, "ldarg.s", ShortVar, Next;
    LdargaS = 0x0F, "ldarga.s", ShortVar, Next;
    StargS = 0x10, "starg.s", ShortVar, Next;
    LdlocS = 0x11, "ldloc.s", ShortVar, Next;
    LdlocaS = 0x12, "ldloca.s", ShortVar, Next;
    StlocS = 0x13, "stloc.s", ShortVar, Next;

    // Constants
    Ldnull = 0x14, "ldnull", None, Next;
    LdcI4M1 = 0x15, "ldc.i4.m1", None, Next;
    LdcI4_0 = 0x16, "ldc.i4.0", None, Next;
    LdcI4_1 = 0x17, "ldc.i4.1", None, Next;
    LdcI4_2 = 0x18, "ldc.i4.2", None, Next;
    LdcI4_3 = 0x19, "ldc.i4.3", None, Next;
    LdcI4_4 = 0x1A, "ldc.i4.4", None, Next;
    LdcI4_5 = 0x1B, "ldc.i4.5", None, Next;
    LdcI4_6 = 0x1C, "ldc.i4.6", None, Next;
    LdcI4_7 = 0x1D, "ldc.i4.7", None, Next;
    LdcI4_8 = 0x1E, "ldc.i4.8", None, Next;
    /// Push a sign-extended 8-bit immediate.
    LdcI4S = 0x1F, "ldc.i4.s", ShortInt, Next;
    LdcI4 = 0x20, "ldc.i4", Int32, Next;
    LdcI8 = 0x21, "ldc.i8", Int64, Next;
    LdcR4 = 0x22, "ldc.r4", Float32, Next;
    LdcR8 = 0x23, "ldc.r8", Float64, Next;

    // Stack
    Dup = 0x25, "dup", None, Next;
    Pop = 0x26, "pop", None, Next;

    // Calls
    Jmp = 0x27, "jmp", Token, Call;
    Call = 0x28, "call", Token, Call;
    Calli = 0x29, "calli", Token, Call;
    Ret = 0x2A, "ret", None, Return;

    // Short branches: signed 8-bit displacement
    BrS = 0x2B, "br.s", ShortBranch, Branch;
    BrfalseS = 0x2C, "brfalse.s", ShortBranch, CondBranch;
    BrtrueS = 0x2D, "brtrue.s", ShortBranch, CondBranch;
    BeqS = 0x2E, "beq.s", ShortBranch, CondBranch;
    BgeS = 0x2F, "bge.s", ShortBranch, CondBranch;
    BgtS = 0x30, "bgt.s", ShortBranch, CondBranch;
    BleS = 0x31, "ble.s", ShortBranch, CondBranch;
    BltS = 0x32, "blt.s", ShortBranch, CondBranch;
    BneUnS = 0x33, "bne.un.s", ShortBranch, CondBranch;
    BgeUnS = 0x34, "bge.un.s", ShortBranch, CondBranch;
    BgtUnS = 0x35, "bgt.un.s", ShortBranch, CondBranch;
    BleUnS = 0x36, "ble.un.s", ShortBranch, CondBranch;
    BltUnS = 0x37, "blt.un.s", ShortBranch, CondBranch;

    // Long branches: signed 32-bit displacement
    Br = 0x38, "br", Branch, Branch;
    Brfalse = 0x39, "brfalse", Branch, CondBranch;
    Brtrue = 0x3A, "brtrue", Branch, CondBranch;
    Beq = 0x3B, "beq", Branch, CondBranch;
    Bge = 0x3C, "bge", Branch, CondBranch;
    Bgt = 0x3D, "bgt", Branch, CondBranch;
    Ble = 0x3E, "ble", Branch, CondBranch;
    Blt = 0x3F, "blt", Branch, CondBranch;
    BneUn = 0x40, "bne.un", Branch, CondBranch;
    BgeUn = 0x41, "bge.un", Branch, CondBranch;
    BgtUn = 0x42, "bgt.un", Branch, CondBranch;
    BleUn = 0x43, "ble.un", Branch, CondBranch;
    BltUn = 0x44, "blt.un", Branch, CondBranch;
    Switch = 0x45, "switch", Switch, CondBranch;

    // Indirect access
    LdindI4 = 0x4A, "ldind.i4", None, Next;
    LdindI8 = 0x4C, "ldind.i8", None, Next;
    StindI4 = 0x54, "stind.i4", None, Next;
    StindI8 = 0x55, "stind.i8", None, Next;

    // Arithmetic and bitwise
    Add = 0x58, "add", None, Next;
    Sub = 0x59, "sub", None, Next;
    Mul = 0x5A, "mul", None, Next;
    Div = 0x5B, "div", None, Next;
    DivUn = 0x5C, "div.un", None, Next;
    Rem = 0x5D, "rem", None, Next;
    RemUn = 0x5E, "rem.un", None, Next;
    And = 0x5F, "and", None, Next;
    Or = 0x60, "or", None, Next;
    Xor = 0x61, "xor", None, Next;
    Shl = 0x62, "shl", None, Next;
    Shr = 0x63, "shr", None, Next;
    ShrUn = 0x64, "shr.un", None, Next;
    Neg = 0x65, "neg", None, Next;
    Not = 0x66, "not", None, Next;

    // Conversions
    ConvI1 = 0x67, "conv.i1", None, Next;
    ConvI2 = 0x68, "conv.i2", None, Next;
    ConvI4 = 0x69, "conv.i4", None, Next;
    ConvI8 = 0x6A, "conv.i8", None, Next;
    ConvR4 = 0x6B, "conv.r4", None, Next;
    ConvR8 = 0x6C, "conv.r8", None, Next;
    ConvU4 = 0x6D, "conv.u4", None, Next;
    ConvU8 = 0x6E, "conv.u8", None, Next;

    // Object model
    Callvirt = 0x6F, "callvirt", Token, Call;
    Ldstr = 0x72, "ldstr", Token, Next;
    Newobj = 0x73, "newobj", Token, Call;
    Unbox = 0x79, "unbox", Token, Next;
    Throw = 0x7A, "throw", None, Throw;
    Ldfld = 0x7B, "ldfld", Token, Next;
    Stfld = 0x7D, "stfld", Token, Next;
    Ldsfld = 0x7E, "ldsfld", Token, Next;
    Stsfld = 0x80, "stsfld", Token, Next;
    Box = 0x8C, "box", Token, Next;
    Ldlen = 0x8E, "ldlen", None, Next;

    ConvU2 = 0xD1, "conv.u2", None, Next;
    ConvU1 = 0xD2, "conv.u1", None, Next;
    ConvI = 0xD3, "conv.i", None, Next;
    ConvU = 0xE0, "conv.u", None, Next;

    // Two-byte comparisons
    Ceq = 0xFE01, "ceq", None, Next;
    Cgt = 0xFE02, "cgt", None, Next;
    CgtUn = 0xFE03, "cgt.un", None, Next;
    Clt = 0xFE04, "clt", None, Next;
    CltUn = 0xFE05, "clt.un", None, Next;
}

/// Lead byte of two-byte opcodes.
pub const TWO_BYTE_PREFIX: u8 = 0xFE;

impl Opcode {
    /// Decode the opcode starting at `bytes[at]`.
    ///
    /// Returns the opcode and the number of bytes it occupies (1 or 2).
    pub fn decode(bytes: &[u8], at: usize) -> Result<(Self, usize), DecodeError> {
        let offset = at as u32;
        let first = *bytes.get(at).ok_or(DecodeError::Truncated {
            at: offset,
            needed: 1,
            available: 0,
        })?;

        let (value, size) = if first == TWO_BYTE_PREFIX {
            let second = *bytes.get(at + 1).ok_or(DecodeError::Truncated {
                at: offset,
                needed: 2,
                available: 1,
            })?;
            (u16::from_be_bytes([first, second]), 2)
        } else {
            (first as u16, 1)
        };

        Opcode::from_value(value)
            .map(|op| (op, size))
            .ok_or(DecodeError::UnknownOpcode { at: offset, value })
    }

    /// Look up an opcode by its assembly mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        ALL_OPCODES
            .iter()
            .find(|op| op.mnemonic() == mnemonic)
            .copied()
    }

    /// Number of bytes the opcode itself occupies.
    pub fn size(&self) -> usize {
        if (*self as u16) > 0xFF {
            2
        } else {
            1
        }
    }

    /// Append the opcode bytes to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let value = *self as u16;
        if value > 0xFF {
            out.extend_from_slice(&value.to_be_bytes());
        } else {
            out.push(value as u8);
        }
    }

    /// True if this opcode ends a basic block.
    pub fn ends_block(&self) -> bool {
        matches!(
            self.flow(),
            FlowControl::Branch | FlowControl::CondBranch | FlowControl::Return | FlowControl::Throw
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
