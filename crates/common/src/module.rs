//! Methods, fields and classes: the unit of input handed to the translator.
//!
//! A [`Module`] is a flat list of definitions. Methods and fields are
//! addressed by metadata tokens whose row is the 1-based position in the
//! corresponding list.

use crate::error::DecodeError;
use crate::instruction::{decode_all, Instruction};
use crate::operand::Token;
use crate::types::TypeDescriptor;

/// A named, typed method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A native function a method is bound to.
///
/// Calls to a bound method are emitted against `symbol` (or the method's
/// own name when absent) and require `include_file` in the output unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeBinding {
    pub include_file: String,
    pub symbol: Option<String>,
}

/// A method definition with its CIL body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Full name, `Namespace.Type.Method`.
    pub name: String,
    /// Parameters in argument-index order. For instance methods the first
    /// entry is `this`.
    pub params: Vec<Param>,
    pub return_type: TypeDescriptor,
    pub locals: Vec<TypeDescriptor>,
    /// Raw CIL bytes.
    pub code: Vec<u8>,
    pub native: Option<NativeBinding>,
    pub is_instance: bool,
}

impl MethodBody {
    /// A static method with no parameters, locals or code.
    pub fn new(name: impl Into<String>, return_type: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type,
            locals: Vec::new(),
            code: Vec::new(),
            native: None,
            is_instance: false,
        }
    }

    /// Number of values `ret` pops: 0 for `void`, 1 otherwise.
    pub fn return_arity(&self) -> usize {
        usize::from(self.return_type != TypeDescriptor::Void)
    }

    /// Decode the whole body.
    pub fn decode(&self) -> Result<Vec<Instruction>, DecodeError> {
        decode_all(&self.code)
    }

    /// The type part of the full name, if any.
    pub fn declaring_type(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(ty, _)| ty)
    }
}

/// A field of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub declaring_type: String,
    pub name: String,
    pub ty: TypeDescriptor,
    pub is_static: bool,
}

impl FieldDef {
    /// `DeclaringType.name`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }
}

/// A class and its base class. Classes without a base derive from
/// `System.Object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub base: Option<String>,
}

/// All definitions of one input unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub methods: Vec<MethodBody>,
    pub fields: Vec<FieldDef>,
    pub classes: Vec<ClassDef>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the method at `index` in [`Module::methods`].
    pub fn method_token(index: usize) -> Token {
        Token::new(Token::METHOD_TABLE, index as u32 + 1)
    }

    /// Token of the field at `index` in [`Module::fields`].
    pub fn field_token(index: usize) -> Token {
        Token::new(Token::FIELD_TABLE, index as u32 + 1)
    }

    pub fn method_by_token(&self, token: Token) -> Option<&MethodBody> {
        if token.table() != Token::METHOD_TABLE {
            return None;
        }
        let row = token.row() as usize;
        row.checked_sub(1).and_then(|i| self.methods.get(i))
    }

    pub fn field_by_token(&self, token: Token) -> Option<&FieldDef> {
        if token.table() != Token::FIELD_TABLE {
            return None;
        }
        let row = token.row() as usize;
        row.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// Find a method by full name.
    pub fn find_method(&self, name: &str) -> Option<(Token, &MethodBody)> {
        self.methods
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == name)
            .map(|(i, m)| (Self::method_token(i), m))
    }

    /// Find a field by `DeclaringType.name`.
    pub fn find_field(&self, full_name: &str) -> Option<(Token, &FieldDef)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.full_name() == full_name)
            .map(|(i, f)| (Self::field_token(i), f))
    }
}
