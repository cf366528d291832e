//! Declared types as seen by the translator.
//!
//! A [`TypeDescriptor`] is the full declared type of a parameter, local,
//! field or method result. Values on the evaluation stack only keep the
//! coarse [`StackType`], plus the descriptor they were produced with so
//! that stores can pick the right conversion.

use crate::stack_type::StackType;

/// Full name of the root reference type.
pub const OBJECT_TYPE_NAME: &str = "System.Object";
/// Full name of the string type.
pub const STRING_TYPE_NAME: &str = "System.String";

/// A declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Void,
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    IntPtr,
    UIntPtr,
    Single,
    Double,
    /// The type of `ldnull`; assignable to every reference type.
    Null,
    /// A reference type, by full name.
    Class(String),
    /// A managed pointer to the element type.
    ByRef(Box<TypeDescriptor>),
}

/// Primitive types with their assembler keywords and runtime names.
const PRIMITIVES: [(TypeDescriptor, &str, &str); 15] = [
    (TypeDescriptor::Void, "void", "System.Void"),
    (TypeDescriptor::Boolean, "bool", "System.Boolean"),
    (TypeDescriptor::Char, "char", "System.Char"),
    (TypeDescriptor::SByte, "int8", "System.SByte"),
    (TypeDescriptor::Byte, "uint8", "System.Byte"),
    (TypeDescriptor::Int16, "int16", "System.Int16"),
    (TypeDescriptor::UInt16, "uint16", "System.UInt16"),
    (TypeDescriptor::Int32, "int32", "System.Int32"),
    (TypeDescriptor::UInt32, "uint32", "System.UInt32"),
    (TypeDescriptor::Int64, "int64", "System.Int64"),
    (TypeDescriptor::UInt64, "uint64", "System.UInt64"),
    (TypeDescriptor::IntPtr, "nint", "System.IntPtr"),
    (TypeDescriptor::UIntPtr, "nuint", "System.UIntPtr"),
    (TypeDescriptor::Single, "float32", "System.Single"),
    (TypeDescriptor::Double, "float64", "System.Double"),
];

impl TypeDescriptor {
    /// `System.Object`.
    pub fn object() -> Self {
        TypeDescriptor::Class(OBJECT_TYPE_NAME.to_string())
    }

    /// `System.String`.
    pub fn string() -> Self {
        TypeDescriptor::Class(STRING_TYPE_NAME.to_string())
    }

    /// A managed pointer to `self`.
    pub fn by_ref(self) -> Self {
        TypeDescriptor::ByRef(Box::new(self))
    }

    /// The stack type a value of this type has once pushed.
    ///
    /// `None` for `void`.
    pub fn stack_type(&self) -> Option<StackType> {
        match self {
            TypeDescriptor::Void => None,
            TypeDescriptor::Boolean
            | TypeDescriptor::Char
            | TypeDescriptor::SByte
            | TypeDescriptor::Byte
            | TypeDescriptor::Int16
            | TypeDescriptor::UInt16
            | TypeDescriptor::Int32
            | TypeDescriptor::UInt32 => Some(StackType::Int32),
            TypeDescriptor::Int64 | TypeDescriptor::UInt64 => Some(StackType::Int64),
            TypeDescriptor::IntPtr | TypeDescriptor::UIntPtr => Some(StackType::NativeInt),
            TypeDescriptor::Single | TypeDescriptor::Double => Some(StackType::Float),
            TypeDescriptor::Null | TypeDescriptor::Class(_) => Some(StackType::ObjectRef),
            TypeDescriptor::ByRef(_) => Some(StackType::ByRef),
        }
    }

    /// Numeric primitives: integers of every width, native ints, floats.
    /// `bool` and `char` are not numeric.
    pub fn is_numeric_primitive(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::SByte
                | TypeDescriptor::Byte
                | TypeDescriptor::Int16
                | TypeDescriptor::UInt16
                | TypeDescriptor::Int32
                | TypeDescriptor::UInt32
                | TypeDescriptor::Int64
                | TypeDescriptor::UInt64
                | TypeDescriptor::IntPtr
                | TypeDescriptor::UIntPtr
                | TypeDescriptor::Single
                | TypeDescriptor::Double
        )
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeDescriptor::Boolean)
    }

    /// Object references, including the null type.
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeDescriptor::Class(_) | TypeDescriptor::Null)
    }

    /// Runtime full name, e.g. `System.Int32` or `Demo.Node&`.
    pub fn full_name(&self) -> String {
        match self {
            TypeDescriptor::Class(name) => name.clone(),
            TypeDescriptor::ByRef(elem) => format!("{}&", elem.full_name()),
            TypeDescriptor::Null => "null".to_string(),
            prim => PRIMITIVES
                .iter()
                .find(|(t, _, _)| t == prim)
                .map(|(_, _, full)| full.to_string())
                .unwrap_or_default(),
        }
    }

    /// Assembler spelling of this type; inverse of [`TypeDescriptor::parse`].
    pub fn keyword(&self) -> String {
        match self {
            TypeDescriptor::Class(name) if name == OBJECT_TYPE_NAME => "object".to_string(),
            TypeDescriptor::Class(name) if name == STRING_TYPE_NAME => "string".to_string(),
            TypeDescriptor::Class(name) => format!("class:{name}"),
            TypeDescriptor::ByRef(elem) => format!("{}&", elem.keyword()),
            TypeDescriptor::Null => "null".to_string(),
            prim => PRIMITIVES
                .iter()
                .find(|(t, _, _)| t == prim)
                .map(|(_, kw, _)| kw.to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse an assembler type spelling: a primitive keyword, `object`,
    /// `string`, `class:Full.Name`, each optionally suffixed with `&`.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(elem) = text.strip_suffix('&') {
            let elem = Self::parse(elem)?;
            if matches!(elem, TypeDescriptor::Void | TypeDescriptor::ByRef(_)) {
                return None;
            }
            return Some(elem.by_ref());
        }
        match text {
            "object" => return Some(Self::object()),
            "string" => return Some(Self::string()),
            _ => {}
        }
        if let Some(name) = text.strip_prefix("class:") {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
            return valid.then(|| TypeDescriptor::Class(name.to_string()));
        }
        PRIMITIVES
            .iter()
            .find(|(_, kw, _)| *kw == text)
            .map(|(t, _, _)| t.clone())
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_name())
    }
}
