//! The type catalog: metadata lookups the translator depends on.
//!
//! The translator never reads metadata itself. Tokens in the instruction
//! stream are resolved through a [`TypeCatalog`], which also decides how
//! types are spelled in C and which reference types are assignable.

use std::collections::HashMap;

use il2c_common::types::OBJECT_TYPE_NAME;
use il2c_common::{FieldDef, Module, NativeBinding, Token, TypeDescriptor};

/// How [`TypeCatalog::target_type_name`] spells a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeNameFlags {
    /// Drop the pointer for reference and by-ref types.
    pub dereferenced: bool,
    /// Prefix class names with `struct `.
    pub struct_prefix: bool,
}

impl TypeNameFlags {
    pub const DEREFERENCED: TypeNameFlags = TypeNameFlags {
        dereferenced: true,
        struct_prefix: false,
    };
}

/// What the translator needs to know to emit a call.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    /// Full name, `Namespace.Type.Method`.
    pub name: String,
    /// Parameter types in argument order, `this` first for instance methods.
    pub params: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
    pub native: Option<NativeBinding>,
}

/// Metadata lookups. Shared read-only by every function translation.
pub trait TypeCatalog: Sync {
    fn resolve_type(&self, token: Token) -> Option<TypeDescriptor>;

    fn resolve_method(&self, token: Token) -> Option<MethodSignature>;

    fn resolve_field(&self, token: Token) -> Option<FieldDef>;

    /// A C identifier for `name`: every character outside `[A-Za-z0-9_]`
    /// becomes `_`, and a leading digit gets a `_` prefix.
    fn mangled_name(&self, name: &str) -> String {
        let mut out: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if out.starts_with(|c: char| c.is_ascii_digit()) || out.is_empty() {
            out.insert(0, '_');
        }
        out
    }

    /// The C spelling of `ty`.
    fn target_type_name(&self, ty: &TypeDescriptor, flags: TypeNameFlags) -> String;

    /// True when a value of type `from` may be stored into `to` without a
    /// conversion beyond a pointer cast.
    fn is_assignable_from(&self, to: &TypeDescriptor, from: &TypeDescriptor) -> bool;

    /// The direct base class of a class type. `None` for `System.Object`
    /// and for anything that is not a class.
    fn base_type(&self, ty: &TypeDescriptor) -> Option<TypeDescriptor>;

    fn is_numeric_primitive(&self, ty: &TypeDescriptor) -> bool {
        ty.is_numeric_primitive()
    }
}

/// C names of the primitive types.
pub fn primitive_c_name(ty: &TypeDescriptor) -> Option<&'static str> {
    let name = match ty {
        TypeDescriptor::Void => "void",
        TypeDescriptor::Boolean => "bool",
        TypeDescriptor::Char => "wchar_t",
        TypeDescriptor::SByte => "int8_t",
        TypeDescriptor::Byte => "uint8_t",
        TypeDescriptor::Int16 => "int16_t",
        TypeDescriptor::UInt16 => "uint16_t",
        TypeDescriptor::Int32 => "int32_t",
        TypeDescriptor::UInt32 => "uint32_t",
        TypeDescriptor::Int64 => "int64_t",
        TypeDescriptor::UInt64 => "uint64_t",
        TypeDescriptor::IntPtr => "intptr_t",
        TypeDescriptor::UIntPtr => "uintptr_t",
        TypeDescriptor::Single => "float",
        TypeDescriptor::Double => "double",
        TypeDescriptor::Null | TypeDescriptor::Class(_) | TypeDescriptor::ByRef(_) => {
            return None
        }
    };
    Some(name)
}

/// An in-memory catalog over a [`Module`].
///
/// Classes not declared in the module derive directly from
/// `System.Object`.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    methods: Vec<MethodSignature>,
    fields: Vec<FieldDef>,
    classes: Vec<String>,
    bases: HashMap<String, String>,
}

impl MemoryCatalog {
    pub fn from_module(module: &Module) -> Self {
        let methods = module
            .methods
            .iter()
            .map(|m| MethodSignature {
                name: m.name.clone(),
                params: m.params.iter().map(|p| p.ty.clone()).collect(),
                return_type: m.return_type.clone(),
                native: m.native.clone(),
            })
            .collect();
        let bases = module
            .classes
            .iter()
            .filter_map(|c| c.base.clone().map(|base| (c.name.clone(), base)))
            .collect();

        Self {
            methods,
            fields: module.fields.clone(),
            classes: module.classes.iter().map(|c| c.name.clone()).collect(),
            bases,
        }
    }

    fn base_of(&self, class: &str) -> Option<&str> {
        if class == OBJECT_TYPE_NAME {
            return None;
        }
        Some(
            self.bases
                .get(class)
                .map(String::as_str)
                .unwrap_or(OBJECT_TYPE_NAME),
        )
    }
}

fn row_index(token: Token, table: u8) -> Option<usize> {
    if token.table() != table {
        return None;
    }
    (token.row() as usize).checked_sub(1)
}

impl TypeCatalog for MemoryCatalog {
    fn resolve_type(&self, token: Token) -> Option<TypeDescriptor> {
        let index = row_index(token, Token::TYPE_TABLE)?;
        self.classes
            .get(index)
            .map(|name| TypeDescriptor::Class(name.clone()))
    }

    fn resolve_method(&self, token: Token) -> Option<MethodSignature> {
        let index = row_index(token, Token::METHOD_TABLE)?;
        self.methods.get(index).cloned()
    }

    fn resolve_field(&self, token: Token) -> Option<FieldDef> {
        let index = row_index(token, Token::FIELD_TABLE)?;
        self.fields.get(index).cloned()
    }

    fn target_type_name(&self, ty: &TypeDescriptor, flags: TypeNameFlags) -> String {
        if let Some(name) = primitive_c_name(ty) {
            return name.to_string();
        }
        match ty {
            TypeDescriptor::ByRef(elem) => {
                let name = self.target_type_name(elem, TypeNameFlags::default());
                if flags.dereferenced {
                    name
                } else {
                    format!("{name}*")
                }
            }
            TypeDescriptor::Class(class) => {
                let mut name = self.mangled_name(class);
                if flags.struct_prefix {
                    name.insert_str(0, "struct ");
                }
                if flags.dereferenced {
                    name
                } else {
                    format!("{name}*")
                }
            }
            _ => "void*".to_string(),
        }
    }

    fn is_assignable_from(&self, to: &TypeDescriptor, from: &TypeDescriptor) -> bool {
        if to == from {
            return true;
        }
        match (to, from) {
            (TypeDescriptor::Class(_), TypeDescriptor::Null) => true,
            (TypeDescriptor::Class(target), TypeDescriptor::Class(source)) => {
                let mut current = Some(source.as_str());
                while let Some(class) = current {
                    if class == target {
                        return true;
                    }
                    current = self.base_of(class);
                }
                false
            }
            _ => false,
        }
    }

    fn base_type(&self, ty: &TypeDescriptor) -> Option<TypeDescriptor> {
        match ty {
            TypeDescriptor::Class(class) => self
                .base_of(class)
                .map(|base| TypeDescriptor::Class(base.to_string())),
            _ => None,
        }
    }
}
