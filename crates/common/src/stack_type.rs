//! Verification-level stack types.

/// The coarse type of a value on the evaluation stack.
///
/// Narrow integers (bool, char, int8..uint32) all widen to `Int32` when
/// pushed; single and double share `Float`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StackType {
    Int32,
    Int64,
    /// Native-size integer or unmanaged pointer.
    NativeInt,
    Float,
    /// Managed object reference (including null).
    ObjectRef,
    /// Managed pointer (`&`).
    ByRef,
}

/// All stack types, in declaration order.
pub const ALL_STACK_TYPES: [StackType; 6] = [
    StackType::Int32,
    StackType::Int64,
    StackType::NativeInt,
    StackType::Float,
    StackType::ObjectRef,
    StackType::ByRef,
];

impl StackType {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            StackType::Int32 => "int32",
            StackType::Int64 => "int64",
            StackType::NativeInt => "native int",
            StackType::Float => "F",
            StackType::ObjectRef => "O",
            StackType::ByRef => "&",
        }
    }

    /// Suffix used when naming stack slot variables.
    pub fn slot_suffix(&self) -> &'static str {
        match self {
            StackType::Int32 => "i32",
            StackType::Int64 => "i64",
            StackType::NativeInt => "iptr",
            StackType::Float => "f",
            StackType::ObjectRef => "obj",
            StackType::ByRef => "ref",
        }
    }

    /// True for the three integer categories.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            StackType::Int32 | StackType::Int64 | StackType::NativeInt
        )
    }
}

impl std::fmt::Display for StackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
