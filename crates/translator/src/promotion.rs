//! Operand promotion and C expression rules.
//!
//! These are pure functions over stack values. They decide the result type
//! of an operation from the stack types of its operands (ECMA-335
//! Partition III, 1.5 operand type tables) and spell the C expression,
//! including any casts it needs.
//!
//! | left \ right | int32 | int64 | native int | F   |
//! |--------------|-------|-------|------------|-----|
//! | int32        | int32 |   x   | native int |  x  |
//! | int64        |   x   | int64 |     x      |  x  |
//! | native int   | nint  |   x   | native int |  x  |
//! | F            |   x   |   x   |     x      |  F  |

use il2c_common::{StackType, TypeDescriptor};

use crate::catalog::{primitive_c_name, TypeCatalog, TypeNameFlags};
use crate::error::ErrorKind;
use crate::stack::SymbolicValue;

/// Arithmetic and bitwise operators taking two operands of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    DivUn,
    Rem,
    RemUn,
    And,
    Or,
    Xor,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div | BinaryOperator::DivUn => "/",
            BinaryOperator::Rem | BinaryOperator::RemUn => "%",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
            BinaryOperator::Xor => "^",
        }
    }

    /// Operators only defined on integers.
    pub fn integer_only(&self) -> bool {
        matches!(
            self,
            BinaryOperator::DivUn
                | BinaryOperator::RemUn
                | BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Xor
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, BinaryOperator::DivUn | BinaryOperator::RemUn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOperator {
    Shl,
    Shr,
    ShrUn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
}

/// Comparisons used by `ceq`/`cgt`/`clt` and the compare-and-branch
/// opcodes. `Un` variants compare integers as unsigned and floats as
/// unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    NeUn,
    Gt,
    GtUn,
    Ge,
    GeUn,
    Lt,
    LtUn,
    Le,
    LeUn,
}

impl CompareOperator {
    fn symbol(&self) -> &'static str {
        match self {
            CompareOperator::Eq => "==",
            CompareOperator::NeUn => "!=",
            CompareOperator::Gt | CompareOperator::GtUn => ">",
            CompareOperator::Ge | CompareOperator::GeUn => ">=",
            CompareOperator::Lt | CompareOperator::LtUn => "<",
            CompareOperator::Le | CompareOperator::LeUn => "<=",
        }
    }

    /// The ordered comparison that is false exactly when this unordered
    /// one is true.
    fn float_complement(&self) -> Option<&'static str> {
        match self {
            CompareOperator::GtUn => Some("<="),
            CompareOperator::GeUn => Some("<"),
            CompareOperator::LtUn => Some(">="),
            CompareOperator::LeUn => Some(">"),
            _ => None,
        }
    }

    fn is_unsigned(&self) -> bool {
        matches!(
            self,
            CompareOperator::GtUn
                | CompareOperator::GeUn
                | CompareOperator::LtUn
                | CompareOperator::LeUn
        )
    }
}

/// A C expression with the declared type of its result.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub ty: TypeDescriptor,
    pub text: String,
}

/// Result stack type of a binary numeric operation, or `None` if the
/// operand types do not combine.
pub fn binary_result(left: StackType, right: StackType) -> Option<StackType> {
    use StackType::*;
    match (left, right) {
        (Int32, Int32) => Some(Int32),
        (Int64, Int64) => Some(Int64),
        (Int32 | NativeInt, Int32 | NativeInt) => Some(NativeInt),
        (Float, Float) => Some(Float),
        _ => None,
    }
}

fn unsigned_name(stack_type: StackType) -> &'static str {
    match stack_type {
        StackType::Int64 => "uint64_t",
        StackType::NativeInt => "uintptr_t",
        _ => "uint32_t",
    }
}

/// Declared type given to a value of `stack_type` that has no better one.
pub fn canonical_type(stack_type: StackType) -> TypeDescriptor {
    match stack_type {
        StackType::Int32 => TypeDescriptor::Int32,
        StackType::Int64 => TypeDescriptor::Int64,
        StackType::NativeInt => TypeDescriptor::IntPtr,
        StackType::Float => TypeDescriptor::Double,
        StackType::ObjectRef => TypeDescriptor::object(),
        StackType::ByRef => TypeDescriptor::IntPtr.by_ref(),
    }
}

/// The nearest type both `a` and `b` are assignable to. `null` joins to
/// the other side; classes with no closer common base join to
/// `System.Object`.
pub fn common_supertype(
    catalog: &dyn TypeCatalog,
    a: &TypeDescriptor,
    b: &TypeDescriptor,
) -> TypeDescriptor {
    if *a == TypeDescriptor::Null {
        return b.clone();
    }
    let mut current = Some(a.clone());
    while let Some(candidate) = current {
        if catalog.is_assignable_from(&candidate, b) {
            return candidate;
        }
        current = catalog.base_type(&candidate);
    }
    TypeDescriptor::object()
}

fn operand_types(left: &SymbolicValue, right: &SymbolicValue) -> String {
    format!("{} and {}", left.stack_type, right.stack_type)
}

/// Operands spelled for an integer or float operation whose result is
/// `result`: mixed int32/native int operands are both cast.
fn cast_operands(
    result: StackType,
    unsigned: bool,
    left: &SymbolicValue,
    right: &SymbolicValue,
) -> (String, String) {
    let mixed = result == StackType::NativeInt;
    if unsigned {
        let cast = unsigned_name(result);
        (
            format!("({cast}){}", left.expr),
            format!("({cast}){}", right.expr),
        )
    } else if mixed {
        (
            format!("(intptr_t){}", left.expr),
            format!("(intptr_t){}", right.expr),
        )
    } else {
        (left.expr.clone(), right.expr.clone())
    }
}

pub fn binary_expression(
    op: BinaryOperator,
    left: &SymbolicValue,
    right: &SymbolicValue,
) -> Result<Expression, ErrorKind> {
    let result = binary_result(left.stack_type, right.stack_type)
        .filter(|r| !(op.integer_only() && *r == StackType::Float))
        .ok_or_else(|| {
            ErrorKind::InvalidOperandTypes(format!(
                "{} on {}",
                op.symbol(),
                operand_types(left, right)
            ))
        })?;

    if result == StackType::Float {
        let ty = if left.ty == TypeDescriptor::Single && right.ty == TypeDescriptor::Single {
            TypeDescriptor::Single
        } else {
            TypeDescriptor::Double
        };
        let text = if op == BinaryOperator::Rem {
            format!("fmod({}, {})", left.expr, right.expr)
        } else {
            format!("{} {} {}", left.expr, op.symbol(), right.expr)
        };
        return Ok(Expression { ty, text });
    }

    let (l, r) = cast_operands(result, op.is_unsigned(), left, right);
    Ok(Expression {
        ty: canonical_type(result),
        text: format!("{l} {} {r}", op.symbol()),
    })
}

pub fn shift_expression(
    op: ShiftOperator,
    value: &SymbolicValue,
    amount: &SymbolicValue,
) -> Result<Expression, ErrorKind> {
    let valid_amount = matches!(amount.stack_type, StackType::Int32 | StackType::NativeInt);
    if !value.stack_type.is_integer() || !valid_amount {
        return Err(ErrorKind::InvalidOperandTypes(format!(
            "shift of {} by {}",
            value.stack_type, amount.stack_type
        )));
    }
    let text = match op {
        ShiftOperator::Shl => format!("{} << {}", value.expr, amount.expr),
        ShiftOperator::Shr => format!("{} >> {}", value.expr, amount.expr),
        ShiftOperator::ShrUn => format!(
            "({}){} >> {}",
            unsigned_name(value.stack_type),
            value.expr,
            amount.expr
        ),
    };
    Ok(Expression {
        ty: canonical_type(value.stack_type),
        text,
    })
}

pub fn unary_expression(op: UnaryOperator, value: &SymbolicValue) -> Result<Expression, ErrorKind> {
    let valid = match op {
        UnaryOperator::Neg => value.stack_type.is_integer() || value.stack_type == StackType::Float,
        UnaryOperator::Not => value.stack_type.is_integer(),
    };
    if !valid {
        return Err(ErrorKind::InvalidOperandTypes(format!(
            "{op:?} on {}",
            value.stack_type
        )));
    }
    let symbol = if op == UnaryOperator::Neg { "-" } else { "~" };
    let text = if value.expr.starts_with('-') {
        format!("{symbol}({})", value.expr)
    } else {
        format!("{symbol}{}", value.expr)
    };
    let ty = if value.stack_type == StackType::Float {
        value.ty.clone()
    } else {
        canonical_type(value.stack_type)
    };
    Ok(Expression { ty, text })
}

/// A C boolean expression comparing `left` with `right`.
pub fn compare_expression(
    op: CompareOperator,
    left: &SymbolicValue,
    right: &SymbolicValue,
) -> Result<String, ErrorKind> {
    let invalid = || {
        ErrorKind::InvalidOperandTypes(format!(
            "{} on {}",
            op.symbol(),
            operand_types(left, right)
        ))
    };

    match (left.stack_type, right.stack_type) {
        (StackType::ObjectRef, StackType::ObjectRef) => {
            // Object references only compare for identity; cgt.un is the
            // idiomatic "not null" test.
            let symbol = match op {
                CompareOperator::Eq => "==",
                CompareOperator::NeUn | CompareOperator::GtUn => "!=",
                _ => return Err(invalid()),
            };
            if left.ty == right.ty || left.ty == TypeDescriptor::Null || right.ty == TypeDescriptor::Null {
                Ok(format!("{} {symbol} {}", left.expr, right.expr))
            } else {
                Ok(format!("(void*){} {symbol} (void*){}", left.expr, right.expr))
            }
        }
        (StackType::ByRef, StackType::ByRef) => {
            if left.ty == right.ty {
                Ok(format!("{} {} {}", left.expr, op.symbol(), right.expr))
            } else {
                Ok(format!(
                    "(uintptr_t){} {} (uintptr_t){}",
                    left.expr,
                    op.symbol(),
                    right.expr
                ))
            }
        }
        (l, r) => {
            let result = binary_result(l, r).ok_or_else(invalid)?;
            if result == StackType::Float {
                return Ok(match op.float_complement() {
                    Some(complement) => format!("!({} {complement} {})", left.expr, right.expr),
                    None => format!("{} {} {}", left.expr, op.symbol(), right.expr),
                });
            }
            let (l, r) = cast_operands(result, op.is_unsigned(), left, right);
            Ok(format!("{l} {} {r}", op.symbol()))
        }
    }
}

/// Condition for `brtrue` (or `brfalse` when `negate`).
pub fn truth_test(value: &SymbolicValue, negate: bool) -> Result<String, ErrorKind> {
    let expr = &value.expr;
    match value.stack_type {
        StackType::Int32 if value.ty.is_boolean() => Ok(if negate {
            format!("!{expr}")
        } else {
            expr.clone()
        }),
        StackType::Int32 | StackType::Int64 | StackType::NativeInt => {
            Ok(format!("{expr} {} 0", if negate { "==" } else { "!=" }))
        }
        StackType::ObjectRef | StackType::ByRef => {
            Ok(format!("{expr} {} NULL", if negate { "==" } else { "!=" }))
        }
        StackType::Float => Err(ErrorKind::InvalidOperandTypes(format!(
            "branch on {}",
            value.stack_type
        ))),
    }
}

/// `conv.*`: convert `value` to the primitive `target`.
///
/// By-ref sources are only accepted when `from_pointer` is set (`conv.i`,
/// `conv.u`, `conv.i8`, `conv.u8`).
pub fn conversion_expression(
    target: &TypeDescriptor,
    value: &SymbolicValue,
    from_pointer: bool,
) -> Result<Expression, ErrorKind> {
    let valid = match value.stack_type {
        StackType::Int32 | StackType::Int64 | StackType::NativeInt | StackType::Float => true,
        StackType::ByRef => from_pointer,
        StackType::ObjectRef => false,
    };
    let c_name = primitive_c_name(target);
    match c_name {
        Some(name) if valid => Ok(Expression {
            ty: target.clone(),
            text: format!("({name}){}", value.expr),
        }),
        _ => Err(ErrorKind::InvalidOperandTypes(format!(
            "conversion of {} to {}",
            value.stack_type,
            target.full_name()
        ))),
    }
}

/// The right-hand side for storing `value` into a location of type
/// `target`, or `None` when no conversion exists.
pub fn right_expression(
    catalog: &dyn TypeCatalog,
    target: &TypeDescriptor,
    value: &SymbolicValue,
) -> Option<String> {
    let source = &value.ty;
    if target == source {
        return Some(value.expr.clone());
    }

    if target.is_reference() && source.is_reference() {
        if !catalog.is_assignable_from(target, source) {
            return None;
        }
        if *source == TypeDescriptor::Null {
            return Some(value.expr.clone());
        }
        return Some(format!(
            "({}){}",
            catalog.target_type_name(target, TypeNameFlags::default()),
            value.expr
        ));
    }

    let numeric = |ty: &TypeDescriptor| catalog.is_numeric_primitive(ty) || *ty == TypeDescriptor::Char;
    if numeric(source) {
        if numeric(target) {
            return Some(format!(
                "({}){}",
                catalog.target_type_name(target, TypeNameFlags::default()),
                value.expr
            ));
        }
        if target.is_boolean() {
            return Some(format!("{} ? true : false", value.expr));
        }
    } else if source.is_boolean() && numeric(target) {
        return Some(format!("{} ? 1 : 0", value.expr));
    }

    None
}

/// Like [`right_expression`], failing with `NoViableConversion`.
pub fn convert_for_store(
    catalog: &dyn TypeCatalog,
    target: &TypeDescriptor,
    value: &SymbolicValue,
) -> Result<String, ErrorKind> {
    right_expression(catalog, target, value).ok_or_else(|| ErrorKind::NoViableConversion {
        from: value.ty.full_name(),
        to: target.full_name(),
    })
}
