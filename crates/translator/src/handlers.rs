//! The opcode translator table.
//!
//! Each supported opcode maps to one handler. A handler pops its operands
//! from the symbolic stack, appends statements to the current block and
//! pushes its result. Block-ending opcodes leave a [`Terminator`] for the
//! function translator, which owns successor bookkeeping.

use std::collections::BTreeSet;

use il2c_common::{
    FieldDef, Instruction, MethodBody, Opcode, Operand, StackType, Token, TypeDescriptor,
};

use crate::body::Statement;
use crate::catalog::{TypeCatalog, TypeNameFlags};
use crate::error::ErrorKind;
use crate::promotion::{
    binary_expression, compare_expression, conversion_expression, convert_for_store,
    shift_expression, truth_test, unary_expression, BinaryOperator, CompareOperator, Expression,
    ShiftOperator, UnaryOperator,
};
use crate::stack::{EvaluationStack, SymbolicValue, Temporaries, ValueSource};

/// Header declaring `fmod`, `NAN` and `INFINITY`.
pub const MATH_HEADER: &str = "math.h";

/// How a block ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Jump(u32),
    Conditional {
        cond: String,
        /// The condition reads a stack slot variable.
        reads_slot: bool,
        target: u32,
        fallthrough: u32,
    },
    Switch {
        selector: String,
        reads_slot: bool,
        targets: Vec<u32>,
        fallthrough: u32,
    },
    Return(Option<String>),
}

/// Mutable translation state borrowed by every handler.
pub struct Emitter<'a> {
    pub catalog: &'a dyn TypeCatalog,
    pub method: &'a MethodBody,
    pub stack: EvaluationStack,
    pub statements: Vec<Statement>,
    pub temps: &'a mut Temporaries,
    pub includes: &'a mut BTreeSet<String>,
    pub terminator: Option<Terminator>,
}

impl<'a> Emitter<'a> {
    fn c_type(&self, ty: &TypeDescriptor) -> String {
        self.catalog.target_type_name(ty, TypeNameFlags::default())
    }

    /// Bind `expr` to a fresh temporary and push it.
    fn push_temp(&mut self, expr: Expression) {
        let c_type = self.c_type(&expr.ty);
        let name = self.temps.allocate(c_type);
        self.statements.push(Statement::Assign {
            target: name.clone(),
            expr: expr.text,
        });
        self.stack.push(SymbolicValue::new(name, expr.ty, ValueSource::Temp));
    }

    /// Copy every deferred load matching `pred` into a temporary, so a
    /// following store cannot change what the stack entry reads.
    fn materialize(&mut self, pred: impl Fn(&SymbolicValue) -> bool) {
        for i in 0..self.stack.depth() {
            let entry = &self.stack.entries()[i];
            if !pred(entry) {
                continue;
            }
            let ty = entry.ty.clone();
            let expr = entry.expr.clone();
            let c_type = self.c_type(&ty);
            let name = self.temps.allocate(c_type);
            self.statements.push(Statement::Assign {
                target: name.clone(),
                expr,
            });
            let entry = &mut self.stack.entries_mut()[i];
            entry.expr = name;
            entry.source = ValueSource::Temp;
        }
    }

    fn materialize_variables(&mut self) {
        self.materialize(|v| matches!(v.source, ValueSource::Local(_) | ValueSource::Arg(_)));
    }

    fn arg(&self, index: u16) -> Result<(String, TypeDescriptor), ErrorKind> {
        let param = self
            .method
            .params
            .get(index as usize)
            .ok_or(ErrorKind::InvalidIndex {
                what: "argument",
                index,
                count: self.method.params.len(),
            })?;
        Ok((parameter_name(self.catalog, &param.name), param.ty.clone()))
    }

    fn local(&self, index: u16) -> Result<(String, TypeDescriptor), ErrorKind> {
        let ty = self
            .method
            .locals
            .get(index as usize)
            .ok_or(ErrorKind::InvalidIndex {
                what: "local",
                index,
                count: self.method.locals.len(),
            })?;
        Ok((local_name(index), ty.clone()))
    }
}

/// C name of local variable `index`.
pub fn local_name(index: u16) -> String {
    format!("local{index}")
}

/// C name of a parameter. Names the translator generates itself (`localN`,
/// `__tN`, `__stack*`) and anything already starting with `_arg_` get an
/// `_arg_` prefix, which keeps distinct parameters distinct.
pub fn parameter_name(catalog: &dyn TypeCatalog, name: &str) -> String {
    let name = catalog.mangled_name(name);
    let numbered = |prefix: &str| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    };
    let reserved = numbered("local")
        || numbered("__t")
        || name.starts_with("__stack")
        || name.starts_with("_arg_");
    if reserved {
        format!("_arg_{name}")
    } else {
        name
    }
}

/// C name of a static field.
pub fn static_field_name(catalog: &dyn TypeCatalog, declaring_type: &str, name: &str) -> String {
    format!(
        "{}_{}",
        catalog.mangled_name(declaring_type),
        catalog.mangled_name(name)
    )
}

pub type Handler = fn(&mut Emitter<'_>, &Instruction) -> Result<(), ErrorKind>;

/// The handler for `opcode`, or `None` if it is not supported.
pub fn handler(opcode: Opcode) -> Option<Handler> {
    use Opcode::*;
    let h: Handler = match opcode {
        Nop => nop,
        Ldarg0 | Ldarg1 | Ldarg2 | Ldarg3 | LdargS => load_arg,
        LdargaS => load_arg_address,
        StargS => store_arg,
        Ldloc0 | Ldloc1 | Ldloc2 | Ldloc3 | LdlocS => load_local,
        LdlocaS => load_local_address,
        Stloc0 | Stloc1 | Stloc2 | Stloc3 | StlocS => store_local,
        Ldnull => load_null,
        LdcI4M1 | LdcI4_0 | LdcI4_1 | LdcI4_2 | LdcI4_3 | LdcI4_4 | LdcI4_5 | LdcI4_6
        | LdcI4_7 | LdcI4_8 | LdcI4S | LdcI4 | LdcI8 | LdcR4 | LdcR8 => load_constant,
        Dup => dup,
        Pop => pop,
        Call => call,
        Ret => ret,
        Br | BrS => branch,
        Brtrue | BrtrueS | Brfalse | BrfalseS => branch_truth,
        Beq | BeqS | Bge | BgeS | Bgt | BgtS | Ble | BleS | Blt | BltS | BneUn | BneUnS
        | BgeUn | BgeUnS | BgtUn | BgtUnS | BleUn | BleUnS | BltUn | BltUnS => branch_compare,
        Switch => switch,
        LdindI4 | LdindI8 => load_indirect,
        StindI4 | StindI8 => store_indirect,
        Add | Sub | Mul | Div | DivUn | Rem | RemUn | And | Or | Xor => binary,
        Shl | Shr | ShrUn => shift,
        Neg | Not => unary,
        ConvI1 | ConvI2 | ConvI4 | ConvI8 | ConvU1 | ConvU2 | ConvU4 | ConvU8 | ConvR4
        | ConvR8 | ConvI | ConvU => convert,
        Ceq | Cgt | CgtUn | Clt | CltUn => compare,
        Ldfld => load_field,
        Stfld => store_field,
        Ldsfld => load_static_field,
        Stsfld => store_static_field,
        Break | Jmp | Calli | Callvirt | Ldstr | Newobj | Unbox | Throw | Box | Ldlen => {
            return None
        }
    };
    Some(h)
}

// The decoder guarantees each opcode's operand kind, so the fallbacks in
// these accessors are never taken.

fn var_operand(instr: &Instruction) -> u16 {
    use Opcode::*;
    match instr.opcode {
        Ldarg0 | Ldloc0 | Stloc0 => 0,
        Ldarg1 | Ldloc1 | Stloc1 => 1,
        Ldarg2 | Ldloc2 | Stloc2 => 2,
        Ldarg3 | Ldloc3 | Stloc3 => 3,
        _ => match instr.operand {
            Operand::Var(index) => index,
            _ => 0,
        },
    }
}

fn token_operand(instr: &Instruction) -> Token {
    match instr.operand {
        Operand::Token(token) => token,
        _ => Token(0),
    }
}

fn target_operand(instr: &Instruction) -> u32 {
    match instr.operand {
        Operand::Target(target) => target,
        _ => instr.next_offset(),
    }
}

fn nop(_: &mut Emitter<'_>, _: &Instruction) -> Result<(), ErrorKind> {
    Ok(())
}

fn load_arg(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let index = var_operand(instr);
    let (name, ty) = em.arg(index)?;
    em.stack.push(SymbolicValue::new(name, ty, ValueSource::Arg(index)));
    Ok(())
}

fn load_arg_address(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let (name, ty) = em.arg(var_operand(instr))?;
    em.stack
        .push(SymbolicValue::new(format!("&{name}"), ty.by_ref(), ValueSource::Address));
    Ok(())
}

fn store_arg(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let index = var_operand(instr);
    let (name, ty) = em.arg(index)?;
    let value = em.stack.pop()?;
    let rhs = convert_for_store(em.catalog, &ty, &value)?;
    em.materialize(|v| v.reads(ValueSource::Arg(index)));
    em.statements.push(Statement::Assign {
        target: name,
        expr: rhs,
    });
    Ok(())
}

fn load_local(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let index = var_operand(instr);
    let (name, ty) = em.local(index)?;
    em.stack.push(SymbolicValue::new(name, ty, ValueSource::Local(index)));
    Ok(())
}

fn load_local_address(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let (name, ty) = em.local(var_operand(instr))?;
    em.stack
        .push(SymbolicValue::new(format!("&{name}"), ty.by_ref(), ValueSource::Address));
    Ok(())
}

fn store_local(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let index = var_operand(instr);
    let (name, ty) = em.local(index)?;
    let value = em.stack.pop()?;
    let rhs = convert_for_store(em.catalog, &ty, &value)?;
    em.materialize(|v| v.reads(ValueSource::Local(index)));
    em.statements.push(Statement::Assign {
        target: name,
        expr: rhs,
    });
    Ok(())
}

fn load_null(em: &mut Emitter<'_>, _: &Instruction) -> Result<(), ErrorKind> {
    em.stack.push(SymbolicValue::new(
        "NULL",
        TypeDescriptor::Null,
        ValueSource::Constant,
    ));
    Ok(())
}

/// C literal for a 32-bit integer.
pub fn int32_literal(value: i32) -> String {
    if value == i32::MIN {
        "INT32_MIN".to_string()
    } else {
        value.to_string()
    }
}

/// C literal for a 64-bit integer.
pub fn int64_literal(value: i64) -> String {
    if value == i64::MIN {
        "INT64_MIN".to_string()
    } else {
        format!("{value}LL")
    }
}

/// C literal for a float, and whether it needs the `math.h` macros.
fn float_literal(value: f64, suffix: &str) -> (String, bool) {
    if value.is_nan() {
        ("NAN".to_string(), true)
    } else if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        (format!("{sign}INFINITY"), true)
    } else {
        (format!("{value:?}{suffix}"), false)
    }
}

fn load_constant(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    use Opcode::*;
    let small = |n: i32| (int32_literal(n), TypeDescriptor::Int32);
    let (expr, ty) = match (instr.opcode, &instr.operand) {
        (LdcI4M1, _) => small(-1),
        (LdcI4_0, _) => small(0),
        (LdcI4_1, _) => small(1),
        (LdcI4_2, _) => small(2),
        (LdcI4_3, _) => small(3),
        (LdcI4_4, _) => small(4),
        (LdcI4_5, _) => small(5),
        (LdcI4_6, _) => small(6),
        (LdcI4_7, _) => small(7),
        (LdcI4_8, _) => small(8),
        (_, Operand::Int32(v)) => small(*v),
        (_, Operand::Int64(v)) => (int64_literal(*v), TypeDescriptor::Int64),
        (_, Operand::Float32(v)) => {
            let (text, math) = if v.is_finite() {
                (format!("{v:?}f"), false)
            } else {
                float_literal(*v as f64, "f")
            };
            if math {
                em.includes.insert(MATH_HEADER.to_string());
            }
            (text, TypeDescriptor::Single)
        }
        (_, Operand::Float64(v)) => {
            let (text, math) = float_literal(*v, "");
            if math {
                em.includes.insert(MATH_HEADER.to_string());
            }
            (text, TypeDescriptor::Double)
        }
        _ => small(0),
    };
    em.stack.push(SymbolicValue::new(expr, ty, ValueSource::Constant));
    Ok(())
}

fn dup(em: &mut Emitter<'_>, _: &Instruction) -> Result<(), ErrorKind> {
    let top = em.stack.peek()?.clone();
    em.stack.push(top);
    Ok(())
}

fn pop(em: &mut Emitter<'_>, _: &Instruction) -> Result<(), ErrorKind> {
    em.stack.pop()?;
    Ok(())
}

fn call(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let token = token_operand(instr);
    let callee = em
        .catalog
        .resolve_method(token)
        .ok_or(ErrorKind::UnresolvedToken(token))?;

    let mut args = Vec::with_capacity(callee.params.len());
    for ty in callee.params.iter().rev() {
        let value = em.stack.pop()?;
        args.push(convert_for_store(em.catalog, ty, &value)?);
    }
    args.reverse();

    // The callee may write into any local or argument whose address escaped.
    em.materialize_variables();

    let function = match &callee.native {
        Some(native) => {
            em.includes.insert(native.include_file.clone());
            native.symbol.clone().unwrap_or_else(|| {
                callee
                    .name
                    .rsplit('.')
                    .next()
                    .unwrap_or(&callee.name)
                    .to_string()
            })
        }
        None => em.catalog.mangled_name(&callee.name),
    };
    let text = format!("{function}({})", args.join(", "));

    if callee.return_type == TypeDescriptor::Void {
        em.statements.push(Statement::Eval(text));
    } else {
        em.push_temp(Expression {
            ty: callee.return_type,
            text,
        });
    }
    Ok(())
}

fn ret(em: &mut Emitter<'_>, _: &Instruction) -> Result<(), ErrorKind> {
    let arity = em.method.return_arity();
    let value = if arity == 1 {
        let value = em.stack.pop()?;
        Some(convert_for_store(em.catalog, &em.method.return_type, &value)?)
    } else {
        None
    };
    if !em.stack.is_empty() {
        return Err(ErrorKind::NonEmptyStackAtReturn {
            depth: em.stack.depth() + arity,
            expected: arity,
        });
    }
    em.terminator = Some(Terminator::Return(value));
    Ok(())
}

fn branch(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    em.terminator = Some(Terminator::Jump(target_operand(instr)));
    Ok(())
}

fn branch_truth(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let negate = matches!(instr.opcode, Opcode::Brfalse | Opcode::BrfalseS);
    let value = em.stack.pop()?;
    em.terminator = Some(Terminator::Conditional {
        cond: truth_test(&value, negate)?,
        reads_slot: value.reads(ValueSource::Slot),
        target: target_operand(instr),
        fallthrough: instr.next_offset(),
    });
    Ok(())
}

fn branch_compare(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    use Opcode::*;
    let op = match instr.opcode {
        Beq | BeqS => CompareOperator::Eq,
        BneUn | BneUnS => CompareOperator::NeUn,
        Bge | BgeS => CompareOperator::Ge,
        BgeUn | BgeUnS => CompareOperator::GeUn,
        Bgt | BgtS => CompareOperator::Gt,
        BgtUn | BgtUnS => CompareOperator::GtUn,
        Ble | BleS => CompareOperator::Le,
        BleUn | BleUnS => CompareOperator::LeUn,
        Blt | BltS => CompareOperator::Lt,
        _ => CompareOperator::LtUn,
    };
    let right = em.stack.pop()?;
    let left = em.stack.pop()?;
    em.terminator = Some(Terminator::Conditional {
        cond: compare_expression(op, &left, &right)?,
        reads_slot: left.reads(ValueSource::Slot) || right.reads(ValueSource::Slot),
        target: target_operand(instr),
        fallthrough: instr.next_offset(),
    });
    Ok(())
}

fn switch(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let selector = em.stack.pop()?;
    if !matches!(selector.stack_type, StackType::Int32 | StackType::NativeInt) {
        return Err(ErrorKind::InvalidOperandTypes(format!(
            "switch on {}",
            selector.stack_type
        )));
    }
    em.terminator = Some(Terminator::Switch {
        reads_slot: selector.reads(ValueSource::Slot),
        selector: selector.expr,
        targets: instr.targets(),
        fallthrough: instr.next_offset(),
    });
    Ok(())
}

fn indirect_type(opcode: Opcode) -> TypeDescriptor {
    match opcode {
        Opcode::LdindI8 | Opcode::StindI8 => TypeDescriptor::Int64,
        _ => TypeDescriptor::Int32,
    }
}

/// `*addr`, casting the pointer when it does not point at `ty`.
fn dereference(
    em: &Emitter<'_>,
    address: &SymbolicValue,
    ty: &TypeDescriptor,
) -> Result<String, ErrorKind> {
    match (&address.stack_type, &address.ty) {
        (StackType::ByRef, TypeDescriptor::ByRef(elem)) if **elem == *ty => {
            Ok(format!("*{}", address.expr))
        }
        (StackType::ByRef | StackType::NativeInt, _) => {
            Ok(format!("*({}*){}", em.c_type(ty), address.expr))
        }
        (other, _) => Err(ErrorKind::InvalidOperandTypes(format!(
            "indirect access through {other}"
        ))),
    }
}

fn load_indirect(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let ty = indirect_type(instr.opcode);
    let address = em.stack.pop()?;
    let text = dereference(em, &address, &ty)?;
    em.push_temp(Expression { ty, text });
    Ok(())
}

fn store_indirect(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let ty = indirect_type(instr.opcode);
    let value = em.stack.pop()?;
    let address = em.stack.pop()?;
    let target = dereference(em, &address, &ty)?;
    let rhs = convert_for_store(em.catalog, &ty, &value)?;
    // The pointer may alias any local or argument.
    em.materialize_variables();
    em.statements.push(Statement::Assign { target, expr: rhs });
    Ok(())
}

fn binary(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    use Opcode::*;
    let op = match instr.opcode {
        Add => BinaryOperator::Add,
        Sub => BinaryOperator::Sub,
        Mul => BinaryOperator::Mul,
        Div => BinaryOperator::Div,
        DivUn => BinaryOperator::DivUn,
        Rem => BinaryOperator::Rem,
        RemUn => BinaryOperator::RemUn,
        And => BinaryOperator::And,
        Or => BinaryOperator::Or,
        _ => BinaryOperator::Xor,
    };
    let right = em.stack.pop()?;
    let left = em.stack.pop()?;
    let expr = binary_expression(op, &left, &right)?;
    if op == BinaryOperator::Rem && left.stack_type == StackType::Float {
        em.includes.insert(MATH_HEADER.to_string());
    }
    em.push_temp(expr);
    Ok(())
}

fn shift(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let op = match instr.opcode {
        Opcode::Shl => ShiftOperator::Shl,
        Opcode::Shr => ShiftOperator::Shr,
        _ => ShiftOperator::ShrUn,
    };
    let amount = em.stack.pop()?;
    let value = em.stack.pop()?;
    let expr = shift_expression(op, &value, &amount)?;
    em.push_temp(expr);
    Ok(())
}

fn unary(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let op = if instr.opcode == Opcode::Neg {
        UnaryOperator::Neg
    } else {
        UnaryOperator::Not
    };
    let value = em.stack.pop()?;
    let expr = unary_expression(op, &value)?;
    em.push_temp(expr);
    Ok(())
}

fn convert(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    use Opcode::*;
    let target = match instr.opcode {
        ConvI1 => TypeDescriptor::SByte,
        ConvI2 => TypeDescriptor::Int16,
        ConvI4 => TypeDescriptor::Int32,
        ConvI8 => TypeDescriptor::Int64,
        ConvU1 => TypeDescriptor::Byte,
        ConvU2 => TypeDescriptor::UInt16,
        ConvU4 => TypeDescriptor::UInt32,
        ConvU8 => TypeDescriptor::UInt64,
        ConvR4 => TypeDescriptor::Single,
        ConvR8 => TypeDescriptor::Double,
        ConvI => TypeDescriptor::IntPtr,
        _ => TypeDescriptor::UIntPtr,
    };
    let from_pointer = matches!(instr.opcode, ConvI | ConvU | ConvI8 | ConvU8);
    let value = em.stack.pop()?;
    let expr = conversion_expression(&target, &value, from_pointer)?;
    em.push_temp(expr);
    Ok(())
}

fn compare(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let op = match instr.opcode {
        Opcode::Ceq => CompareOperator::Eq,
        Opcode::Cgt => CompareOperator::Gt,
        Opcode::CgtUn => CompareOperator::GtUn,
        Opcode::Clt => CompareOperator::Lt,
        _ => CompareOperator::LtUn,
    };
    let right = em.stack.pop()?;
    let left = em.stack.pop()?;
    let text = compare_expression(op, &left, &right)?;
    em.push_temp(Expression {
        ty: TypeDescriptor::Boolean,
        text,
    });
    Ok(())
}

fn resolve_field(
    em: &Emitter<'_>,
    instr: &Instruction,
    want_static: bool,
) -> Result<FieldDef, ErrorKind> {
    let token = token_operand(instr);
    let field = em
        .catalog
        .resolve_field(token)
        .ok_or(ErrorKind::UnresolvedToken(token))?;
    if field.is_static != want_static {
        let kind = if field.is_static { "static" } else { "instance" };
        return Err(ErrorKind::InvalidOperandTypes(format!(
            "{} on {kind} field {}",
            instr.opcode,
            field.full_name()
        )));
    }
    Ok(field)
}

/// `obj->field`, casting `obj` to the declaring class when needed.
fn field_access(
    em: &Emitter<'_>,
    object: &SymbolicValue,
    field: &FieldDef,
) -> Result<String, ErrorKind> {
    if object.stack_type != StackType::ObjectRef {
        return Err(ErrorKind::InvalidOperandTypes(format!(
            "field access through {}",
            object.stack_type
        )));
    }
    let declaring = TypeDescriptor::Class(field.declaring_type.clone());
    let name = em.catalog.mangled_name(&field.name);
    if object.ty == declaring {
        Ok(format!("{}->{name}", object.expr))
    } else {
        Ok(format!("(({}){})->{name}", em.c_type(&declaring), object.expr))
    }
}

fn load_field(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let field = resolve_field(em, instr, false)?;
    let object = em.stack.pop()?;
    let text = field_access(em, &object, &field)?;
    em.push_temp(Expression { ty: field.ty, text });
    Ok(())
}

fn store_field(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let field = resolve_field(em, instr, false)?;
    let value = em.stack.pop()?;
    let object = em.stack.pop()?;
    let target = field_access(em, &object, &field)?;
    let rhs = convert_for_store(em.catalog, &field.ty, &value)?;
    em.statements.push(Statement::Assign { target, expr: rhs });
    Ok(())
}

fn load_static_field(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let field = resolve_field(em, instr, true)?;
    let text = static_field_name(em.catalog, &field.declaring_type, &field.name);
    em.push_temp(Expression { ty: field.ty, text });
    Ok(())
}

fn store_static_field(em: &mut Emitter<'_>, instr: &Instruction) -> Result<(), ErrorKind> {
    let field = resolve_field(em, instr, true)?;
    let value = em.stack.pop()?;
    let rhs = convert_for_store(em.catalog, &field.ty, &value)?;
    em.statements.push(Statement::Assign {
        target: static_field_name(em.catalog, &field.declaring_type, &field.name),
        expr: rhs,
    });
    Ok(())
}
