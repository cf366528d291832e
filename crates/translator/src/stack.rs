//! The symbolic evaluation stack and block-boundary merging.
//!
//! Stack entries are C expressions, not runtime values. Loads of locals,
//! arguments and constants are deferred: the entry is the variable name
//! itself. Everything computed is bound to a fresh `__tN` temporary first,
//! so every entry is an atomic expression.
//!
//! Entries that cross a block boundary are spilled into stack slot
//! variables named `__stack{depth}_{category}`; the successor starts with
//! those slots as its stack.

use std::collections::HashMap;

use il2c_common::{StackType, TypeDescriptor};

use crate::body::{Statement, Variable};
use crate::catalog::{TypeCatalog, TypeNameFlags};
use crate::error::ErrorKind;
use crate::promotion::{canonical_type, common_supertype, right_expression};

/// Where a stack entry's expression reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Constant,
    /// Deferred load of a local variable.
    Local(u16),
    /// Deferred load of an argument.
    Arg(u16),
    /// Address of a local or argument.
    Address,
    Temp,
    Slot,
}

/// One entry of the evaluation stack.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicValue {
    /// C expression text.
    pub expr: String,
    pub stack_type: StackType,
    /// Declared type the value was produced with.
    pub ty: TypeDescriptor,
    pub source: ValueSource,
}

impl SymbolicValue {
    /// A value of declared type `ty`. `void` is never pushed; it is given
    /// the int32 stack type only so this constructor stays total.
    pub fn new(expr: impl Into<String>, ty: TypeDescriptor, source: ValueSource) -> Self {
        let stack_type = ty.stack_type().unwrap_or(StackType::Int32);
        Self {
            expr: expr.into(),
            stack_type,
            ty,
            source,
        }
    }

    /// True when this entry is a deferred read of `storage`.
    pub fn reads(&self, storage: ValueSource) -> bool {
        self.source == storage
    }
}

/// LIFO of symbolic values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationStack {
    entries: Vec<SymbolicValue>,
}

impl EvaluationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<SymbolicValue>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, value: SymbolicValue) {
        self.entries.push(value);
    }

    pub fn pop(&mut self) -> Result<SymbolicValue, ErrorKind> {
        self.entries.pop().ok_or(ErrorKind::StackUnderflow)
    }

    pub fn peek(&self) -> Result<&SymbolicValue, ErrorKind> {
        self.entries.last().ok_or(ErrorKind::StackUnderflow)
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stack types from bottom to top.
    pub fn snapshot_types(&self) -> Vec<StackType> {
        self.entries.iter().map(|e| e.stack_type).collect()
    }

    pub fn entries(&self) -> &[SymbolicValue] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [SymbolicValue] {
        &mut self.entries
    }
}

/// Per-function allocator for `__tN` temporaries.
#[derive(Debug, Clone, Default)]
pub struct Temporaries {
    declared: Vec<Variable>,
}

impl Temporaries {
    /// Allocate the next temporary with C type `c_type`.
    pub fn allocate(&mut self, c_type: String) -> String {
        let name = format!("__t{}", self.declared.len());
        self.declared.push(Variable::new(name.clone(), c_type));
        name
    }

    pub fn into_variables(self) -> Vec<Variable> {
        self.declared
    }
}

/// Outcome of merging one edge into a join point.
#[derive(Debug, Clone, PartialEq)]
pub enum Merge {
    /// Assignments spilling the edge into the join's slot variables.
    Spills(Vec<Statement>),
    /// A reference slot had to widen to a common base type. Code already
    /// generated against the narrower type is stale.
    Widened,
}

/// Entry stacks of join points, and the slot variables they use.
#[derive(Debug, Default)]
pub struct JoinTable {
    joins: HashMap<u32, Vec<SymbolicValue>>,
    /// Widened declared types of reference slots, keyed by join offset and
    /// depth. Survives [`JoinTable::restart`].
    widened: HashMap<(u32, usize), TypeDescriptor>,
    /// Slot names keyed by depth and declared type.
    slot_names: HashMap<(usize, TypeDescriptor), String>,
    /// Number of distinct slots per depth and category.
    slot_counts: HashMap<(usize, StackType), usize>,
    slots: Vec<Variable>,
}

impl JoinTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table that remembers every widened reference slot type.
    pub fn restart(self) -> Self {
        Self {
            widened: self.widened,
            ..Self::default()
        }
    }

    /// The stack a block starting at `offset` begins with, if some edge
    /// into it has been merged.
    pub fn entry_stack(&self, offset: u32) -> Option<EvaluationStack> {
        self.joins
            .get(&offset)
            .map(|entries| EvaluationStack::from_entries(entries.clone()))
    }

    /// Record the edge carrying `incoming` into `offset`.
    ///
    /// The first edge fixes the depth and stack types at `offset`; later
    /// edges must match them exactly. A reference slot is typed by the
    /// common supertype of every edge seen so far; when an edge forces it
    /// wider the merge reports [`Merge::Widened`]. Otherwise it returns the
    /// assignments that spill `incoming` into the slots (identity
    /// assignments omitted).
    pub fn merge_at(
        &mut self,
        offset: u32,
        incoming: &[SymbolicValue],
        catalog: &dyn TypeCatalog,
    ) -> Result<Merge, ErrorKind> {
        if !self.joins.contains_key(&offset) {
            let entries: Vec<SymbolicValue> = incoming
                .iter()
                .enumerate()
                .map(|(depth, value)| self.slot_for(offset, depth, value, catalog))
                .collect();
            self.joins.insert(offset, entries);
        }
        let expected = &self.joins[&offset];

        let mismatch = || ErrorKind::StackMergeMismatch {
            target: offset,
            expected: describe(expected),
            found: describe(incoming),
        };
        let same_shape = expected.len() == incoming.len()
            && expected
                .iter()
                .zip(incoming)
                .all(|(slot, value)| slot.stack_type == value.stack_type);
        if !same_shape {
            return Err(mismatch());
        }

        let mut widened = false;
        for (depth, (slot, value)) in expected.iter().zip(incoming).enumerate() {
            if slot.stack_type != StackType::ObjectRef {
                continue;
            }
            let joined = common_supertype(catalog, &slot.ty, &value.ty);
            if joined != slot.ty {
                self.widened.insert((offset, depth), joined);
                widened = true;
            }
        }
        if widened {
            return Ok(Merge::Widened);
        }

        let mut spills = Vec::new();
        for (slot, value) in expected.iter().zip(incoming) {
            if slot.expr == value.expr {
                continue;
            }
            let expr = right_expression(catalog, &slot.ty, value).ok_or_else(mismatch)?;
            spills.push(Statement::Assign {
                target: slot.expr.clone(),
                expr,
            });
        }
        Ok(Merge::Spills(spills))
    }

    /// The slot variable holding entry `depth` of the join stack at
    /// `offset` whose first incoming value is `value`.
    fn slot_for(
        &mut self,
        offset: u32,
        depth: usize,
        value: &SymbolicValue,
        catalog: &dyn TypeCatalog,
    ) -> SymbolicValue {
        let ty = match value.stack_type {
            StackType::ObjectRef => self
                .widened
                .get(&(offset, depth))
                .cloned()
                .unwrap_or_else(|| value.ty.clone()),
            StackType::ByRef => value.ty.clone(),
            other => canonical_type(other),
        };

        let key = (depth, ty.clone());
        let name = match self.slot_names.get(&key) {
            Some(name) => name.clone(),
            None => {
                let count = self.slot_counts.entry((depth, value.stack_type)).or_insert(0);
                let base = format!("__stack{depth}_{}", value.stack_type.slot_suffix());
                let name = if *count == 0 {
                    base
                } else {
                    format!("{base}_{count}")
                };
                *count += 1;
                self.slots.push(Variable::new(
                    name.clone(),
                    catalog.target_type_name(&ty, TypeNameFlags::default()),
                ));
                self.slot_names.insert(key, name.clone());
                name
            }
        };

        SymbolicValue::new(name, ty, ValueSource::Slot)
    }

    /// Slot variables in creation order.
    pub fn into_slots(self) -> Vec<Variable> {
        self.slots
    }
}

/// Stack types bottom to top. Managed pointers carry their declared type,
/// since two of them merge only when those agree.
fn describe(values: &[SymbolicValue]) -> String {
    values
        .iter()
        .map(|v| match v.stack_type {
            StackType::ByRef => v.ty.full_name(),
            other => other.name().to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
