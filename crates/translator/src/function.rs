//! Translation of one method body into a [`FunctionBody`].
//!
//! The translator walks the reachable blocks from offset 0, running the
//! handler of every instruction on a symbolic stack. At each block end the
//! live stack is merged into the successors' entry stacks, spilling into
//! slot variables where needed. Finalizing sorts the blocks by offset,
//! labels the jump targets and collects declarations.

use std::collections::{BTreeMap, BTreeSet};

use il2c_common::{DecodeError, Instruction, MethodBody, TypeDescriptor};
use tracing::{debug, instrument, trace};

use crate::body::{label, BasicBlock, FunctionBody, Statement, Variable};
use crate::catalog::{TypeCatalog, TypeNameFlags};
use crate::config::{DebugInformation, TranslatorConfig};
use crate::error::{ErrorKind, TranslateError};
use crate::frontier::{block_leaders, successors, Frontier};
use crate::handlers::{handler, local_name, parameter_name, Emitter, Terminator};
use crate::stack::{JoinTable, Merge, Temporaries};

/// Lifecycle of a [`FunctionTranslator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    Pending,
    Decoding,
    Finalizing,
    Done,
}

/// Translates a single method. Consumed by [`FunctionTranslator::translate`].
pub struct FunctionTranslator<'a> {
    catalog: &'a dyn TypeCatalog,
    config: &'a TranslatorConfig,
    method: &'a MethodBody,
    state: TranslatorState,
}

/// Result of one walk over a method's blocks.
enum Pass {
    Complete(Workspace),
    /// A reference join widened; the walk must be repeated with these joins.
    Widened(JoinTable),
}

/// Per-function mutable state shared across blocks.
struct Workspace {
    joins: JoinTable,
    temps: Temporaries,
    includes: BTreeSet<String>,
    blocks: BTreeMap<u32, Vec<Statement>>,
}

impl<'a> FunctionTranslator<'a> {
    pub fn new(
        catalog: &'a dyn TypeCatalog,
        config: &'a TranslatorConfig,
        method: &'a MethodBody,
    ) -> Self {
        Self {
            catalog,
            config,
            method,
            state: TranslatorState::Pending,
        }
    }

    pub fn state(&self) -> TranslatorState {
        self.state
    }

    fn fail(&self, at: u32, instr: Option<&Instruction>, kind: ErrorKind) -> TranslateError {
        TranslateError {
            function: self.method.name.clone(),
            at,
            opcode: instr.map(|i| i.opcode),
            kind,
        }
    }

    #[instrument(skip_all, fields(method = %self.method.name))]
    pub fn translate(mut self) -> Result<FunctionBody, TranslateError> {
        self.state = TranslatorState::Decoding;
        let code = &self.method.code;
        let instrs = self
            .method
            .decode()
            .map_err(|err| self.fail(err.offset(), None, err.into()))?;

        let mut index = vec![None; code.len()];
        for (i, instr) in instrs.iter().enumerate() {
            index[instr.offset as usize] = Some(i);
        }
        let leaders = block_leaders(&instrs, code.len());

        if instrs.is_empty() {
            let kind = ErrorKind::MalformedInput(DecodeError::FallsThroughEnd { at: 0 });
            return Err(self.fail(0, None, kind));
        }

        // Each retry widens at least one reference slot up its class chain,
        // so this terminates.
        let mut joins = JoinTable::new();
        let ws = loop {
            match self.translate_blocks(&instrs, &index, &leaders, joins)? {
                Pass::Complete(ws) => break ws,
                Pass::Widened(previous) => {
                    debug!("reference join widened, translating again");
                    joins = previous.restart();
                }
            }
        };

        self.state = TranslatorState::Finalizing;
        let body = self.finalize(ws);
        self.state = TranslatorState::Done;
        debug!(blocks = body.blocks.len(), "translated");
        Ok(body)
    }

    /// One walk over the reachable blocks, starting from `joins`.
    fn translate_blocks(
        &self,
        instrs: &[Instruction],
        index: &[Option<usize>],
        leaders: &[bool],
        joins: JoinTable,
    ) -> Result<Pass, TranslateError> {
        let mut ws = Workspace {
            joins,
            temps: Temporaries::default(),
            includes: BTreeSet::new(),
            blocks: BTreeMap::new(),
        };
        // The entry is a join point too: a back edge to it must arrive empty.
        ws.joins
            .merge_at(0, &[], self.catalog)
            .map_err(|kind| self.fail(0, None, kind))?;

        let mut frontier = Frontier::new(index.len());
        while let Some(start) = frontier.next() {
            debug!(block = %label(start), "translating block");
            let first = index[start as usize].unwrap_or(0);
            match self.translate_block(&instrs[first..], leaders, &mut ws)? {
                Some(successors) => {
                    for offset in successors {
                        frontier.enqueue(offset);
                    }
                }
                None => return Ok(Pass::Widened(ws.joins)),
            }
        }
        Ok(Pass::Complete(ws))
    }

    /// Translate the block starting at `instrs[0]`, record its statements,
    /// and return the offsets it flows to. `None` when merging into a
    /// successor widened a reference slot.
    fn translate_block(
        &self,
        instrs: &[Instruction],
        leaders: &[bool],
        ws: &mut Workspace,
    ) -> Result<Option<Vec<u32>>, TranslateError> {
        let start = instrs[0].offset;
        let stack = ws.joins.entry_stack(start).unwrap_or_default();
        let mut em = Emitter {
            catalog: self.catalog,
            method: self.method,
            stack,
            statements: Vec::new(),
            temps: &mut ws.temps,
            includes: &mut ws.includes,
            terminator: None,
        };

        let mut last = &instrs[0];
        for instr in instrs {
            last = instr;
            trace!(at = instr.offset, opcode = %instr.opcode, depth = em.stack.depth());
            match self.config.debug_information {
                DebugInformation::None => {}
                DebugInformation::CommentOnly => em.statements.push(Statement::Comment(format!(
                    "{}: {}",
                    label(instr.offset),
                    instr.opcode
                ))),
                DebugInformation::Full => em.statements.push(Statement::Comment(format!(
                    "{}: {} [depth {}]",
                    label(instr.offset),
                    instr.opcode,
                    em.stack.depth()
                ))),
            }

            let run = handler(instr.opcode).ok_or(ErrorKind::UnsupportedInstruction {
                value: instr.opcode as u16,
            });
            run.and_then(|h| h(&mut em, instr))
                .map_err(|kind| self.fail(instr.offset, Some(instr), kind))?;

            if em.terminator.is_some() {
                break;
            }
            let next = instr.next_offset();
            match leaders.get(next as usize) {
                None => {
                    let kind = ErrorKind::MalformedInput(DecodeError::FallsThroughEnd {
                        at: instr.offset,
                    });
                    return Err(self.fail(instr.offset, Some(instr), kind));
                }
                Some(true) => break,
                Some(false) => {}
            }
        }

        let Emitter {
            stack,
            mut statements,
            terminator,
            ..
        } = em;
        let terminator = terminator.unwrap_or(Terminator::Jump(last.next_offset()));
        let fallthrough = last.next_offset();

        let next_blocks = successors(last);

        let mut spills: Vec<Statement> = Vec::new();
        for &offset in &next_blocks {
            let merge = ws
                .joins
                .merge_at(offset, stack.entries(), self.catalog)
                .map_err(|kind| self.fail(last.offset, Some(last), kind))?;
            let Merge::Spills(assigns) = merge else {
                return Ok(None);
            };
            for assign in assigns {
                if !spills.contains(&assign) {
                    spills.push(assign);
                }
            }
        }

        // A condition reading a slot must be evaluated before the spills
        // overwrite it.
        let hoist = |expr: String,
                     reads_slot: bool,
                     ws: &mut Workspace,
                     statements: &mut Vec<Statement>| {
            if spills.is_empty() || !reads_slot {
                return expr;
            }
            let c_type = match &terminator {
                Terminator::Switch { .. } => "int32_t",
                _ => "bool",
            };
            let temp = ws.temps.allocate(c_type.to_string());
            statements.push(Statement::Assign {
                target: temp.clone(),
                expr,
            });
            temp
        };

        match terminator.clone() {
            Terminator::Jump(target) => {
                statements.extend(spills.iter().cloned());
                if target != fallthrough {
                    statements.push(Statement::Goto(target));
                }
            }
            Terminator::Conditional {
                cond,
                reads_slot,
                target,
                ..
            } => {
                let cond = hoist(cond, reads_slot, ws, &mut statements);
                statements.extend(spills.iter().cloned());
                statements.push(Statement::Branch { cond, target });
            }
            Terminator::Switch {
                selector,
                reads_slot,
                targets,
                ..
            } => {
                let selector = hoist(selector, reads_slot, ws, &mut statements);
                statements.extend(spills.iter().cloned());
                statements.push(Statement::Switch { selector, targets });
            }
            Terminator::Return(value) => statements.push(Statement::Return(value)),
        }

        ws.blocks.insert(start, statements);
        Ok(Some(next_blocks))
    }

    fn finalize(&self, ws: Workspace) -> FunctionBody {
        let Workspace {
            joins,
            temps,
            includes,
            blocks,
        } = ws;

        let targets: BTreeSet<u32> = blocks
            .values()
            .flatten()
            .flat_map(Statement::jump_targets)
            .collect();
        let blocks = blocks
            .into_iter()
            .map(|(offset, statements)| BasicBlock {
                offset,
                label: targets.contains(&offset).then(|| label(offset)),
                statements,
            })
            .collect();

        let c_type = |ty: &TypeDescriptor| self.catalog.target_type_name(ty, TypeNameFlags::default());
        let params = self
            .method
            .params
            .iter()
            .map(|p| Variable::new(parameter_name(self.catalog, &p.name), c_type(&p.ty)))
            .collect();
        let locals = self
            .method
            .locals
            .iter()
            .enumerate()
            .map(|(i, ty)| Variable::new(local_name(i as u16), c_type(ty)))
            .collect();

        FunctionBody {
            method: self.method.name.clone(),
            name: self.catalog.mangled_name(&self.method.name),
            return_type: c_type(&self.method.return_type),
            params,
            locals,
            temporaries: temps.into_variables(),
            stack_slots: joins.into_slots(),
            blocks,
            includes,
        }
    }
}
