//! Control-flow discovery.
//!
//! The frontier tracks, for every byte offset of a body, whether a block
//! starting there is unvisited, queued or already visited. Offset 0 starts
//! queued; visiting a block enqueues its successors. When the worklist is
//! empty every reachable block has been visited exactly once.

use std::collections::VecDeque;

use il2c_common::{FlowControl, Instruction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    Queued,
    Visited,
}

/// Worklist of block entry offsets with a dense state array.
#[derive(Debug, Clone)]
pub struct Frontier {
    states: Vec<VisitState>,
    worklist: VecDeque<u32>,
}

impl Frontier {
    /// A frontier over a body of `len` bytes, with offset 0 queued.
    pub fn new(len: usize) -> Self {
        let mut frontier = Self {
            states: vec![VisitState::Unvisited; len],
            worklist: VecDeque::new(),
        };
        frontier.enqueue(0);
        frontier
    }

    /// Queue `offset` unless it is already queued or visited. Returns true
    /// if it was newly queued.
    pub fn enqueue(&mut self, offset: u32) -> bool {
        match self.states.get_mut(offset as usize) {
            Some(state @ VisitState::Unvisited) => {
                *state = VisitState::Queued;
                self.worklist.push_back(offset);
                true
            }
            _ => false,
        }
    }

    /// Take the next queued offset and mark it visited.
    pub fn next(&mut self) -> Option<u32> {
        let offset = self.worklist.pop_front()?;
        self.states[offset as usize] = VisitState::Visited;
        Some(offset)
    }

    pub fn state(&self, offset: u32) -> Option<VisitState> {
        self.states.get(offset as usize).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.worklist.is_empty()
    }
}

/// Block leaders of a linearly decoded body: the entry, every branch or
/// switch target, and every instruction following a block-ending one.
pub fn block_leaders(instrs: &[Instruction], len: usize) -> Vec<bool> {
    let mut leaders = vec![false; len];
    if len == 0 {
        return leaders;
    }
    leaders[0] = true;
    for instr in instrs {
        for target in instr.targets() {
            leaders[target as usize] = true;
        }
        if instr.opcode.ends_block() {
            if let Some(next) = leaders.get_mut(instr.next_offset() as usize) {
                *next = true;
            }
        }
    }
    leaders
}

/// Successors of a block ending with `last`. Conditional branches and
/// switches also fall through; returns and throws have none.
pub fn successors(last: &Instruction) -> Vec<u32> {
    match last.opcode.flow() {
        FlowControl::Branch => last.targets(),
        FlowControl::CondBranch => {
            let mut targets = last.targets();
            targets.push(last.next_offset());
            targets
        }
        FlowControl::Return | FlowControl::Throw => Vec::new(),
        FlowControl::Next | FlowControl::Call => vec![last.next_offset()],
    }
}
