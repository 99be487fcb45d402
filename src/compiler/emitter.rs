//! Instruction emission with backpatching.
//!
//! At nesting depth 0 instructions go straight into the program. Inside an
//! `if` or `while` they are queued, and the queue is drained into the
//! program once the outermost construct closes. Each open construct owes
//! exactly one `JPC`, spliced in after its condition when the construct is
//! closed, so the final address of the next queued instruction is
//! `program_counter + queued + depth`.

use log::trace;

use super::error::CompileError;
use super::queue::{InstructionQueue, NodeHandle};
use crate::vm::{Instruction, MAX_LINES, Opcode, Program};

#[derive(Debug, Default)]
pub struct Emitter {
    program: Program,
    queue: InstructionQueue,
    depth: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions written to the program so far.
    pub fn program_counter(&self) -> usize {
        self.program.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Final address of the next emitted instruction.
    pub fn next_address(&self) -> i32 {
        (self.program_counter() + self.queued() + self.depth) as i32
    }

    pub fn emit(&mut self, instruction: Instruction) -> Result<(), CompileError> {
        if self.depth > 0 {
            self.queue.enqueue(instruction);
            Ok(())
        } else {
            write(&mut self.program, instruction)
        }
    }

    /// Enter an `if`/`while`. Returns the address its code starts at.
    pub fn open_nested(&mut self) -> i32 {
        let start = self.next_address();
        self.depth += 1;
        start
    }

    /// Insertion point for the conditional jump of the innermost construct.
    pub fn mark(&self) -> Option<NodeHandle> {
        self.queue.tail()
    }

    /// Splice `JPC register 0 target` after `mark`, where `target` is the
    /// address following everything emitted so far.
    pub fn patch_conditional(
        &mut self,
        mark: Option<NodeHandle>,
        register: i32,
    ) -> Result<(), CompileError> {
        let target = self.next_address();
        let jump = Instruction::new(Opcode::Jpc, register, 0, target);
        match mark {
            Some(after) => {
                self.queue.insert_after(after, jump)?;
            }
            None => {
                self.queue.push_front(jump);
            }
        }
        trace!("patched JPC -> {} at depth {}", target, self.depth);
        Ok(())
    }

    /// Leave an `if`/`while`, draining the queue at depth 0.
    pub fn close_nested(&mut self) -> Result<(), CompileError> {
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 {
            return Ok(());
        }
        let program = &mut self.program;
        let drained = self.queue.drain(|instruction| write(program, instruction))?;
        trace!("drained {} queued instructions", drained);
        Ok(())
    }

    pub fn finish(self) -> Program {
        self.program
    }
}

fn write(program: &mut Program, instruction: Instruction) -> Result<(), CompileError> {
    if program.len() >= MAX_LINES {
        return Err(CompileError::ProgramTooLong { max: MAX_LINES });
    }
    program.code.push(instruction);
    Ok(())
}
