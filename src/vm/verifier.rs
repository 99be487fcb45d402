//! Static bytecode verifier.
//!
//! Checks a loaded program before execution:
//! - every opcode is known
//! - register fields are in range for the opcodes that read them
//! - jump and call targets are instruction boundaries
//! - system call selectors are known
//!
//! Verification is optional; the VM faults on the same conditions at runtime.

use thiserror::Error;

use super::ops::{Opcode, syscall};
use super::{Program, REGISTER_COUNT};

/// Verification error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("empty program")]
    EmptyProgram,
    #[error("illegal opcode at pc={pc}: {code}")]
    IllegalOpcode { pc: usize, code: i32 },
    #[error("invalid register at pc={pc}: {index} is not a register")]
    InvalidRegister { pc: usize, index: i32 },
    #[error("invalid jump target at pc={pc}: target={target} is out of bounds")]
    InvalidJumpTarget { pc: usize, target: i32 },
    #[error("illegal system call at pc={pc}: {selector}")]
    IllegalSystemCall { pc: usize, selector: i32 },
}

/// Bytecode verifier
#[derive(Debug, Default)]
pub struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Self
    }

    /// Verify a program
    pub fn verify(&self, program: &Program) -> Result<(), VerifyError> {
        if program.is_empty() {
            return Err(VerifyError::EmptyProgram);
        }

        for (pc, inst) in program.code.iter().enumerate() {
            let op = Opcode::try_from(inst.op)
                .map_err(|code| VerifyError::IllegalOpcode { pc, code })?;

            let (uses_r, uses_l, uses_m) = op.register_operands();
            let uses_r = uses_r && !(op == Opcode::Sio && inst.m == syscall::KILL);
            for (used, index) in [(uses_r, inst.r), (uses_l, inst.l), (uses_m, inst.m)] {
                if used && !is_register(index) {
                    return Err(VerifyError::InvalidRegister { pc, index });
                }
            }

            match op {
                Opcode::Jmp | Opcode::Jpc | Opcode::Cal => {
                    if !(0..program.len() as i32).contains(&inst.m) {
                        return Err(VerifyError::InvalidJumpTarget { pc, target: inst.m });
                    }
                }
                Opcode::Sio => {
                    if !matches!(inst.m, syscall::WRITE | syscall::READ | syscall::KILL) {
                        return Err(VerifyError::IllegalSystemCall {
                            pc,
                            selector: inst.m,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn is_register(index: i32) -> bool {
    usize::try_from(index).is_ok_and(|i| i < REGISTER_COUNT)
}
