mod error;
mod ops;
mod stack;
mod vm;
pub mod bytecode;
pub mod trace;
pub mod verifier;

pub use error::VmError;
pub use ops::{Instruction, Opcode, syscall};
pub use stack::{ActivationRecord, RecordId, RecordStack};
pub use trace::{TraceOptions, Tracer};
pub use verifier::{VerifyError, Verifier};
pub use vm::{Cpu, Signal, VM};

/// Number of general-purpose registers in the CPU.
pub const REGISTER_COUNT: usize = 16;

/// Slot offset of the first local in an activation record.
///
/// Slot 0 is the return value and slots 1..=3 are bookkeeping.
pub const INT_OFFSET: i32 = 4;

/// Maximum number of instructions in a program.
pub const MAX_LINES: usize = 1000;

/// A flat, addressable sequence of instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub code: Vec<Instruction>,
}

impl Program {
    pub fn new(code: Vec<Instruction>) -> Self {
        Self { code }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn get(&self, address: i32) -> Option<&Instruction> {
        usize::try_from(address).ok().and_then(|i| self.code.get(i))
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(code: Vec<Instruction>) -> Self {
        Self::new(code)
    }
}
