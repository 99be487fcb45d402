use std::io;

use thiserror::Error;

/// Faults raised while executing a program.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("invalid register: {index}")]
    InvalidRegister { index: i32 },
    #[error("invalid static parent: {levels} level(s) up from the current record")]
    InvalidStaticParent { levels: i32 },
    #[error("local out of bounds: slot {slot} (record has {count} local(s))")]
    LocalOutOfBounds { slot: i32, count: usize },
    #[error("locals already allocated for the current record")]
    LocalsAlreadyAllocated,
    #[error("divide by zero at pc={pc}")]
    DivideByZero { pc: i32 },
    #[error("illegal opcode: {code}")]
    IllegalOpcode { code: i32 },
    #[error("illegal system call: {selector}")]
    IllegalSystemCall { selector: i32 },
    #[error("program counter out of bounds: {pc}")]
    ProgramCounterOutOfBounds { pc: i32 },
    #[error("no activation record on the stack")]
    EmptyRecordStack,
    #[error("read failed: end of input")]
    InputExhausted,
    #[error("read failed: '{text}' is not an integer")]
    InvalidInput { text: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
