//! Plum - a PL/0 compiler and register virtual machine
//!
//! The pipeline has three stages, each usable on its own:
//! source text is scanned into a lexeme stream, the lexeme stream is
//! compiled into bytecode in a single recursive-descent pass, and the
//! bytecode is executed on a 16-register machine with an
//! activation-record stack.

pub mod compiler;
pub mod config;
pub mod error;
pub mod vm;

// Re-export commonly used types
pub use config::{Options, TraceFormat};
pub use error::{Error, Result};
pub use vm::{Instruction, Opcode, Program, VM};
