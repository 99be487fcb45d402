use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::compiler::CompileError;
use crate::compiler::lexemes::LexemeError;
use crate::compiler::lexer::ScanError;
use crate::config::ConfigError;
use crate::vm::bytecode::BytecodeError;
use crate::vm::{VerifyError, VmError};

/// Any failure of a pipeline stage.
#[derive(Debug, Error)]
pub enum Error {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{file}:{span}: {error}", span = error.span())]
    Scan { file: String, error: ScanError },
    #[error("scanning failed with {count} error(s)")]
    ScanFailed { count: usize },
    #[error(transparent)]
    Lexeme(#[from] LexemeError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),
    #[error("runtime error: {0}")]
    Runtime(#[from] VmError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
