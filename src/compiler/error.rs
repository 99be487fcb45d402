use thiserror::Error;

use super::lexemes::LexemeError;
use super::queue::QueueError;
use super::symbols::SymbolError;

/// A code generation failure. Compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("symbol expected: {expected} (found {found})")]
    SymbolExpected { expected: &'static str, found: String },
    #[error("use = instead of :=")]
    BecomeInsteadOfEqual,
    #[error("{construct} must be followed by {expected}")]
    MustBeFollowedBy {
        construct: &'static str,
        expected: &'static str,
    },
    #[error("statement expected (found {found})")]
    StatementExpected { found: String },
    #[error("missing bisecting semicolon between statements (before {found})")]
    MissingSemicolon { found: String },
    #[error("identifier undeclared: {0}")]
    UndeclaredIdentifier(String),
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),
    #[error("identifier too large: {0}")]
    IdentifierTooLong(String),
    #[error("illegal assignment to constant or procedure: {0}")]
    IllegalAssignment(String),
    #[error("{construct} cannot begin with {found}")]
    IllegalTokenStart {
        construct: &'static str,
        found: String,
    },
    #[error("out of registers: expression needs more than {limit}")]
    OutOfRegisters { limit: usize },
    #[error("unexpected end of lexeme stream (expected {expected})")]
    UnexpectedEndOfStream { expected: &'static str },
    #[error("trailing lexemes after end of program: {found}")]
    TrailingTokens { found: String },
    #[error("program too long: more than {max} instructions")]
    ProgramTooLong { max: usize },
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Lexeme(#[from] LexemeError),
}

impl From<SymbolError> for CompileError {
    fn from(e: SymbolError) -> Self {
        match e {
            SymbolError::Duplicate(name) => CompileError::DuplicateIdentifier(name),
            SymbolError::NameTooLong(name) => CompileError::IdentifierTooLong(name),
        }
    }
}
