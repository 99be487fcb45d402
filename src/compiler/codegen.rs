//! Recursive-descent code generator.
//!
//! One method per grammar production. Tokens are pulled from a
//! [`TokenSource`] one at a time and instructions are handed to the
//! [`Emitter`], which takes care of backpatching conditional jumps.
//!
//! ```text
//! program    := block "."
//! block      := ["const" id "=" num {"," id "=" num} ";"]
//!               ["var" id {"," id} ";"]
//!               statement {";" statement}
//! statement  := id ":=" expression
//!             | "begin" statement {";" statement} "end"
//!             | "if" condition "then" statement
//!             | "while" condition "do" statement
//!             | "read" id
//!             | "write" id
//!             | ε
//! condition  := "odd" expression | expression relop expression
//! expression := ["+"|"-"] term {("+"|"-") term}
//! term       := factor {("*"|"/") factor}
//! factor     := id | num | "(" expression ")"
//! ```

use log::debug;

use super::emitter::Emitter;
use super::error::CompileError;
use super::lexemes::TokenSource;
use super::lexer::TokenKind;
use super::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::vm::{INT_OFFSET, Instruction, Opcode, Program, REGISTER_COUNT, syscall};

/// Result of a successful compilation.
#[derive(Debug)]
pub struct CompileOutput {
    pub program: Program,
    pub symbols: SymbolTable,
}

pub struct Codegen<S> {
    tokens: S,
    current: Option<TokenKind>,
    symbols: SymbolTable,
    emitter: Emitter,
    level: usize,
}

impl<S: TokenSource> Codegen<S> {
    pub fn new(tokens: S) -> Self {
        Self {
            tokens,
            current: None,
            symbols: SymbolTable::new(),
            emitter: Emitter::new(),
            level: 0,
        }
    }

    pub fn compile(mut self) -> Result<CompileOutput, CompileError> {
        self.advance()?;
        self.program()?;

        let program = self.emitter.finish();
        debug!(
            "generated {} instructions for {} symbols",
            program.len(),
            self.symbols.size()
        );
        Ok(CompileOutput {
            program,
            symbols: self.symbols,
        })
    }

    // ========================================
    // Token cursor
    // ========================================

    fn advance(&mut self) -> Result<(), CompileError> {
        self.current = self.tokens.next_token()?;
        Ok(())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current.as_ref() == Some(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> Result<bool, CompileError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn found(&self) -> String {
        match &self.current {
            Some(kind) => kind.to_string(),
            None => "end of input".to_string(),
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), CompileError> {
        if self.match_token(kind)? {
            return Ok(());
        }
        Err(match self.current {
            None => CompileError::UnexpectedEndOfStream { expected },
            Some(_) => CompileError::SymbolExpected {
                expected,
                found: self.found(),
            },
        })
    }

    fn expect_ident(&mut self, construct: &'static str) -> Result<String, CompileError> {
        match self.current.take() {
            Some(TokenKind::Ident(name)) => {
                self.advance()?;
                Ok(name)
            }
            None => Err(CompileError::UnexpectedEndOfStream {
                expected: "identifier",
            }),
            other => {
                self.current = other;
                Err(CompileError::MustBeFollowedBy {
                    construct,
                    expected: "identifier",
                })
            }
        }
    }

    fn expect_number(&mut self, construct: &'static str) -> Result<i32, CompileError> {
        match self.current {
            Some(TokenKind::Number(value)) => {
                self.advance()?;
                Ok(value)
            }
            None => Err(CompileError::UnexpectedEndOfStream { expected: "number" }),
            Some(_) => Err(CompileError::MustBeFollowedBy {
                construct,
                expected: "number",
            }),
        }
    }

    fn resolve(&self, name: &str) -> Result<&Symbol, CompileError> {
        self.symbols
            .lookup(name)
            .ok_or_else(|| CompileError::UndeclaredIdentifier(name.to_string()))
    }

    /// Resolve a name that is about to be written to.
    fn resolve_var(&self, name: &str) -> Result<(i32, i32), CompileError> {
        let symbol = self.resolve(name)?;
        if symbol.kind != SymbolKind::Var {
            return Err(CompileError::IllegalAssignment(name.to_string()));
        }
        Ok((self.level_of(symbol), symbol.address))
    }

    /// Static-link distance from the current block to a symbol's block.
    fn level_of(&self, symbol: &Symbol) -> i32 {
        self.level.saturating_sub(symbol.level) as i32
    }

    fn emit(&mut self, op: Opcode, r: usize, l: i32, m: i32) -> Result<(), CompileError> {
        self.emitter.emit(Instruction::new(op, r as i32, l, m))
    }

    // ========================================
    // Declarations
    // ========================================

    fn program(&mut self) -> Result<(), CompileError> {
        self.block()?;
        self.expect(&TokenKind::Period, ".")?;
        if self.current.is_some() {
            return Err(CompileError::TrailingTokens { found: self.found() });
        }
        self.emit(Opcode::Sio, 0, 0, syscall::KILL)
    }

    fn block(&mut self) -> Result<(), CompileError> {
        if self.match_token(&TokenKind::Const)? {
            loop {
                self.const_declaration()?;
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(&TokenKind::Semi, ";")?;
        }

        if self.match_token(&TokenKind::Var)? {
            loop {
                let name = self.expect_ident("var")?;
                self.symbols
                    .insert(SymbolKind::Var, 0, self.level, true, &name)?;
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(&TokenKind::Semi, ";")?;
        }

        self.allocate_frame()?;
        self.statement_sequence()
    }

    fn const_declaration(&mut self) -> Result<(), CompileError> {
        let name = self.expect_ident("const")?;
        if self.check(&TokenKind::Become) {
            return Err(CompileError::BecomeInsteadOfEqual);
        }
        if !self.match_token(&TokenKind::Eq)? {
            return Err(CompileError::MustBeFollowedBy {
                construct: "identifier",
                expected: "=",
            });
        }
        let value = self.expect_number("=")?;
        self.symbols
            .insert(SymbolKind::Const, value, self.level, true, &name)?;
        Ok(())
    }

    /// Reserve the frame and initialize constant slots.
    fn allocate_frame(&mut self) -> Result<(), CompileError> {
        let size = self.symbols.size() as i32;
        self.emit(Opcode::Inc, 0, 0, size + INT_OFFSET)?;

        let constants: Vec<(i32, i32, i32)> = self
            .symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Const)
            .map(|s| (s.value, self.level_of(s), s.address))
            .collect();
        for (value, level, address) in constants {
            self.emit(Opcode::Lit, 0, 0, value)?;
            self.emit(Opcode::Sto, 0, level, address)?;
        }
        Ok(())
    }

    // ========================================
    // Statements
    // ========================================

    fn starts_statement(&self) -> bool {
        matches!(
            self.current,
            Some(
                TokenKind::Ident(_)
                    | TokenKind::Begin
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::Read
                    | TokenKind::Write
            )
        )
    }

    fn statement_sequence(&mut self) -> Result<(), CompileError> {
        self.statement()?;
        while self.match_token(&TokenKind::Semi)? {
            self.statement()?;
        }
        if self.starts_statement() {
            return Err(CompileError::MissingSemicolon { found: self.found() });
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<(), CompileError> {
        match self.current {
            Some(TokenKind::Ident(_)) => self.assignment(),
            Some(TokenKind::Begin) => self.begin_statement(),
            Some(TokenKind::If) => self.if_statement(),
            Some(TokenKind::While) => self.while_statement(),
            Some(TokenKind::Read) => self.read_statement(),
            Some(TokenKind::Write) => self.write_statement(),
            Some(TokenKind::Call | TokenKind::Procedure | TokenKind::Else) => {
                Err(CompileError::StatementExpected { found: self.found() })
            }
            _ => Ok(()),
        }
    }

    fn assignment(&mut self) -> Result<(), CompileError> {
        let name = self.expect_ident("assignment")?;
        let (level, address) = self.resolve_var(&name)?;
        self.expect(&TokenKind::Become, ":=")?;
        self.expression(0)?;
        self.emit(Opcode::Sto, 0, level, address)
    }

    fn begin_statement(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        self.statement_sequence()?;
        self.expect(&TokenKind::End, "end")
    }

    fn if_statement(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        self.emitter.open_nested();

        self.condition(0)?;
        let mark = self.emitter.mark();
        if !self.match_token(&TokenKind::Then)? {
            return Err(CompileError::MustBeFollowedBy {
                construct: "if condition",
                expected: "then",
            });
        }
        self.statement()?;

        self.emitter.patch_conditional(mark, 0)?;
        self.emitter.close_nested()
    }

    fn while_statement(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        let start = self.emitter.open_nested();

        self.condition(0)?;
        let mark = self.emitter.mark();
        if !self.match_token(&TokenKind::Do)? {
            return Err(CompileError::MustBeFollowedBy {
                construct: "while condition",
                expected: "do",
            });
        }
        self.statement()?;
        self.emit(Opcode::Jmp, 0, 0, start)?;

        self.emitter.patch_conditional(mark, 0)?;
        self.emitter.close_nested()
    }

    fn read_statement(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        let name = self.expect_ident("read")?;
        let (level, address) = self.resolve_var(&name)?;
        self.emit(Opcode::Sio, 0, 0, syscall::READ)?;
        self.emit(Opcode::Sto, 0, level, address)
    }

    fn write_statement(&mut self) -> Result<(), CompileError> {
        self.advance()?;
        let name = self.expect_ident("write")?;
        let symbol = self.resolve(&name)?;
        let (level, address) = (self.level_of(symbol), symbol.address);
        self.emit(Opcode::Lod, 0, level, address)?;
        self.emit(Opcode::Sio, 0, 0, syscall::WRITE)
    }

    // ========================================
    // Expressions
    // ========================================

    fn check_register(&self, register: usize) -> Result<(), CompileError> {
        if register >= REGISTER_COUNT {
            return Err(CompileError::OutOfRegisters {
                limit: REGISTER_COUNT,
            });
        }
        Ok(())
    }

    fn condition(&mut self, register: usize) -> Result<(), CompileError> {
        if self.match_token(&TokenKind::Odd)? {
            self.expression(register)?;
            return self.emit(Opcode::Odd, register, 0, 0);
        }

        self.expression(register)?;
        let op = match self.current {
            Some(TokenKind::Eq) => Opcode::Eql,
            Some(TokenKind::NotEq) => Opcode::Neq,
            Some(TokenKind::Lt) => Opcode::Lss,
            Some(TokenKind::Le) => Opcode::Leq,
            Some(TokenKind::Gt) => Opcode::Gtr,
            Some(TokenKind::Ge) => Opcode::Geq,
            None => {
                return Err(CompileError::UnexpectedEndOfStream {
                    expected: "relational operator",
                });
            }
            Some(_) => {
                return Err(CompileError::SymbolExpected {
                    expected: "relational operator",
                    found: self.found(),
                });
            }
        };
        self.advance()?;
        self.expression(register + 1)?;
        self.emit(op, register, register as i32, register as i32 + 1)
    }

    fn expression(&mut self, register: usize) -> Result<(), CompileError> {
        self.check_register(register)?;

        let negate = if self.match_token(&TokenKind::Minus)? {
            true
        } else {
            self.match_token(&TokenKind::Plus)?;
            false
        };

        self.term(register)?;
        if negate {
            self.emit(Opcode::Neg, register, register as i32, 0)?;
        }

        loop {
            let op = match self.current {
                Some(TokenKind::Plus) => Opcode::Add,
                Some(TokenKind::Minus) => Opcode::Sub,
                _ => return Ok(()),
            };
            self.advance()?;
            self.term(register + 1)?;
            self.emit(op, register, register as i32, register as i32 + 1)?;
        }
    }

    fn term(&mut self, register: usize) -> Result<(), CompileError> {
        self.factor(register)?;

        loop {
            let op = match self.current {
                Some(TokenKind::Star) => Opcode::Mul,
                Some(TokenKind::Slash) => Opcode::Div,
                _ => return Ok(()),
            };
            self.advance()?;
            self.factor(register + 1)?;
            self.emit(op, register, register as i32, register as i32 + 1)?;
        }
    }

    fn factor(&mut self, register: usize) -> Result<(), CompileError> {
        self.check_register(register)?;

        match &self.current {
            Some(TokenKind::Ident(name)) => {
                let symbol = self.resolve(name)?;
                let (level, address) = (self.level_of(symbol), symbol.address);
                self.advance()?;
                self.emit(Opcode::Lod, register, level, address)
            }
            Some(TokenKind::Number(value)) => {
                let value = *value;
                self.advance()?;
                self.emit(Opcode::Lit, register, 0, value)
            }
            Some(TokenKind::LParen) => {
                self.advance()?;
                self.expression(register)?;
                self.expect(&TokenKind::RParen, ")")
            }
            None => Err(CompileError::UnexpectedEndOfStream {
                expected: "factor",
            }),
            Some(_) => Err(CompileError::IllegalTokenStart {
                construct: "factor",
                found: self.found(),
            }),
        }
    }
}
