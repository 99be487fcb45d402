//! Human-readable listings of the intermediate forms.
//!
//! These back the `--print-*` flags. Every function returns a `String`
//! so callers decide where it goes.

use std::fmt::Write;

use super::lexemes;
use super::lexer::TokenKind;
use super::symbols::SymbolTable;
use crate::vm::Program;

/// The source text under a `Source Program:` header.
pub fn format_source(source: &str) -> String {
    let mut output = String::from("Source Program:\n---------------\n");
    output.push_str(source);
    if !source.ends_with('\n') {
        output.push('\n');
    }
    output
}

/// The encoded lexeme stream under a `Lexeme List:` header.
pub fn format_lexeme_list(tokens: &[TokenKind]) -> String {
    let mut output = String::from("Lexeme List:\n------------\n");
    output.push_str(&lexemes::encode(tokens));
    output
}

/// One row per lexeme: its text and its code.
pub fn format_lexeme_table(tokens: &[TokenKind]) -> String {
    let mut output = String::from("     :Lexeme | Value:\n     ----------------\n");
    for token in tokens {
        writeln!(output, "{:>12} | {}", token.to_string(), token.code())
            .expect("writing to String cannot fail");
    }
    output
}

pub fn format_symbol_table(symbols: &SymbolTable) -> String {
    let mut output = String::new();
    writeln!(
        output,
        "{:<6} {:>6} {:>6} {:>6} {:>8}  NAME",
        "TYPE", "VALUE", "LEVEL", "ACTIVE", "ADDRESS"
    )
    .expect("writing to String cannot fail");
    for symbol in symbols.iter() {
        writeln!(
            output,
            "{:<6} {:>6} {:>6} {:>6} {:>8}  {}",
            symbol.kind.to_string(),
            symbol.value,
            symbol.level,
            u8::from(symbol.active),
            symbol.address,
            symbol.name
        )
        .expect("writing to String cannot fail");
    }
    output
}

/// Disassembly, one `index MNEMONIC r l m` line per instruction.
pub fn format_program(program: &Program) -> String {
    let width = program.len().saturating_sub(1).to_string().len();
    let mut output = String::new();
    for (index, instruction) in program.code.iter().enumerate() {
        writeln!(output, "{:>width$} {}", index, instruction, width = width)
            .expect("writing to String cannot fail");
    }
    output
}
