pub mod codegen;
pub mod dump;
mod emitter;
mod error;
pub mod lexemes;
pub mod lexer;
pub mod queue;
pub mod symbols;

pub use codegen::{Codegen, CompileOutput};
pub use emitter::Emitter;
pub use error::CompileError;
pub use lexemes::{LexemeReader, TokenList, TokenSource};
pub use lexer::{Lexer, ScanError, TokenKind};
pub use symbols::{Symbol, SymbolKind, SymbolTable};

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Options;
use crate::error::{Error, Result};
use crate::vm::bytecode;
use crate::vm::{Program, VM, Verifier};

/// Tokens recognised by the scanner, plus any errors it skipped over.
#[derive(Debug, Default)]
pub struct Scanned {
    pub tokens: Vec<TokenKind>,
    pub errors: Vec<ScanError>,
}

/// Scan source text, writing any requested listings to `listing`.
///
/// Without `skip_errors` the first lexical error is returned. With it,
/// every error is collected in [`Scanned::errors`] and scanning goes on.
pub fn scan_source(
    file: &str,
    source: &str,
    options: &Options,
    listing: &mut dyn Write,
) -> Result<Scanned> {
    if options.print_source {
        write_listing(listing, &dump::format_source(source))?;
    }

    let mut lexer = Lexer::new(source);
    let (tokens, errors) = if options.skip_errors {
        lexer.scan_tokens_lenient()
    } else {
        let tokens = lexer.scan_tokens().map_err(|error| Error::Scan {
            file: file.to_string(),
            error,
        })?;
        (tokens, Vec::new())
    };
    let tokens: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
    debug!("scanned {} tokens ({} errors)", tokens.len(), errors.len());

    if options.print_lexeme_table {
        write_listing(listing, &dump::format_lexeme_table(&tokens))?;
    }
    if options.print_lexeme_list {
        write_listing(listing, &dump::format_lexeme_list(&tokens))?;
    }

    Ok(Scanned { tokens, errors })
}

/// Generate code from a token stream.
pub fn compile_tokens<S: TokenSource>(
    tokens: S,
    options: &Options,
    listing: &mut dyn Write,
) -> Result<Program> {
    let output = Codegen::new(tokens).compile()?;

    if options.print_symbol_table {
        write_listing(listing, &dump::format_symbol_table(&output.symbols))?;
    }
    if options.print_bytecode {
        write_listing(listing, &dump::format_program(&output.program))?;
    }
    Ok(output.program)
}

/// Execute a program with the given I/O streams.
pub fn execute_program(
    program: &Program,
    options: &Options,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
) -> Result<()> {
    if options.verify {
        Verifier::new().verify(program)?;
    }

    let mut vm = VM::with_io(input, output);
    vm.set_trace(options.trace_options());
    vm.run(program)?;
    Ok(())
}

/// Scan, compile and execute source text in memory.
///
/// Listings and program output share `output`. Returns the compiled
/// program so callers can persist it.
pub fn run_source(
    file: &str,
    source: &str,
    options: &Options,
    input: Box<dyn BufRead>,
    mut output: Box<dyn Write>,
) -> Result<Program> {
    let scanned = scan_source(file, source, options, &mut *output)?;
    report_scan_errors(file, &scanned.errors)?;

    let program = compile_tokens(TokenList::new(scanned.tokens), options, &mut *output)?;
    execute_program(&program, options, input, output)?;
    Ok(program)
}

/// Scan a source file into a lexeme file.
///
/// In skip-errors mode the recognised lexemes are written even when
/// errors occurred, but the result is still a failure.
pub fn scan_file(path: &Path, out: &Path, options: &Options) -> Result<()> {
    let source = read_file(path)?;
    let file = path.display().to_string();

    let scanned = scan_source(&file, &source, options, &mut io::stdout().lock())?;
    write_file(out, &lexemes::encode(&scanned.tokens))?;
    info!("wrote {} lexemes to {}", scanned.tokens.len(), out.display());

    report_scan_errors(&file, &scanned.errors)
}

/// Compile a lexeme file into a bytecode file.
pub fn compile_file(path: &Path, out: &Path, options: &Options) -> Result<()> {
    let text = read_file(path)?;
    let program = compile_tokens(LexemeReader::new(&text), options, &mut io::stdout().lock())?;

    write_file(out, &bytecode::serialize(&program))?;
    info!("wrote {} instructions to {}", program.len(), out.display());
    Ok(())
}

/// Load and execute a bytecode file against stdin and stdout.
pub fn execute_file(path: &Path, options: &Options) -> Result<()> {
    let text = read_file(path)?;
    let program = bytecode::deserialize(&text)?;
    debug!("loaded {} instructions from {}", program.len(), path.display());

    execute_program(
        &program,
        options,
        Box::new(io::stdin().lock()),
        Box::new(io::stdout()),
    )
}

/// Scan, compile and execute a source file. With `out`, the bytecode is
/// also written there.
pub fn run_file(path: &Path, options: &Options, out: Option<&Path>) -> Result<()> {
    let source = read_file(path)?;
    let file = path.display().to_string();

    let program = run_source(
        &file,
        &source,
        options,
        Box::new(io::stdin().lock()),
        Box::new(io::stdout()),
    )?;

    if let Some(out) = out {
        write_file(out, &bytecode::serialize(&program))?;
    }
    Ok(())
}

fn report_scan_errors(file: &str, errors: &[ScanError]) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    for error in errors {
        let error = Error::Scan {
            file: file.to_string(),
            error: error.clone(),
        };
        eprintln!("error: {}", error);
    }
    Err(Error::ScanFailed {
        count: errors.len(),
    })
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::FileNotFound {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_listing(listing: &mut dyn Write, text: &str) -> Result<()> {
    listing
        .write_all(text.as_bytes())
        .map_err(|source| Error::Write {
            path: PathBuf::from("<stdout>"),
            source,
        })
}
