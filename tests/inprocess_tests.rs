//! In-process integration tests that contribute to coverage.
//!
//! These tests call the compiler/VM APIs directly instead of spawning
//! a separate process, so they are included in coverage measurement.

use std::cell::RefCell;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::Path;
use std::rc::Rc;

use plum::compiler::{self, LexemeReader, TokenList, lexemes};
use plum::vm::{Verifier, bytecode};
use plum::{Error, Options};

#[derive(Clone, Default)]
struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedOutput {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

fn run_with(source: &str, options: &Options, input: &str) -> (Result<(), Error>, String) {
    let output = SharedOutput::default();
    let result = compiler::run_source(
        "test.pl0",
        source,
        options,
        Box::new(Cursor::new(input.to_string())),
        Box::new(output.clone()),
    )
    .map(|_| ());
    (result, output.text())
}

fn run_source(source: &str) -> String {
    let (result, output) = run_with(source, &Options::default(), "");
    result.unwrap();
    output
}

fn run_test_file(name: &str, input: &str) -> Result<String, Error> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
        .join(name);
    let source = fs::read_to_string(&path).unwrap();
    let (result, output) = run_with(&source, &Options::default(), input);
    result.map(|_| output)
}

// Snapshot programs

#[test]
fn test_basic_constant_double() {
    assert_eq!(run_test_file("basic/constant_double.pl0", "").unwrap(), "14\n");
}

#[test]
fn test_basic_countdown() {
    assert_eq!(run_test_file("basic/countdown.pl0", "").unwrap(), "5\n4\n3\n2\n1\n");
}

#[test]
fn test_basic_factorial() {
    assert_eq!(run_test_file("basic/factorial.pl0", "6\n").unwrap(), "720\n");
}

#[test]
fn test_basic_arithmetic() {
    assert_eq!(
        run_test_file("basic/arithmetic.pl0", "").unwrap(),
        "14\n20\n3\n-5\n-9\n"
    );
}

#[test]
fn test_errors_undeclared() {
    let err = run_test_file("errors/undeclared.pl0", "").unwrap_err();
    assert!(matches!(err, Error::Compile(_)));
}

#[test]
fn test_errors_divide_by_zero() {
    let err = run_test_file("errors/divide_by_zero.pl0", "").unwrap_err();
    assert!(matches!(err, Error::Runtime(_)));
}

// Pipeline properties

#[test]
fn test_compiled_programs_pass_verification() {
    let sources = [
        "const x = 7; var y; y := x * 2; write y.",
        "var i; begin i := 0; while i < 5 do begin if odd i then write i; i := i + 1 end end.",
        "var a, b; begin read a; read b; if a < b then write b; if a >= b then write a end.",
    ];
    for source in sources {
        let scanned =
            compiler::scan_source("t.pl0", source, &Options::default(), &mut io::sink()).unwrap();
        let program = compiler::compile_tokens(
            TokenList::new(scanned.tokens),
            &Options::default(),
            &mut io::sink(),
        )
        .unwrap();
        Verifier::new().verify(&program).unwrap();
    }
}

#[test]
fn test_lexeme_file_round_trip() {
    let source = "const k = 3; var x; begin x := k * (k + 1); write x end.";
    let scanned =
        compiler::scan_source("t.pl0", source, &Options::default(), &mut io::sink()).unwrap();
    let text = lexemes::encode(&scanned.tokens);

    let direct = compiler::compile_tokens(
        TokenList::new(scanned.tokens),
        &Options::default(),
        &mut io::sink(),
    )
    .unwrap();
    let from_file =
        compiler::compile_tokens(LexemeReader::new(&text), &Options::default(), &mut io::sink())
            .unwrap();
    assert_eq!(direct, from_file);
}

#[test]
fn test_bytecode_file_executes_the_same() {
    let source = "var n; begin n := 3; while n > 0 do begin write n; n := n - 1 end end.";
    let scanned =
        compiler::scan_source("t.pl0", source, &Options::default(), &mut io::sink()).unwrap();
    let program = compiler::compile_tokens(
        TokenList::new(scanned.tokens),
        &Options::default(),
        &mut io::sink(),
    )
    .unwrap();

    let reloaded = bytecode::deserialize(&bytecode::serialize(&program)).unwrap();
    let output = SharedOutput::default();
    compiler::execute_program(
        &reloaded,
        &Options::default(),
        Box::new(io::empty()),
        Box::new(output.clone()),
    )
    .unwrap();
    assert_eq!(output.text(), "3\n2\n1\n");
}

#[test]
fn test_if_inside_while_inside_if() {
    let source = r#"
var i, n;
begin
    n := 4;
    if n > 0 then
    while i < n do
    begin
        if odd i then write i;
        i := i + 1
    end;
    write n
end.
"#;
    assert_eq!(run_source(source), "1\n3\n4\n");
}

#[test]
fn test_read_consumes_words_across_lines() {
    let (result, output) = run_with(
        "var a, b, c; begin read a; read b; read c; write c; write b; write a end.",
        &Options::default(),
        "1 2\n3\n",
    );
    result.unwrap();
    assert_eq!(output, "3\n2\n1\n");
}

#[test]
fn test_invalid_input_faults() {
    let (result, _) = run_with("var a; read a.", &Options::default(), "abc\n");
    assert!(matches!(result, Err(Error::Runtime(_))));
}

#[test]
fn test_human_trace_goes_to_output() {
    let options = Options {
        trace_cpu: true,
        trace_records: true,
        ..Default::default()
    };
    let (result, output) = run_with("var x; x := 2.", &options, "");
    result.unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert!(lines[0].starts_with("OP"));
    assert!(lines[0].contains("(LOCALS)"));
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("INC"));
    assert!(lines[4].starts_with("SIO"));
}

#[test]
fn test_skip_errors_still_fails() {
    let options = Options {
        skip_errors: true,
        ..Default::default()
    };
    let (result, output) = run_with("var x$; x := 1.", &options, "");
    assert!(matches!(result, Err(Error::ScanFailed { count: 1 })));
    assert_eq!(output, "");
}

#[test]
fn test_register_limit_is_enforced() {
    let mut source = String::from("var x; x := 1");
    for _ in 0..16 {
        source.push_str(" * (1");
    }
    source.push_str(&")".repeat(16));
    source.push('.');

    let (result, _) = run_with(&source, &Options::default(), "");
    let err = result.unwrap_err();
    assert!(err.to_string().contains("out of registers"));
}
