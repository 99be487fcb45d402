//! Bytecode file reading and writing.
//!
//! Text format, one instruction per line:
//! - `op r l m` as four whitespace-separated decimal integers
//! - blank lines are ignored
//! - at most [`MAX_LINES`] instructions

use std::io::{self, Write};

use thiserror::Error;

use super::{Instruction, MAX_LINES, Program};

/// Error type for bytecode operations
#[derive(Debug, Error)]
pub enum BytecodeError {
    #[error("file too long: {lines} instructions (maximum is {max})")]
    FileTooLong { lines: usize, max: usize },
    #[error("bytecode file contains no instructions")]
    Empty,
    #[error("malformed instruction on line {line}: '{text}'")]
    Malformed { line: usize, text: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Serialize a program to its text form.
pub fn serialize(program: &Program) -> String {
    let mut buf = Vec::new();
    write_program(&mut buf, program).expect("writing to Vec cannot fail");
    String::from_utf8_lossy(&buf).into_owned()
}

/// Parse a program from its text form.
pub fn deserialize(text: &str) -> Result<Program, BytecodeError> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    if lines.len() > MAX_LINES {
        return Err(BytecodeError::FileTooLong {
            lines: lines.len(),
            max: MAX_LINES,
        });
    }
    if lines.is_empty() {
        return Err(BytecodeError::Empty);
    }

    let code = lines
        .into_iter()
        .map(|(number, line)| parse_instruction(line).ok_or_else(|| BytecodeError::Malformed {
            line: number,
            text: line.to_string(),
        }))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Program::new(code))
}

/// Write a program to a writer
pub fn write_program<W: Write>(w: &mut W, program: &Program) -> io::Result<()> {
    for inst in &program.code {
        write_instruction(w, inst)?;
    }
    w.flush()
}

fn write_instruction<W: Write>(w: &mut W, inst: &Instruction) -> io::Result<()> {
    writeln!(w, "{} {} {} {}", inst.op, inst.r, inst.l, inst.m)
}

fn parse_instruction(line: &str) -> Option<Instruction> {
    let mut fields = line.split_whitespace().map(|field| field.parse::<i32>());
    let op = fields.next()?.ok()?;
    let r = fields.next()?.ok()?;
    let l = fields.next()?.ok()?;
    let m = fields.next()?.ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(Instruction::raw(op, r, l, m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Opcode;

    #[test]
    fn test_roundtrip() {
        let program = Program::new(vec![
            Instruction::new(Opcode::Inc, 0, 0, 6),
            Instruction::new(Opcode::Lit, 0, 0, -7),
            Instruction::new(Opcode::Sio, 0, 0, 3),
        ]);

        let text = serialize(&program);
        assert_eq!(text, "6 0 0 6\n1 0 0 -7\n9 0 0 3\n");
        assert_eq!(deserialize(&text).unwrap(), program);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let program = deserialize("\n1 0 0 2\n\n   \n9 0 0 3\n").unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_unknown_opcode_loads() {
        let program = deserialize("99 0 0 0\n").unwrap();
        assert_eq!(program.code[0].op, 99);
        assert!(program.code[0].opcode().is_none());
    }

    #[test]
    fn test_malformed_line() {
        let err = deserialize("1 0 0 2\n1 0 x 2\n").unwrap_err();
        assert!(matches!(err, BytecodeError::Malformed { line: 2, .. }));

        let err = deserialize("1 0 0\n").unwrap_err();
        assert!(matches!(err, BytecodeError::Malformed { line: 1, .. }));

        let err = deserialize("1 0 0 2 5\n").unwrap_err();
        assert!(matches!(err, BytecodeError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(deserialize(""), Err(BytecodeError::Empty)));
        assert!(matches!(deserialize("\n \n"), Err(BytecodeError::Empty)));
    }

    #[test]
    fn test_file_too_long() {
        let at_limit = "9 0 0 3\n".repeat(MAX_LINES);
        assert_eq!(deserialize(&at_limit).unwrap().len(), MAX_LINES);

        let over = "9 0 0 3\n".repeat(MAX_LINES + 1);
        let err = deserialize(&over).unwrap_err();
        assert!(matches!(
            err,
            BytecodeError::FileTooLong { lines, max: MAX_LINES } if lines == MAX_LINES + 1
        ));
    }

    #[test]
    fn test_write_program() {
        let program = Program::new(vec![Instruction::new(Opcode::Lit, 1, 0, 4)]);
        let mut buf = Vec::new();
        write_program(&mut buf, &program).unwrap();
        assert_eq!(buf, b"1 1 0 4\n");
    }
}
