//! Per-step execution tracing.

use std::io::{self, Write};

use serde::Serialize;

use super::ops::Instruction;
use super::stack::RecordStack;
use crate::config::TraceFormat;

/// Which parts of machine state are printed after each step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceOptions {
    pub cpu: bool,
    pub records: bool,
    pub registers: bool,
    pub format: TraceFormat,
}

impl TraceOptions {
    pub fn enabled(&self) -> bool {
        self.cpu || self.records || self.registers
    }
}

#[derive(Serialize)]
struct TraceStep<'a> {
    op: String,
    r: i32,
    l: i32,
    m: i32,
    pc: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<RecordSnapshot<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    registers: Option<&'a [i32]>,
}

#[derive(Serialize)]
struct RecordSnapshot<'a> {
    return_value: i32,
    return_address: i32,
    locals: &'a [i32],
}

/// Writes a trace header once and one line per executed instruction.
#[derive(Debug, Clone)]
pub struct Tracer {
    options: TraceOptions,
}

impl Tracer {
    pub fn new(options: TraceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    pub fn header(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.options.format == TraceFormat::Json {
            return Ok(());
        }
        let mut line = String::from("OP    R  L  M     PC    |");
        if self.options.records {
            line.push_str(" RV  RA   (LOCALS) |");
        }
        if self.options.registers {
            line.push_str(" REGS");
        }
        writeln!(out, "{}", line)
    }

    pub fn step(
        &self,
        out: &mut dyn Write,
        inst: &Instruction,
        pc: i32,
        records: &RecordStack,
        registers: &[i32],
    ) -> io::Result<()> {
        match self.options.format {
            TraceFormat::Human => self.step_human(out, inst, pc, records, registers),
            TraceFormat::Json => self.step_json(out, inst, pc, records, registers),
        }
    }

    fn step_human(
        &self,
        out: &mut dyn Write,
        inst: &Instruction,
        pc: i32,
        records: &RecordStack,
        registers: &[i32],
    ) -> io::Result<()> {
        let mut line = format!(
            "{:<4}{:>3}{:>3}{:>3}{:>7}    |",
            mnemonic(inst),
            inst.r,
            inst.l,
            inst.m,
            pc
        );
        if self.options.records {
            for record in records.iter() {
                let locals: Vec<String> = record.locals.iter().map(|v| v.to_string()).collect();
                line.push_str(&format!(
                    " {:>3} {:>3}   ({}) |",
                    record.return_value,
                    record.return_address,
                    locals.join(" ")
                ));
            }
        }
        if self.options.registers {
            for value in registers {
                line.push_str(&format!(" {}", value));
            }
        }
        writeln!(out, "{}", line)
    }

    fn step_json(
        &self,
        out: &mut dyn Write,
        inst: &Instruction,
        pc: i32,
        records: &RecordStack,
        registers: &[i32],
    ) -> io::Result<()> {
        let step = TraceStep {
            op: mnemonic(inst),
            r: inst.r,
            l: inst.l,
            m: inst.m,
            pc,
            records: self.options.records.then(|| {
                records
                    .iter()
                    .map(|record| RecordSnapshot {
                        return_value: record.return_value,
                        return_address: record.return_address,
                        locals: &record.locals,
                    })
                    .collect()
            }),
            registers: self.options.registers.then_some(registers),
        };
        let json = serde_json::to_string(&step).map_err(io::Error::other)?;
        writeln!(out, "{}", json)
    }
}

fn mnemonic(inst: &Instruction) -> String {
    match inst.opcode() {
        Some(op) => op.mnemonic().to_string(),
        None => inst.op.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Opcode;

    fn options(records: bool, registers: bool, format: TraceFormat) -> TraceOptions {
        TraceOptions {
            cpu: true,
            records,
            registers,
            format,
        }
    }

    #[test]
    fn test_human_header_columns() {
        let tracer = Tracer::new(options(true, true, TraceFormat::Human));
        let mut out = Vec::new();
        tracer.header(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("OP"));
        assert!(text.contains("(LOCALS)"));
        assert!(text.trim_end().ends_with("REGS"));
    }

    #[test]
    fn test_human_step_shows_records() {
        let tracer = Tracer::new(options(true, false, TraceFormat::Human));
        let mut records = RecordStack::new();
        let main = records.push(0, None);
        records.allocate_locals(main, 2);

        let mut out = Vec::new();
        let inst = Instruction::new(Opcode::Lit, 0, 0, 7);
        tracer.step(&mut out, &inst, 1, &records, &[0; 16]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("LIT"));
        assert!(text.contains("(0 0)"));
    }

    #[test]
    fn test_json_step_is_one_object_per_line() {
        let tracer = Tracer::new(options(false, true, TraceFormat::Json));
        let records = RecordStack::new();
        let mut registers = [0; 16];
        registers[0] = 14;

        let mut out = Vec::new();
        let inst = Instruction::new(Opcode::Sio, 0, 0, 1);
        tracer.header(&mut out).unwrap();
        tracer.step(&mut out, &inst, 5, &records, &registers).unwrap();
        let text = String::from_utf8(out).unwrap();

        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["op"], "SIO");
        assert_eq!(value["pc"], 5);
        assert_eq!(value["registers"][0], 14);
        assert!(value.get("records").is_none());
    }
}
