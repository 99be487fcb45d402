use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use log::{debug, trace};

use super::error::VmError;
use super::ops::{Instruction, Opcode, syscall};
use super::stack::{RecordId, RecordStack};
use super::trace::{TraceOptions, Tracer};
use super::{INT_OFFSET, Program, REGISTER_COUNT};

/// Result of executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Kill,
}

/// Processor state.
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    pub registers: [i32; REGISTER_COUNT],
    pub program_counter: i32,
    pub instruction_count: usize,
    pub inst_register: Instruction,
}

impl Cpu {
    pub fn new(instruction_count: usize) -> Self {
        Self {
            instruction_count,
            ..Self::default()
        }
    }
}

/// The Plum virtual machine.
pub struct VM {
    cpu: Cpu,
    records: RecordStack,
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
    /// Words read from `input` but not yet consumed by `SIO _ _ 2`.
    pending_input: VecDeque<String>,
    tracer: Option<Tracer>,
}

impl VM {
    pub fn new() -> Self {
        Self::with_io(Box::new(io::stdin().lock()), Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self::with_io(Box::new(io::stdin().lock()), output)
    }

    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            cpu: Cpu::default(),
            records: RecordStack::new(),
            output,
            input,
            pending_input: VecDeque::new(),
            tracer: None,
        }
    }

    pub fn set_trace(&mut self, options: TraceOptions) {
        self.tracer = options.enabled().then(|| Tracer::new(options));
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn records(&self) -> &RecordStack {
        &self.records
    }

    /// Execute a program until it kills itself or faults.
    ///
    /// The record stack is empty when this returns, whatever the outcome.
    pub fn run(&mut self, program: &Program) -> Result<(), VmError> {
        self.cpu = Cpu::new(program.len());
        self.records.clear();
        self.records.push(0, None);

        let result = self.run_loop(program);
        self.records.clear();

        if let Err(e) = &result {
            debug!("fault at pc={}: {}", self.cpu.program_counter, e);
        }
        let flushed = self.output.flush().map_err(VmError::from);
        result.and(flushed)
    }

    fn run_loop(&mut self, program: &Program) -> Result<(), VmError> {
        if let Some(tracer) = &self.tracer {
            tracer.header(&mut *self.output)?;
        }

        loop {
            self.fetch(program)?;
            let signal = self.execute()?;

            if let Some(tracer) = &self.tracer {
                tracer.step(
                    &mut *self.output,
                    &self.cpu.inst_register,
                    self.cpu.program_counter,
                    &self.records,
                    &self.cpu.registers,
                )?;
            }

            if signal == Signal::Kill {
                debug!("program killed after pc={}", self.cpu.program_counter);
                return Ok(());
            }
        }
    }

    /// Copy the instruction at the program counter into the instruction
    /// register and advance the program counter.
    pub fn fetch(&mut self, program: &Program) -> Result<(), VmError> {
        let pc = self.cpu.program_counter;
        let inst = program
            .get(pc)
            .ok_or(VmError::ProgramCounterOutOfBounds { pc })?;
        self.cpu.inst_register = *inst;
        self.cpu.program_counter += 1;
        Ok(())
    }

    /// Execute the instruction held in the instruction register.
    pub fn execute(&mut self) -> Result<Signal, VmError> {
        let Instruction { op, r, l, m } = self.cpu.inst_register;
        let opcode = Opcode::try_from(op).map_err(|code| VmError::IllegalOpcode { code })?;
        let current = self.records.current().ok_or(VmError::EmptyRecordStack)?;

        match opcode {
            Opcode::Lit => {
                let r = self.register(r)?;
                self.cpu.registers[r] = m;
            }
            Opcode::Rtn => {
                let return_address = self
                    .records
                    .get(current)
                    .map(|record| record.return_address)
                    .ok_or(VmError::EmptyRecordStack)?;
                self.cpu.program_counter = return_address;
                let value = self.records.pop().ok_or(VmError::EmptyRecordStack)?;
                trace!("returned {} to pc={}", value, return_address);
            }
            Opcode::Lod => {
                let r = self.register(r)?;
                let frame = self.frame(l)?;
                let value = *self.slot(frame, m)?;
                self.cpu.registers[r] = value;
            }
            Opcode::Sto => {
                let r = self.register(r)?;
                let frame = self.frame(l)?;
                let value = self.cpu.registers[r];
                *self.slot(frame, m)? = value;
            }
            Opcode::Cal => {
                let static_link = self.frame(l)?;
                self.records
                    .push(self.cpu.program_counter, Some(static_link));
                self.cpu.program_counter = m;
            }
            Opcode::Inc => {
                if !self.records.allocate_locals(current, m.saturating_sub(INT_OFFSET)) {
                    return Err(VmError::LocalsAlreadyAllocated);
                }
            }
            Opcode::Jmp => {
                self.cpu.program_counter = m;
            }
            Opcode::Jpc => {
                let r = self.register(r)?;
                if self.cpu.registers[r] == 0 {
                    self.cpu.program_counter = m;
                }
            }
            Opcode::Sio => return self.system_call(r, m),
            Opcode::Neg => {
                let (r, l) = (self.register(r)?, self.register(l)?);
                self.cpu.registers[r] = self.cpu.registers[l].wrapping_neg();
            }
            Opcode::Odd => {
                let r = self.register(r)?;
                self.cpu.registers[r] = (self.cpu.registers[r] % 2 != 0) as i32;
            }
            Opcode::Add => self.binary(r, l, m, |a, b| Some(a.wrapping_add(b)))?,
            Opcode::Sub => self.binary(r, l, m, |a, b| Some(a.wrapping_sub(b)))?,
            Opcode::Mul => self.binary(r, l, m, |a, b| Some(a.wrapping_mul(b)))?,
            Opcode::Div => self.binary(r, l, m, |a, b| (b != 0).then(|| a.wrapping_div(b)))?,
            Opcode::Mod => self.binary(r, l, m, |a, b| (b != 0).then(|| a.wrapping_rem(b)))?,
            Opcode::Eql => self.binary(r, l, m, |a, b| Some((a == b) as i32))?,
            Opcode::Neq => self.binary(r, l, m, |a, b| Some((a != b) as i32))?,
            Opcode::Lss => self.binary(r, l, m, |a, b| Some((a < b) as i32))?,
            Opcode::Leq => self.binary(r, l, m, |a, b| Some((a <= b) as i32))?,
            Opcode::Gtr => self.binary(r, l, m, |a, b| Some((a > b) as i32))?,
            Opcode::Geq => self.binary(r, l, m, |a, b| Some((a >= b) as i32))?,
        }

        Ok(Signal::Continue)
    }

    fn register(&self, index: i32) -> Result<usize, VmError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < REGISTER_COUNT)
            .ok_or(VmError::InvalidRegister { index })
    }

    /// `registers[r] = f(registers[l], registers[m])`. `f` returns `None`
    /// only for a zero divisor.
    fn binary(
        &mut self,
        r: i32,
        l: i32,
        m: i32,
        f: impl Fn(i32, i32) -> Option<i32>,
    ) -> Result<(), VmError> {
        let (r, l, m) = (self.register(r)?, self.register(l)?, self.register(m)?);
        let value = f(self.cpu.registers[l], self.cpu.registers[m]).ok_or(VmError::DivideByZero {
            pc: self.cpu.program_counter - 1,
        })?;
        self.cpu.registers[r] = value;
        Ok(())
    }

    /// The record `levels` static links up from the current record.
    fn frame(&self, levels: i32) -> Result<RecordId, VmError> {
        self.records
            .static_parent(levels)
            .ok_or(VmError::InvalidStaticParent { levels })
    }

    fn slot(&mut self, frame: RecordId, m: i32) -> Result<&mut i32, VmError> {
        let record = self
            .records
            .get_mut(frame)
            .ok_or(VmError::InvalidStaticParent { levels: 0 })?;
        let count = record.local_count();
        record
            .slot_mut(m)
            .ok_or(VmError::LocalOutOfBounds { slot: m, count })
    }

    fn system_call(&mut self, r: i32, selector: i32) -> Result<Signal, VmError> {
        match selector {
            syscall::WRITE => {
                let r = self.register(r)?;
                writeln!(self.output, "{}", self.cpu.registers[r])?;
            }
            syscall::READ => {
                let r = self.register(r)?;
                self.output.flush()?;
                self.cpu.registers[r] = self.read_int()?;
            }
            syscall::KILL => return Ok(Signal::Kill),
            _ => return Err(VmError::IllegalSystemCall { selector }),
        }
        Ok(Signal::Continue)
    }

    fn read_int(&mut self) -> Result<i32, VmError> {
        while self.pending_input.is_empty() {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(VmError::InputExhausted);
            }
            self.pending_input
                .extend(line.split_whitespace().map(str::to_string));
        }
        let text = self.pending_input.pop_front().unwrap_or_default();
        text.parse().map_err(|_| VmError::InvalidInput { text })
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}
