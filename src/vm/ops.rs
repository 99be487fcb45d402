use std::fmt;

/// Operations of the Plum register machine.
///
/// Discriminants are the numeric codes used in bytecode files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Opcode {
    // ========================================
    // Data movement
    // ========================================
    Lit = 1,
    Rtn = 2,
    Lod = 3,
    Sto = 4,
    Cal = 5,
    Inc = 6,

    // ========================================
    // Control flow
    // ========================================
    Jmp = 7,
    Jpc = 8,
    Sio = 9,

    // ========================================
    // Arithmetic
    // ========================================
    Neg = 10,
    Add = 11,
    Sub = 12,
    Mul = 13,
    Div = 14,
    Odd = 15,
    Mod = 16,

    // ========================================
    // Comparison
    // ========================================
    Eql = 17,
    Neq = 18,
    Lss = 19,
    Leq = 20,
    Gtr = 21,
    Geq = 22,
}

impl Opcode {
    pub const ALL: [Opcode; 22] = [
        Opcode::Lit,
        Opcode::Rtn,
        Opcode::Lod,
        Opcode::Sto,
        Opcode::Cal,
        Opcode::Inc,
        Opcode::Jmp,
        Opcode::Jpc,
        Opcode::Sio,
        Opcode::Neg,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Odd,
        Opcode::Mod,
        Opcode::Eql,
        Opcode::Neq,
        Opcode::Lss,
        Opcode::Leq,
        Opcode::Gtr,
        Opcode::Geq,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Lit => "LIT",
            Opcode::Rtn => "RTN",
            Opcode::Lod => "LOD",
            Opcode::Sto => "STO",
            Opcode::Cal => "CAL",
            Opcode::Inc => "INC",
            Opcode::Jmp => "JMP",
            Opcode::Jpc => "JPC",
            Opcode::Sio => "SIO",
            Opcode::Neg => "NEG",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Odd => "ODD",
            Opcode::Mod => "MOD",
            Opcode::Eql => "EQL",
            Opcode::Neq => "NEQ",
            Opcode::Lss => "LSS",
            Opcode::Leq => "LEQ",
            Opcode::Gtr => "GTR",
            Opcode::Geq => "GEQ",
        }
    }

    /// Register fields read or written by this opcode, in (R, L, M) order.
    pub fn register_operands(self) -> (bool, bool, bool) {
        match self {
            Opcode::Lit | Opcode::Lod | Opcode::Sto | Opcode::Jpc | Opcode::Sio | Opcode::Odd => {
                (true, false, false)
            }
            Opcode::Neg => (true, true, false),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Eql
            | Opcode::Neq
            | Opcode::Lss
            | Opcode::Leq
            | Opcode::Gtr
            | Opcode::Geq => (true, true, true),
            Opcode::Rtn | Opcode::Cal | Opcode::Inc | Opcode::Jmp => (false, false, false),
        }
    }
}

impl TryFrom<i32> for Opcode {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.code() == code)
            .ok_or(code)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// System call selectors carried in the M field of `SIO`.
pub mod syscall {
    pub const WRITE: i32 = 1;
    pub const READ: i32 = 2;
    pub const KILL: i32 = 3;
}

/// A single machine instruction.
///
/// `op` holds the raw code as loaded; it is decoded when executed so an
/// unknown code surfaces as a runtime fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instruction {
    pub op: i32,
    pub r: i32,
    pub l: i32,
    pub m: i32,
}

impl Instruction {
    pub fn new(op: Opcode, r: i32, l: i32, m: i32) -> Self {
        Self {
            op: op.code(),
            r,
            l,
            m,
        }
    }

    pub fn raw(op: i32, r: i32, l: i32, m: i32) -> Self {
        Self { op, r, l, m }
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.op).ok()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Some(op) => write!(f, "{} {} {} {}", op, self.r, self.l, self.m),
            None => write!(f, "??({}) {} {} {}", self.op, self.r, self.l, self.m),
        }
    }
}
