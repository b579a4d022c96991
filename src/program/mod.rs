use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---- Span infrastructure ----

/// Column range within one source line. Lines are 1-based, columns are 0-based byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(line: usize, range: std::ops::Range<usize>) -> Self {
        Span { line, start: range.start, end: range.end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            line: self.line,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

// ---- Opcode catalogue ----

/// What an opcode expects after its mnemonic. Fixed per opcode at assembly time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    Int,
    Text,
    Name,
    Label,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::None => write!(f, "no operand"),
            OperandKind::Int => write!(f, "an integer literal"),
            OperandKind::Text => write!(f, "a string literal"),
            OperandKind::Name => write!(f, "a variable name"),
            OperandKind::Label => write!(f, "a label or instruction index"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Stack
    Push,
    Pop,
    Dup,
    Swap,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Compare
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    // Logic
    And,
    Or,
    Not,
    // Memory
    Store,
    Load,
    // Control
    Jmp,
    Jmpz,
    Jmpnz,
    // Arrays
    NewArray,
    ArraySet,
    ArrayGet,
    ArrayLen,
    FreeArr,
    // Strings
    NewStr,
    StrCat,
    StrLen,
    FreeStr,
    // I/O
    Print,
    PrintChar,
    PrintStr,
    // Terminal
    Halt,
}

impl Opcode {
    pub const ALL: [Opcode; 35] = [
        Opcode::Push,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::Swap,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Lt,
        Opcode::Le,
        Opcode::Gt,
        Opcode::Ge,
        Opcode::Eq,
        Opcode::Ne,
        Opcode::And,
        Opcode::Or,
        Opcode::Not,
        Opcode::Store,
        Opcode::Load,
        Opcode::Jmp,
        Opcode::Jmpz,
        Opcode::Jmpnz,
        Opcode::NewArray,
        Opcode::ArraySet,
        Opcode::ArrayGet,
        Opcode::ArrayLen,
        Opcode::FreeArr,
        Opcode::NewStr,
        Opcode::StrCat,
        Opcode::StrLen,
        Opcode::FreeStr,
        Opcode::Print,
        Opcode::PrintChar,
        Opcode::PrintStr,
        Opcode::Halt,
    ];

    /// Canonical mnemonic, as written in source and on the wire.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::Swap => "SWAP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Store => "STORE",
            Opcode::Load => "LOAD",
            Opcode::Jmp => "JMP",
            Opcode::Jmpz => "JMPZ",
            Opcode::Jmpnz => "JMPNZ",
            Opcode::NewArray => "NEWARRAY",
            Opcode::ArraySet => "ARRAYSET",
            Opcode::ArrayGet => "ARRAYGET",
            Opcode::ArrayLen => "ARRAYLEN",
            Opcode::FreeArr => "FREEARR",
            Opcode::NewStr => "NEWSTR",
            Opcode::StrCat => "STRCAT",
            Opcode::StrLen => "STRLEN",
            Opcode::FreeStr => "FREESTR",
            Opcode::Print => "PRINT",
            Opcode::PrintChar => "PRINTCHAR",
            Opcode::PrintStr => "PRINTSTR",
            Opcode::Halt => "HALT",
        }
    }

    /// Look up a mnemonic. Case-sensitive; the long comparison spellings used by
    /// older sample programs are accepted as aliases of the short forms.
    pub fn from_mnemonic(text: &str) -> Option<Opcode> {
        let alias = match text {
            "LessThan" => Some(Opcode::Lt),
            "LessEqual" => Some(Opcode::Le),
            "GreaterThan" => Some(Opcode::Gt),
            "GreaterEqual" => Some(Opcode::Ge),
            "Equal" => Some(Opcode::Eq),
            "NotEqual" => Some(Opcode::Ne),
            _ => None,
        };
        alias.or_else(|| Opcode::ALL.iter().copied().find(|op| op.mnemonic() == text))
    }

    pub fn operand_kind(self) -> OperandKind {
        match self {
            Opcode::Push => OperandKind::Int,
            Opcode::Store | Opcode::Load => OperandKind::Name,
            Opcode::Jmp | Opcode::Jmpz | Opcode::Jmpnz => OperandKind::Label,
            Opcode::NewStr | Opcode::PrintStr => OperandKind::Text,
            _ => OperandKind::None,
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Opcode::Push => "push an integer",
            Opcode::Pop => "discard the top value",
            Opcode::Dup => "duplicate the top value",
            Opcode::Swap => "exchange the top two values",
            Opcode::Add => "pop b, pop a, push a + b",
            Opcode::Sub => "pop b, pop a, push a - b",
            Opcode::Mul => "pop b, pop a, push a * b",
            Opcode::Div => "pop b, pop a, push a / b (truncating)",
            Opcode::Lt => "pop b, pop a, push 1 if a < b else 0",
            Opcode::Le => "pop b, pop a, push 1 if a <= b else 0",
            Opcode::Gt => "pop b, pop a, push 1 if a > b else 0",
            Opcode::Ge => "pop b, pop a, push 1 if a >= b else 0",
            Opcode::Eq => "pop b, pop a, push 1 if a == b else 0",
            Opcode::Ne => "pop b, pop a, push 1 if a != b else 0",
            Opcode::And => "pop b, pop a, push 1 if both are nonzero else 0",
            Opcode::Or => "pop b, pop a, push 1 if either is nonzero else 0",
            Opcode::Not => "pop a, push 1 if a == 0 else 0",
            Opcode::Store => "pop a value and bind it to a variable",
            Opcode::Load => "push the value bound to a variable",
            Opcode::Jmp => "jump unconditionally",
            Opcode::Jmpz => "pop a number, jump if it is zero",
            Opcode::Jmpnz => "pop a number, jump if it is nonzero",
            Opcode::NewArray => "pop a size, push a new zero-filled array",
            Opcode::ArraySet => "pop value, index, array; store value at index",
            Opcode::ArrayGet => "pop index, array; push the element",
            Opcode::ArrayLen => "pop an array, push its length",
            Opcode::FreeArr => "pop an array and free it",
            Opcode::NewStr => "push a new string",
            Opcode::StrCat => "pop b, pop a, push a new string a ++ b",
            Opcode::StrLen => "pop a string, push its length",
            Opcode::FreeStr => "pop a string and free it",
            Opcode::Print => "pop a number (or string) and print it on its own line",
            Opcode::PrintChar => "pop a code point and print the character",
            Opcode::PrintStr => "print a literal string",
            Opcode::Halt => "stop the machine",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// ---- Instructions ----

/// A resolved instruction. Jump targets are instruction indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Push(i64),
    Pop,
    Dup,
    Swap,
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
    Store(String),
    Load(String),
    Jmp(usize),
    Jmpz(usize),
    Jmpnz(usize),
    NewArray,
    ArraySet,
    ArrayGet,
    ArrayLen,
    FreeArr,
    NewStr(String),
    StrCat,
    StrLen,
    FreeStr,
    Print,
    PrintChar,
    PrintStr(String),
    Halt,
}

impl Instruction {
    /// Builds an instruction for an opcode that takes no operand.
    pub fn bare(opcode: Opcode) -> Option<Instruction> {
        Some(match opcode {
            Opcode::Pop => Instruction::Pop,
            Opcode::Dup => Instruction::Dup,
            Opcode::Swap => Instruction::Swap,
            Opcode::Add => Instruction::Add,
            Opcode::Sub => Instruction::Sub,
            Opcode::Mul => Instruction::Mul,
            Opcode::Div => Instruction::Div,
            Opcode::Lt => Instruction::Lt,
            Opcode::Le => Instruction::Le,
            Opcode::Gt => Instruction::Gt,
            Opcode::Ge => Instruction::Ge,
            Opcode::Eq => Instruction::Eq,
            Opcode::Ne => Instruction::Ne,
            Opcode::And => Instruction::And,
            Opcode::Or => Instruction::Or,
            Opcode::Not => Instruction::Not,
            Opcode::NewArray => Instruction::NewArray,
            Opcode::ArraySet => Instruction::ArraySet,
            Opcode::ArrayGet => Instruction::ArrayGet,
            Opcode::ArrayLen => Instruction::ArrayLen,
            Opcode::FreeArr => Instruction::FreeArr,
            Opcode::StrCat => Instruction::StrCat,
            Opcode::StrLen => Instruction::StrLen,
            Opcode::FreeStr => Instruction::FreeStr,
            Opcode::Print => Instruction::Print,
            Opcode::PrintChar => Instruction::PrintChar,
            Opcode::Halt => Instruction::Halt,
            _ => return None,
        })
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Push(_) => Opcode::Push,
            Instruction::Pop => Opcode::Pop,
            Instruction::Dup => Opcode::Dup,
            Instruction::Swap => Opcode::Swap,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::Mul => Opcode::Mul,
            Instruction::Div => Opcode::Div,
            Instruction::Lt => Opcode::Lt,
            Instruction::Le => Opcode::Le,
            Instruction::Gt => Opcode::Gt,
            Instruction::Ge => Opcode::Ge,
            Instruction::Eq => Opcode::Eq,
            Instruction::Ne => Opcode::Ne,
            Instruction::And => Opcode::And,
            Instruction::Or => Opcode::Or,
            Instruction::Not => Opcode::Not,
            Instruction::Store(_) => Opcode::Store,
            Instruction::Load(_) => Opcode::Load,
            Instruction::Jmp(_) => Opcode::Jmp,
            Instruction::Jmpz(_) => Opcode::Jmpz,
            Instruction::Jmpnz(_) => Opcode::Jmpnz,
            Instruction::NewArray => Opcode::NewArray,
            Instruction::ArraySet => Opcode::ArraySet,
            Instruction::ArrayGet => Opcode::ArrayGet,
            Instruction::ArrayLen => Opcode::ArrayLen,
            Instruction::FreeArr => Opcode::FreeArr,
            Instruction::NewStr(_) => Opcode::NewStr,
            Instruction::StrCat => Opcode::StrCat,
            Instruction::StrLen => Opcode::StrLen,
            Instruction::FreeStr => Opcode::FreeStr,
            Instruction::Print => Opcode::Print,
            Instruction::PrintChar => Opcode::PrintChar,
            Instruction::PrintStr(_) => Opcode::PrintStr,
            Instruction::Halt => Opcode::Halt,
        }
    }

    /// Source form: string operands are quoted so the text re-assembles.
    pub fn to_source(&self) -> String {
        match self {
            Instruction::NewStr(s) | Instruction::PrintStr(s) => {
                format!("{} \"{}\"", self.opcode(), escape(s))
            }
            _ => self.to_string(),
        }
    }
}

/// Wire form: `OPCODE` or `OPCODE operand`, string operands unquoted.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        match self {
            Instruction::Push(n) => write!(f, "{op} {n}"),
            Instruction::Store(name) | Instruction::Load(name) => write!(f, "{op} {name}"),
            Instruction::Jmp(t) | Instruction::Jmpz(t) | Instruction::Jmpnz(t) => write!(f, "{op} {t}"),
            Instruction::NewStr(s) | Instruction::PrintStr(s) => write!(f, "{op} {}", escape(s)),
            _ => write!(f, "{op}"),
        }
    }
}

/// Inverse of the lexer's unescaping for string literals.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

// ---- Program ----

/// An assembled program. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: BTreeMap<String, usize>,
    /// Source line of each instruction, parallel to `instructions`.
    pub lines: Vec<usize>,
    /// Label names that some jump operand spelled out.
    pub referenced: BTreeSet<String>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    pub fn line_of(&self, pc: usize) -> Option<usize> {
        self.lines.get(pc).copied()
    }

    /// Instruction texts in wire form.
    pub fn listing(&self) -> Vec<String> {
        self.instructions.iter().map(Instruction::to_string).collect()
    }

    /// Re-assemblable source, with label definitions restored.
    pub fn disassemble(&self) -> String {
        let mut by_index: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for (name, &idx) in &self.labels {
            by_index.entry(idx).or_default().push(name);
        }
        let mut out = String::new();
        for (idx, instr) in self.instructions.iter().enumerate() {
            for name in by_index.get(&idx).into_iter().flatten() {
                out.push_str(&format!("{name}:\n"));
            }
            out.push_str("    ");
            out.push_str(&instr.to_source());
            out.push('\n');
        }
        for name in by_index.get(&self.instructions.len()).into_iter().flatten() {
            out.push_str(&format!("{name}:\n"));
        }
        out
    }
}
