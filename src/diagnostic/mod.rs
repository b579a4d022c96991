pub mod ansi;
pub mod json;
pub mod registry;

use crate::assembler::{ParseError, ParseErrorKind};
use crate::program::{OperandKind, Program, Span};
use crate::session::SessionError;
use crate::vm::{Fault, RuntimeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, ..Diagnostic::error(message) }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: true });
        self
    }

    pub fn with_secondary_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: false });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for error types ----

impl From<&ParseError> for Diagnostic {
    fn from(e: &ParseError) -> Self {
        let label = match &e.kind {
            ParseErrorKind::UnknownOpcode(_) => "not an instruction",
            ParseErrorKind::MissingOperand { .. } => "operand missing",
            ParseErrorKind::UnexpectedOperand { .. } => "unexpected",
            ParseErrorKind::DuplicateLabel { .. } => "redefined here",
            ParseErrorKind::UndefinedLabel(_) => "no such label",
            ParseErrorKind::InvalidOperand { .. } => "wrong operand",
            ParseErrorKind::InvalidToken(_) => "here",
        };
        let d = Diagnostic::error(e.kind.to_string()).with_code(e.code()).with_span(e.span, label);
        match &e.kind {
            ParseErrorKind::UnknownOpcode(word) => match crate::program::Opcode::ALL
                .iter()
                .find(|op| op.mnemonic().eq_ignore_ascii_case(word))
            {
                Some(op) => d.with_suggestion(format!("mnemonics are case-sensitive: use '{op}'")),
                None => d.with_note("run `stackvm opcodes` for the instruction list"),
            },
            ParseErrorKind::MissingOperand { opcode, expected } => {
                d.with_suggestion(format!("{opcode} {}", example_operand(*expected)))
            }
            ParseErrorKind::DuplicateLabel { first, .. } => d.with_secondary_span(*first, "first defined here"),
            ParseErrorKind::UndefinedLabel(name) => {
                d.with_suggestion(format!("define it with a line '{name}:'"))
            }
            _ => d,
        }
    }
}

fn example_operand(kind: OperandKind) -> &'static str {
    match kind {
        OperandKind::Int => "42",
        OperandKind::Text => "\"text\"",
        OperandKind::Name => "counter",
        OperandKind::Label => "loop",
        OperandKind::None => "",
    }
}

impl From<&Fault> for Diagnostic {
    fn from(f: &Fault) -> Self {
        let mut d = Diagnostic::error(f.error.to_string()).with_code(f.code());
        let at = match &f.instruction {
            Some(text) => format!("at instruction {} ({text})", f.pc),
            None => format!("at instruction {} (end of program)", f.pc),
        };
        match f.line {
            Some(line) => d = d.with_span(Span { line, start: 0, end: 0 }, at),
            None => d = d.with_note(at),
        }
        match &f.error {
            RuntimeError::ProgramComplete => d.with_suggestion("load or reset to run again"),
            RuntimeError::UseAfterFree(_) => d.with_note("freed objects stay freed; allocate a new one"),
            _ => d,
        }
    }
}

impl From<&SessionError> for Diagnostic {
    fn from(e: &SessionError) -> Self {
        match e {
            SessionError::Parse(p) => Diagnostic::from(p),
            SessionError::Runtime(f) => Diagnostic::from(f),
            SessionError::NoProgram => Diagnostic::error(e.to_string())
                .with_code(e.code())
                .with_suggestion("load a program first"),
        }
    }
}

/// Non-fatal findings about an assembled program.
pub fn lint(program: &Program) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if !program.is_empty() && !program.instructions.iter().any(|i| i.opcode() == crate::program::Opcode::Halt) {
        out.push(
            Diagnostic::warning("program has no HALT instruction")
                .with_code("SVM-W001")
                .with_note("execution ends when the program counter runs off the end"),
        );
    }
    for name in crate::assembler::unused_labels(program) {
        out.push(Diagnostic::warning(format!("label '{name}' is never jumped to")).with_code("SVM-W002"));
    }
    out
}
