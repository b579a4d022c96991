use std::collections::{BTreeMap, BTreeSet};

use crate::lexer::{self, Token};
use crate::program::{Instruction, Opcode, OperandKind, Program, Span};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),
    #[error("{opcode} requires {expected}")]
    MissingOperand { opcode: Opcode, expected: OperandKind },
    #[error("unexpected operand {found} after {opcode}")]
    UnexpectedOperand { opcode: Opcode, found: String },
    #[error("label '{name}' is already defined on line {}", .first.line)]
    DuplicateLabel { name: String, first: Span },
    #[error("undefined label '{0}'")]
    UndefinedLabel(String),
    #[error("{opcode} expects {expected}, found {found}")]
    InvalidOperand { opcode: Opcode, expected: OperandKind, found: String },
    #[error("{0}")]
    InvalidToken(String),
}

impl ParseErrorKind {
    /// Stable diagnostic code, see `diagnostic::registry`.
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::UnknownOpcode(_) => "SVM-P001",
            ParseErrorKind::MissingOperand { .. } => "SVM-P002",
            ParseErrorKind::UnexpectedOperand { .. } => "SVM-P003",
            ParseErrorKind::DuplicateLabel { .. } => "SVM-P004",
            ParseErrorKind::UndefinedLabel(_) => "SVM-P005",
            ParseErrorKind::InvalidOperand { .. } => "SVM-P006",
            ParseErrorKind::InvalidToken(_) => "SVM-P007",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub span: Span,
    pub kind: ParseErrorKind,
}

impl ParseError {
    fn new(span: Span, kind: ParseErrorKind) -> Self {
        ParseError { line: span.line, span, kind }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

type Result<T> = std::result::Result<T, ParseError>;

const MAX_ERRORS: usize = 20;

#[derive(Debug, Clone)]
enum RawOperand {
    Int(i64),
    Text(String),
    Ident(String),
}

impl RawOperand {
    fn describe(&self) -> String {
        match self {
            RawOperand::Int(n) => format!("integer {n}"),
            RawOperand::Text(s) => format!("string \"{}\"", crate::program::escape(s)),
            RawOperand::Ident(name) => format!("name '{name}'"),
        }
    }
}

/// An instruction line after pass 1: mnemonic looked up, operand not yet checked.
#[derive(Debug)]
struct Pending {
    opcode: Opcode,
    operand: Option<(RawOperand, Span)>,
    span: Span,
}

#[derive(Debug, Default)]
struct Assembler {
    labels: BTreeMap<String, (usize, Span)>,
    pending: Vec<Pending>,
    errors: Vec<ParseError>,
}

/// Assemble program text, stopping at the first error.
pub fn assemble(source: &str) -> Result<Program> {
    assemble_all(source).map_err(|mut errors| errors.remove(0))
}

/// Assemble program text, collecting up to `MAX_ERRORS` errors.
/// Either a complete program or a non-empty error list is returned.
pub fn assemble_all(source: &str) -> std::result::Result<Program, Vec<ParseError>> {
    let mut asm = Assembler::default();
    for (idx, line) in source.lines().enumerate() {
        if asm.errors.len() >= MAX_ERRORS {
            break;
        }
        if let Err(e) = asm.scan_line(idx + 1, line) {
            asm.errors.push(e);
        }
    }
    asm.resolve()
}

impl Assembler {
    // ---- Pass 1: label table and instruction slots ----

    fn scan_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let tokens = lexer::lex_line(line).map_err(|e| {
            let span = Span::new(line_no, e.column..e.column + e.snippet.len().max(1));
            ParseError::new(span, ParseErrorKind::InvalidToken(e.reason))
        })?;
        let mut tokens = tokens
            .into_iter()
            .map(|(tok, range)| (tok, Span::new(line_no, range)))
            .peekable();

        let Some((first, first_span)) = tokens.next() else {
            return Ok(());
        };
        let Token::Ident(word) = first else {
            return Err(ParseError::new(
                first_span,
                ParseErrorKind::InvalidToken(format!(
                    "expected a mnemonic or label, found {}",
                    first.describe()
                )),
            ));
        };

        // `name:` defines a label at the next instruction slot; an instruction may follow.
        let (mnemonic, mnemonic_span) = if matches!(tokens.peek(), Some((Token::Colon, _))) {
            tokens.next();
            self.define_label(word, first_span)?;
            match tokens.next() {
                None => return Ok(()),
                Some((Token::Ident(word), span)) => (word, span),
                Some((tok, span)) => {
                    return Err(ParseError::new(
                        span,
                        ParseErrorKind::InvalidToken(format!(
                            "expected a mnemonic after the label, found {}",
                            tok.describe()
                        )),
                    ));
                }
            }
        } else {
            (word, first_span)
        };

        let opcode = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| {
            ParseError::new(mnemonic_span, ParseErrorKind::UnknownOpcode(mnemonic.clone()))
        })?;

        let operand = match tokens.next() {
            None => None,
            Some((Token::Int(n), span)) => Some((RawOperand::Int(n), span)),
            Some((Token::Text(s), span)) => Some((RawOperand::Text(s), span)),
            Some((Token::Ident(name), span)) => Some((RawOperand::Ident(name), span)),
            Some((Token::Colon, span)) => {
                return Err(ParseError::new(
                    span,
                    ParseErrorKind::UnexpectedOperand { opcode, found: "':'".into() },
                ));
            }
        };

        if let Some((extra, span)) = tokens.next() {
            return Err(ParseError::new(
                span,
                ParseErrorKind::UnexpectedOperand { opcode, found: extra.describe() },
            ));
        }

        let span = match &operand {
            Some((_, op_span)) => mnemonic_span.merge(*op_span),
            None => mnemonic_span,
        };
        self.pending.push(Pending { opcode, operand, span });
        Ok(())
    }

    fn define_label(&mut self, name: String, span: Span) -> Result<()> {
        if let Some(&(_, first)) = self.labels.get(&name) {
            return Err(ParseError::new(span, ParseErrorKind::DuplicateLabel { name, first }));
        }
        self.labels.insert(name, (self.pending.len(), span));
        Ok(())
    }

    // ---- Pass 2: operand checks and label resolution ----

    fn resolve(mut self) -> std::result::Result<Program, Vec<ParseError>> {
        let count = self.pending.len();
        let mut instructions = Vec::with_capacity(count);
        let mut lines = Vec::with_capacity(count);
        let mut referenced = BTreeSet::new();

        for pending in std::mem::take(&mut self.pending) {
            if self.errors.len() >= MAX_ERRORS {
                break;
            }
            lines.push(pending.span.line);
            if let Some((RawOperand::Ident(name), _)) = &pending.operand
                && pending.opcode.operand_kind() == OperandKind::Label
            {
                referenced.insert(name.clone());
            }
            match self.build(pending, count) {
                Ok(instr) => instructions.push(instr),
                Err(e) => self.errors.push(e),
            }
        }

        if !self.errors.is_empty() {
            self.errors.sort_by_key(|e| (e.line, e.span.start));
            return Err(self.errors);
        }

        let labels = self.labels.into_iter().map(|(name, (idx, _))| (name, idx)).collect();
        Ok(Program { instructions, labels, lines, referenced })
    }

    fn build(&self, pending: Pending, count: usize) -> Result<Instruction> {
        let Pending { opcode, operand, span } = pending;
        let expected = opcode.operand_kind();

        let (operand, op_span) = match (expected, operand) {
            (OperandKind::None, None) => {
                return Instruction::bare(opcode).ok_or_else(|| {
                    ParseError::new(span, ParseErrorKind::MissingOperand { opcode, expected })
                });
            }
            (OperandKind::None, Some((found, op_span))) => {
                return Err(ParseError::new(
                    op_span,
                    ParseErrorKind::UnexpectedOperand { opcode, found: found.describe() },
                ));
            }
            (_, None) => {
                return Err(ParseError::new(span, ParseErrorKind::MissingOperand { opcode, expected }));
            }
            (_, Some(operand)) => operand,
        };

        let invalid = |found: &RawOperand| {
            ParseError::new(
                op_span,
                ParseErrorKind::InvalidOperand { opcode, expected, found: found.describe() },
            )
        };

        let instr = match (opcode, operand) {
            (Opcode::Push, RawOperand::Int(n)) => Instruction::Push(n),
            (Opcode::Store, RawOperand::Ident(name)) => Instruction::Store(name),
            (Opcode::Load, RawOperand::Ident(name)) => Instruction::Load(name),
            (Opcode::NewStr, RawOperand::Text(s)) => Instruction::NewStr(s),
            (Opcode::PrintStr, RawOperand::Text(s)) => Instruction::PrintStr(s),
            (Opcode::Jmp | Opcode::Jmpz | Opcode::Jmpnz, target) => {
                let target = self.target(&target, op_span, count).map_err(|e| match e {
                    Some(e) => e,
                    None => invalid(&target),
                })?;
                match opcode {
                    Opcode::Jmp => Instruction::Jmp(target),
                    Opcode::Jmpz => Instruction::Jmpz(target),
                    _ => Instruction::Jmpnz(target),
                }
            }
            (_, other) => return Err(invalid(&other)),
        };
        Ok(instr)
    }

    /// `Err(None)` means the operand has the wrong shape for a jump target.
    fn target(
        &self,
        operand: &RawOperand,
        span: Span,
        count: usize,
    ) -> std::result::Result<usize, Option<ParseError>> {
        match operand {
            RawOperand::Ident(name) => self
                .labels
                .get(name)
                .map(|&(idx, _)| idx)
                .ok_or_else(|| Some(ParseError::new(span, ParseErrorKind::UndefinedLabel(name.clone())))),
            RawOperand::Int(n) => usize::try_from(*n).ok().filter(|&t| t <= count).ok_or(None),
            RawOperand::Text(_) => Err(None),
        }
    }
}

/// Labels that no jump names. Used for `check` warnings.
pub fn unused_labels(program: &Program) -> Vec<String> {
    program
        .labels
        .keys()
        .filter(|name| !program.referenced.contains(*name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(source: &str) -> ParseErrorKind {
        assemble(source).unwrap_err().kind
    }

    #[test]
    fn labels_do_not_occupy_slots() {
        let program = assemble("PUSH 1\nloop:\nDUP\nJMP loop\nend:\n").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.labels["loop"], 1);
        assert_eq!(program.labels["end"], 3);
        assert_eq!(program.instructions[2], Instruction::Jmp(1));
    }

    #[test]
    fn forward_references_resolve() {
        let program = assemble("JMPZ done\nPUSH 1\ndone:\nHALT").unwrap();
        assert_eq!(program.instructions[0], Instruction::Jmpz(2));
    }

    #[test]
    fn inline_label_prefixes_instruction() {
        let program = assemble("start: PUSH 0\nloop: LOAD counter\nJMPNZ loop").unwrap();
        assert_eq!(program.labels["start"], 0);
        assert_eq!(program.labels["loop"], 1);
        assert_eq!(program.instructions[2], Instruction::Jmpnz(1));
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let program = assemble("// header\n\n   PUSH 10   // size\n\nHALT\n").unwrap();
        assert_eq!(program.instructions, vec![Instruction::Push(10), Instruction::Halt]);
        assert_eq!(program.lines, vec![3, 5]);
    }

    #[test]
    fn string_operands_keep_inner_text() {
        let program = assemble(r#"NEWSTR "Hello, ""#).unwrap();
        assert_eq!(program.instructions[0], Instruction::NewStr("Hello, ".into()));
    }

    #[test]
    fn numeric_jump_targets_accepted_up_to_len() {
        let program = assemble("JMP 2\nHALT").unwrap();
        assert_eq!(program.instructions[0], Instruction::Jmp(2));
        assert!(matches!(kind("JMP 3\nHALT"), ParseErrorKind::InvalidOperand { .. }));
    }

    #[test]
    fn unknown_opcode() {
        assert_eq!(kind("PUSH 1\nOVER"), ParseErrorKind::UnknownOpcode("OVER".into()));
        assert_eq!(kind("push 1"), ParseErrorKind::UnknownOpcode("push".into()));
    }

    #[test]
    fn missing_operand() {
        assert!(matches!(kind("PUSH"), ParseErrorKind::MissingOperand { opcode: Opcode::Push, .. }));
        assert!(matches!(kind("STORE"), ParseErrorKind::MissingOperand { opcode: Opcode::Store, .. }));
    }

    #[test]
    fn unexpected_operand() {
        assert!(matches!(kind("ADD 3"), ParseErrorKind::UnexpectedOperand { opcode: Opcode::Add, .. }));
        assert!(matches!(kind("PUSH 1 2"), ParseErrorKind::UnexpectedOperand { opcode: Opcode::Push, .. }));
    }

    #[test]
    fn wrong_operand_shape() {
        assert!(matches!(kind("PUSH x"), ParseErrorKind::InvalidOperand { .. }));
        assert!(matches!(kind(r#"LOAD "x""#), ParseErrorKind::InvalidOperand { .. }));
        assert!(matches!(kind("PRINTSTR hello"), ParseErrorKind::InvalidOperand { .. }));
    }

    #[test]
    fn duplicate_label() {
        let err = assemble("a:\nPUSH 1\na:\nHALT").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(
            err.kind,
            ParseErrorKind::DuplicateLabel { name: "a".into(), first: Span { line: 1, start: 0, end: 1 } }
        );
    }

    #[test]
    fn undefined_label() {
        let err = assemble("PUSH 1\nJMP missing_label").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UndefinedLabel("missing_label".into()));
        assert_eq!(err.line, 2);
        assert_eq!(err.code(), "SVM-P005");
    }

    #[test]
    fn error_span_points_at_operand() {
        let err = assemble("  ADD 3").unwrap_err();
        assert_eq!(err.span, Span { line: 1, start: 6, end: 7 });
    }

    #[test]
    fn lex_errors_become_invalid_token() {
        let err = assemble("PUSH 1\nPUSH #").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidToken(_)));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn all_errors_collected_in_line_order() {
        let errors = assemble_all("FOO\nPUSH\nJMP nowhere\nHALT").unwrap_err();
        let codes: Vec<_> = errors.iter().map(ParseError::code).collect();
        assert_eq!(codes, vec!["SVM-P001", "SVM-P002", "SVM-P005"]);
    }

    #[test]
    fn empty_source_is_an_empty_program() {
        let program = assemble("\n// nothing\n").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn disassembly_reassembles_to_the_same_program() {
        let source = "i:\nPUSH 1\nNEWSTR \"a\\tb\"\nJMPNZ i\nPRINTSTR \"done\\n\"\nHALT";
        let program = assemble(source).unwrap();
        let again = assemble(&program.disassemble()).unwrap();
        assert_eq!(program.instructions, again.instructions);
        assert_eq!(program.labels, again.labels);
    }

    #[test]
    fn unused_labels_reported() {
        let program = assemble("start:\nPUSH 1\nloop:\nJMP loop").unwrap();
        assert_eq!(unused_labels(&program), vec!["start".to_string()]);
    }

    #[test]
    fn labels_sharing_a_slot_are_tracked_by_name() {
        let program = assemble("unused:\nloop: PUSH 0\nJMPZ loop").unwrap();
        assert_eq!(program.labels["unused"], program.labels["loop"]);
        assert_eq!(unused_labels(&program), vec!["unused".to_string()]);
    }

    #[test]
    fn numeric_targets_reference_no_label() {
        let program = assemble("top:\nJMP 0").unwrap();
        assert_eq!(unused_labels(&program), vec!["top".to_string()]);
    }
}
