/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // one line, for `explain --list`
    pub long: &'static str,   // full explanation for `explain CODE`
}

/// All stable diagnostic codes.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Assembler ────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SVM-P001",
        short: "unknown opcode",
        long: r#"## SVM-P001: unknown opcode

The first word on a line is not a known mnemonic. Mnemonics are
case-sensitive and always upper case.

**Example:**

    push 10

**Fix:**

    PUSH 10

`stackvm opcodes` lists every instruction.
"#,
    },
    ErrorEntry {
        code: "SVM-P002",
        short: "missing operand",
        long: r#"## SVM-P002: missing operand

The instruction takes exactly one operand and none was given.

- `PUSH` takes an integer literal
- `STORE` and `LOAD` take a variable name
- `JMP`, `JMPZ` and `JMPNZ` take a label (or an instruction index)
- `NEWSTR` and `PRINTSTR` take a double-quoted string literal
"#,
    },
    ErrorEntry {
        code: "SVM-P003",
        short: "unexpected operand",
        long: r#"## SVM-P003: unexpected operand

An operand was given to an instruction that takes none, or more than
one operand was written on the line.

**Example:**

    ADD 3

Push the value first instead:

    PUSH 3
    ADD
"#,
    },
    ErrorEntry {
        code: "SVM-P004",
        short: "duplicate label",
        long: r#"## SVM-P004: duplicate label

A label name was defined twice. Every label must name exactly one
instruction position. Rename one of the two definitions.
"#,
    },
    ErrorEntry {
        code: "SVM-P005",
        short: "undefined label",
        long: r#"## SVM-P005: undefined label

A jump refers to a label that is never defined. Labels are resolved
when the program loads, so a typo here rejects the whole program and
the previously loaded program stays in place.

**Example:**

    JMP missing_label

**Fix:** add the definition on its own line (or before an instruction):

    missing_label:
"#,
    },
    ErrorEntry {
        code: "SVM-P006",
        short: "operand of the wrong kind",
        long: r#"## SVM-P006: operand of the wrong kind

The operand has the wrong shape for this instruction: a name where an
integer was expected, a bare word where a string literal was expected,
or a numeric jump target beyond the end of the program.

**Example:**

    PUSH x
    PRINTSTR hello
"#,
    },
    ErrorEntry {
        code: "SVM-P007",
        short: "invalid token",
        long: r#"## SVM-P007: invalid token

The line contains text that is not an identifier, integer, string
literal, `:` or `//` comment. Common causes are an unterminated string
literal, an integer that does not fit in 64 bits, or an unknown escape
sequence (only `\n`, `\t`, `\\` and `\"` are recognised).
"#,
    },

    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SVM-R001",
        short: "stack underflow",
        long: r#"## SVM-R001: stack underflow

The instruction needs more values than the stack holds. Nothing was
popped; the machine is exactly as it was before the step.
"#,
    },
    ErrorEntry {
        code: "SVM-R002",
        short: "type mismatch",
        long: r#"## SVM-R002: type mismatch

An operand had the wrong type: arithmetic, comparisons and conditional
jumps need numbers, array instructions need an array handle, string
instructions need a string handle.
"#,
    },
    ErrorEntry {
        code: "SVM-R003",
        short: "division by zero",
        long: r#"## SVM-R003: division by zero

`DIV` was executed with a zero divisor. Both operands stay on the
stack and the program counter does not move.
"#,
    },
    ErrorEntry {
        code: "SVM-R004",
        short: "index out of bounds",
        long: r#"## SVM-R004: index out of bounds

An `ARRAYGET` or `ARRAYSET` index is negative or not less than the
array's length. Use `ARRAYLEN` to check the size first.
"#,
    },
    ErrorEntry {
        code: "SVM-R005",
        short: "use after free",
        long: r#"## SVM-R005: use after free

A handle refers to an array or string that was already freed with
`FREEARR` or `FREESTR`. Freeing the same handle twice is reported the
same way.

**Example:**

    PUSH 3
    NEWARRAY
    DUP
    FREEARR
    ARRAYLEN
"#,
    },
    ErrorEntry {
        code: "SVM-R006",
        short: "invalid handle",
        long: r#"## SVM-R006: invalid handle

A handle does not name any object of the expected kind. This happens
when a handle value is used with the other heap's instructions.
"#,
    },
    ErrorEntry {
        code: "SVM-R007",
        short: "unknown variable",
        long: r#"## SVM-R007: unknown variable

`LOAD` named a variable that no `STORE` has bound yet.
"#,
    },
    ErrorEntry {
        code: "SVM-R008",
        short: "program complete",
        long: r#"## SVM-R008: program complete

`step` was called after the machine halted or ran past its last
instruction. The state is never changed by this error; load a program
again (or reset) to start over.
"#,
    },
    ErrorEntry {
        code: "SVM-R009",
        short: "invalid array size",
        long: r#"## SVM-R009: invalid array size

`NEWARRAY` was given a negative size, or a size too large to allocate.
"#,
    },
    ErrorEntry {
        code: "SVM-R010",
        short: "invalid character code",
        long: r#"## SVM-R010: invalid character code

`PRINTCHAR` was given a number that is not a Unicode scalar value
(negative, above 0x10FFFF, or a surrogate).
"#,
    },

    // ── Session ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SVM-S001",
        short: "no program loaded",
        long: r#"## SVM-S001: no program loaded

`step` was requested while the session is idle. Send `load` first.
"#,
    },
    ErrorEntry {
        code: "SVM-S002",
        short: "malformed request",
        long: r#"## SVM-S002: malformed request

A protocol line was not a JSON object with a known `op`. Valid
requests are:

    {"op":"load","code":"PUSH 1\nHALT"}
    {"op":"step"}
    {"op":"reset"}
    {"op":"get_state"}
"#,
    },
    ErrorEntry {
        code: "SVM-S003",
        short: "step limit reached",
        long: r#"## SVM-S003: step limit reached

`stackvm run` stopped after `--max-steps` instructions without the
program halting. Raise the limit or look for a loop that never exits.
"#,
    },

    // ── Warnings ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SVM-W001",
        short: "no HALT instruction",
        long: r#"## SVM-W001: no HALT instruction

The program never executes `HALT`. That is allowed: execution also
ends when the program counter runs past the last instruction.
"#,
    },
    ErrorEntry {
        code: "SVM-W002",
        short: "unused label",
        long: r#"## SVM-W002: unused label

No jump refers to this label.
"#,
    },
];

/// Look up an error entry by code (e.g. `"SVM-R005"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}
