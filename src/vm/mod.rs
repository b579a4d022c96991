use std::collections::BTreeMap;
use std::sync::Arc;

use crate::heap::{Handle, Heap, HeapError, Value};
use crate::program::{Instruction, Opcode, Program};

pub mod output;
pub use output::Output;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("stack underflow: {opcode} needs {needed} value(s), stack holds {depth}")]
    StackUnderflow { opcode: Opcode, needed: usize, depth: usize },
    #[error("type mismatch: {opcode} expected {expected}, found {found}")]
    TypeMismatch { opcode: Opcode, expected: &'static str, found: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("index {index} out of bounds for array of length {len}")]
    OutOfBounds { index: i64, len: usize },
    #[error("use after free: {0}")]
    UseAfterFree(String),
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("program complete: no instruction left to execute")]
    ProgramComplete,
    #[error("invalid array size {0}")]
    InvalidArraySize(i64),
    #[error("{0} is not a valid character code")]
    InvalidCharacter(i64),
}

impl RuntimeError {
    /// Stable diagnostic code, see `diagnostic::registry`.
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::StackUnderflow { .. } => "SVM-R001",
            RuntimeError::TypeMismatch { .. } => "SVM-R002",
            RuntimeError::DivisionByZero => "SVM-R003",
            RuntimeError::OutOfBounds { .. } => "SVM-R004",
            RuntimeError::UseAfterFree(_) => "SVM-R005",
            RuntimeError::InvalidHandle(_) => "SVM-R006",
            RuntimeError::UnknownVariable(_) => "SVM-R007",
            RuntimeError::ProgramComplete => "SVM-R008",
            RuntimeError::InvalidArraySize(_) => "SVM-R009",
            RuntimeError::InvalidCharacter(_) => "SVM-R010",
        }
    }
}

impl From<HeapError> for RuntimeError {
    fn from(e: HeapError) -> Self {
        match e {
            HeapError::UseAfterFree { .. } | HeapError::DoubleFree { .. } => {
                RuntimeError::UseAfterFree(e.to_string())
            }
            HeapError::InvalidHandle { .. } => RuntimeError::InvalidHandle(e.to_string()),
            HeapError::AllocationFailed(size) => {
                RuntimeError::InvalidArraySize(i64::try_from(size).unwrap_or(i64::MAX))
            }
        }
    }
}

/// A runtime error tied to the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("instruction {pc}: {error}")]
pub struct Fault {
    pub pc: usize,
    /// Wire text of the faulting instruction; `None` past the end of the program.
    pub instruction: Option<String>,
    pub line: Option<usize>,
    pub error: RuntimeError,
}

impl Fault {
    pub fn code(&self) -> &'static str {
        self.error.code()
    }
}

type VmResult<T> = Result<T, RuntimeError>;

/// Where control goes after an instruction completes.
enum Flow {
    Next,
    Jump(usize),
    Halt,
}

/// Execution state of one loaded program.
#[derive(Debug, Clone)]
pub struct Machine {
    program: Arc<Program>,
    stack: Vec<Value>,
    memory: BTreeMap<String, Value>,
    heap: Heap,
    pc: usize,
    halted: bool,
    output: Output,
}

impl Machine {
    pub fn new(program: Program) -> Self {
        Machine {
            program: Arc::new(program),
            stack: Vec::new(),
            memory: BTreeMap::new(),
            heap: Heap::new(),
            pc: 0,
            halted: false,
            output: Output::default(),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn memory(&self) -> &BTreeMap<String, Value> {
        &self.memory
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    /// True once `HALT` ran or the program counter ran off the end.
    pub fn is_finished(&self) -> bool {
        self.halted || self.pc >= self.program.len()
    }

    /// Execute exactly one instruction. On error nothing about the machine changes.
    pub fn step(&mut self) -> Result<(), Fault> {
        if self.is_finished() {
            return Err(self.fault(RuntimeError::ProgramComplete));
        }
        let program = Arc::clone(&self.program);
        let instruction = &program.instructions[self.pc];

        log::debug!(
            target: "stackvm::vm",
            "pc={} {} depth={}",
            self.pc,
            instruction,
            self.stack.len()
        );

        match self.execute(instruction) {
            Ok(Flow::Next) => self.pc += 1,
            Ok(Flow::Jump(target)) => self.pc = target,
            Ok(Flow::Halt) => self.halted = true,
            Err(error) => return Err(self.fault(error)),
        }
        Ok(())
    }

    fn fault(&self, error: RuntimeError) -> Fault {
        Fault {
            pc: self.pc,
            instruction: self.program.get(self.pc).map(Instruction::to_string),
            line: self.program.line_of(self.pc),
            error,
        }
    }

    // ---- Operand access ----
    //
    // Operands are inspected in place and only removed once every check has
    // passed, which is what keeps a failing instruction free of side effects.

    fn require(&self, opcode: Opcode, needed: usize) -> VmResult<()> {
        if self.stack.len() < needed {
            return Err(RuntimeError::StackUnderflow { opcode, needed, depth: self.stack.len() });
        }
        Ok(())
    }

    /// Value `depth` slots below the top (0 = top). Callers `require` first.
    fn peek(&self, depth: usize) -> Value {
        self.stack[self.stack.len() - 1 - depth]
    }

    fn number_at(&self, opcode: Opcode, depth: usize) -> VmResult<i64> {
        match self.peek(depth) {
            Value::Number(n) => Ok(n),
            other => Err(mismatch(opcode, "number", &other)),
        }
    }

    fn array_at(&self, opcode: Opcode, depth: usize) -> VmResult<Handle> {
        match self.peek(depth) {
            Value::ArrayHandle(h) => Ok(h),
            other => Err(mismatch(opcode, "array", &other)),
        }
    }

    fn string_at(&self, opcode: Opcode, depth: usize) -> VmResult<Handle> {
        match self.peek(depth) {
            Value::StringHandle(h) => Ok(h),
            other => Err(mismatch(opcode, "string", &other)),
        }
    }

    fn drop_top(&mut self, count: usize) {
        let len = self.stack.len();
        self.stack.truncate(len - count);
    }

    fn binary(&mut self, opcode: Opcode, op: impl FnOnce(i64, i64) -> VmResult<i64>) -> VmResult<Flow> {
        self.require(opcode, 2)?;
        let b = self.number_at(opcode, 0)?;
        let a = self.number_at(opcode, 1)?;
        let result = op(a, b)?;
        self.drop_top(2);
        self.stack.push(Value::Number(result));
        Ok(Flow::Next)
    }

    fn branch(&mut self, opcode: Opcode, target: usize, jump_if_zero: bool) -> VmResult<Flow> {
        self.require(opcode, 1)?;
        let n = self.number_at(opcode, 0)?;
        self.drop_top(1);
        if (n == 0) == jump_if_zero {
            Ok(Flow::Jump(target))
        } else {
            Ok(Flow::Next)
        }
    }

    // ---- Dispatch ----

    fn execute(&mut self, instruction: &Instruction) -> VmResult<Flow> {
        let opcode = instruction.opcode();
        match instruction {
            // Stack
            Instruction::Push(n) => {
                self.stack.push(Value::Number(*n));
            }
            Instruction::Pop => {
                self.require(opcode, 1)?;
                self.drop_top(1);
            }
            Instruction::Dup => {
                self.require(opcode, 1)?;
                let top = self.peek(0);
                self.stack.push(top);
            }
            Instruction::Swap => {
                self.require(opcode, 2)?;
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }

            // Arithmetic: pop b, pop a, push a op b
            Instruction::Add => return self.binary(opcode, |a, b| Ok(a.wrapping_add(b))),
            Instruction::Sub => return self.binary(opcode, |a, b| Ok(a.wrapping_sub(b))),
            Instruction::Mul => return self.binary(opcode, |a, b| Ok(a.wrapping_mul(b))),
            Instruction::Div => {
                return self.binary(opcode, |a, b| {
                    if b == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    Ok(a.wrapping_div(b))
                });
            }

            // Compare and logic
            Instruction::Lt => return self.binary(opcode, |a, b| Ok(truth(a < b))),
            Instruction::Le => return self.binary(opcode, |a, b| Ok(truth(a <= b))),
            Instruction::Gt => return self.binary(opcode, |a, b| Ok(truth(a > b))),
            Instruction::Ge => return self.binary(opcode, |a, b| Ok(truth(a >= b))),
            Instruction::Eq => return self.binary(opcode, |a, b| Ok(truth(a == b))),
            Instruction::Ne => return self.binary(opcode, |a, b| Ok(truth(a != b))),
            Instruction::And => return self.binary(opcode, |a, b| Ok(truth(a != 0 && b != 0))),
            Instruction::Or => return self.binary(opcode, |a, b| Ok(truth(a != 0 || b != 0))),
            Instruction::Not => {
                self.require(opcode, 1)?;
                let a = self.number_at(opcode, 0)?;
                self.drop_top(1);
                self.stack.push(Value::Number(truth(a == 0)));
            }

            // Memory
            Instruction::Store(name) => {
                self.require(opcode, 1)?;
                let value = self.peek(0);
                self.drop_top(1);
                self.memory.insert(name.clone(), value);
            }
            Instruction::Load(name) => {
                let value = *self
                    .memory
                    .get(name)
                    .ok_or_else(|| RuntimeError::UnknownVariable(name.clone()))?;
                self.stack.push(value);
            }

            // Control
            Instruction::Jmp(target) => return Ok(Flow::Jump(*target)),
            Instruction::Jmpz(target) => return self.branch(opcode, *target, true),
            Instruction::Jmpnz(target) => return self.branch(opcode, *target, false),

            // Arrays
            Instruction::NewArray => {
                self.require(opcode, 1)?;
                let size = self.number_at(opcode, 0)?;
                let size = usize::try_from(size).map_err(|_| RuntimeError::InvalidArraySize(size))?;
                let handle = self.heap.allocate_array(size)?;
                self.drop_top(1);
                self.stack.push(Value::ArrayHandle(handle));
            }
            Instruction::ArraySet => {
                self.require(opcode, 3)?;
                let value = self.peek(0);
                let index = self.number_at(opcode, 1)?;
                let handle = self.array_at(opcode, 2)?;
                let elements = self.heap.array_mut(handle)?;
                let slot = checked_index(index, elements.len())?;
                elements[slot] = value;
                self.drop_top(3);
            }
            Instruction::ArrayGet => {
                self.require(opcode, 2)?;
                let index = self.number_at(opcode, 0)?;
                let handle = self.array_at(opcode, 1)?;
                let elements = self.heap.array(handle)?;
                let value = elements[checked_index(index, elements.len())?];
                self.drop_top(2);
                self.stack.push(value);
            }
            Instruction::ArrayLen => {
                self.require(opcode, 1)?;
                let handle = self.array_at(opcode, 0)?;
                let len = self.heap.array(handle)?.len();
                self.drop_top(1);
                self.stack.push(Value::Number(len as i64));
            }
            Instruction::FreeArr => {
                self.require(opcode, 1)?;
                let handle = self.array_at(opcode, 0)?;
                self.heap.free_array(handle)?;
                self.drop_top(1);
            }

            // Strings
            Instruction::NewStr(text) => {
                let handle = self.heap.allocate_string(text.as_str());
                self.stack.push(Value::StringHandle(handle));
            }
            Instruction::StrCat => {
                self.require(opcode, 2)?;
                let b = self.string_at(opcode, 0)?;
                let a = self.string_at(opcode, 1)?;
                let joined = self.heap.concat_strings(a, b)?;
                self.drop_top(2);
                self.stack.push(Value::StringHandle(joined));
            }
            Instruction::StrLen => {
                self.require(opcode, 1)?;
                let handle = self.string_at(opcode, 0)?;
                let len = self.heap.string(handle)?.chars().count();
                self.drop_top(1);
                self.stack.push(Value::Number(len as i64));
            }
            Instruction::FreeStr => {
                self.require(opcode, 1)?;
                let handle = self.string_at(opcode, 0)?;
                self.heap.free_string(handle)?;
                self.drop_top(1);
            }

            // I/O
            Instruction::Print => {
                self.require(opcode, 1)?;
                let text = match self.peek(0) {
                    Value::Number(n) => n.to_string(),
                    Value::StringHandle(h) => self.heap.string(h)?.to_string(),
                    other => return Err(mismatch(opcode, "number or string", &other)),
                };
                self.drop_top(1);
                self.output.print_line(&text);
            }
            Instruction::PrintChar => {
                self.require(opcode, 1)?;
                let code = self.number_at(opcode, 0)?;
                let c = u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(RuntimeError::InvalidCharacter(code))?;
                self.drop_top(1);
                self.output.push_char(c);
            }
            Instruction::PrintStr(text) => {
                self.output.push_text(text);
            }

            Instruction::Halt => return Ok(Flow::Halt),
        }
        Ok(Flow::Next)
    }
}

fn truth(b: bool) -> i64 {
    if b { 1 } else { 0 }
}

fn mismatch(opcode: Opcode, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch { opcode, expected, found: found.type_name() }
}

fn checked_index(index: i64, len: usize) -> VmResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(RuntimeError::OutOfBounds { index, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    fn machine(source: &str) -> Machine {
        Machine::new(assemble(source).unwrap())
    }

    /// Step until finished or faulted; returns the fault, if any.
    fn run(m: &mut Machine) -> Option<Fault> {
        while !m.is_finished() {
            if let Err(f) = m.step() {
                return Some(f);
            }
        }
        None
    }

    fn top(m: &Machine) -> Value {
        *m.stack().last().unwrap()
    }

    #[test]
    fn sub_takes_operands_in_push_order() {
        let mut m = machine("PUSH 5\nPUSH 3\nSUB");
        assert!(run(&mut m).is_none());
        assert_eq!(top(&m), Value::Number(2));
    }

    #[test]
    fn div_truncates_toward_zero() {
        let mut m = machine("PUSH -7\nPUSH 2\nDIV");
        run(&mut m);
        assert_eq!(top(&m), Value::Number(-3));
    }

    #[test]
    fn division_by_zero_leaves_state_untouched() {
        let mut m = machine("PUSH 6\nPUSH 0\nDIV");
        m.step().unwrap();
        m.step().unwrap();
        let before = (m.stack().to_vec(), m.pc());
        let fault = m.step().unwrap_err();
        assert_eq!(fault.error, RuntimeError::DivisionByZero);
        assert_eq!(fault.pc, 2);
        assert_eq!(fault.instruction.as_deref(), Some("DIV"));
        assert_eq!((m.stack().to_vec(), m.pc()), before);
    }

    #[test]
    fn comparisons_push_one_or_zero() {
        let mut m = machine("PUSH 1\nPUSH 2\nLT\nPUSH 2\nPUSH 2\nGT\nPUSH 3\nPUSH 3\nEQ\nPUSH 4\nPUSH 3\nGE\nPUSH 5\nPUSH 4\nLE");
        run(&mut m);
        let got: Vec<i64> = m.stack().iter().map(Value::to_wire).collect();
        assert_eq!(got, vec![1, 0, 1, 1, 0]);
    }

    #[test]
    fn logic_ops() {
        let mut m = machine("PUSH 2\nPUSH 0\nAND\nPUSH 0\nPUSH 7\nOR\nPUSH 0\nNOT\nPUSH 1\nPUSH 2\nNE");
        run(&mut m);
        let got: Vec<i64> = m.stack().iter().map(Value::to_wire).collect();
        assert_eq!(got, vec![0, 1, 1, 1]);
    }

    #[test]
    fn store_load_round_trip() {
        let mut m = machine("PUSH 42\nSTORE x\nLOAD x");
        run(&mut m);
        assert_eq!(top(&m), Value::Number(42));
        assert_eq!(m.memory()["x"], Value::Number(42));
    }

    #[test]
    fn load_unbound_variable() {
        let mut m = machine("LOAD nope");
        let fault = run(&mut m).unwrap();
        assert_eq!(fault.error, RuntimeError::UnknownVariable("nope".into()));
        assert_eq!(fault.line, Some(1));
    }

    #[test]
    fn pop_on_empty_stack_underflows() {
        let mut m = machine("POP");
        let fault = m.step().unwrap_err();
        assert!(matches!(fault.error, RuntimeError::StackUnderflow { needed: 1, depth: 0, .. }));
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn failed_binary_op_keeps_both_operands() {
        let mut m = machine("NEWSTR \"x\"\nPUSH 1\nADD");
        m.step().unwrap();
        m.step().unwrap();
        let fault = m.step().unwrap_err();
        assert!(matches!(fault.error, RuntimeError::TypeMismatch { expected: "number", found: "string", .. }));
        assert_eq!(m.stack().len(), 2);
    }

    #[test]
    fn swap_and_dup() {
        let mut m = machine("PUSH 1\nPUSH 2\nSWAP\nDUP");
        run(&mut m);
        let got: Vec<i64> = m.stack().iter().map(Value::to_wire).collect();
        assert_eq!(got, vec![2, 1, 1]);
    }

    #[test]
    fn array_set_then_get() {
        let mut m = machine("PUSH 3\nNEWARRAY\nDUP\nPUSH 0\nPUSH 100\nARRAYSET\nDUP\nPUSH 0\nARRAYGET");
        assert!(run(&mut m).is_none());
        assert_eq!(top(&m), Value::Number(100));
    }

    #[test]
    fn array_len_and_bounds() {
        let mut m = machine("PUSH 2\nNEWARRAY\nDUP\nARRAYLEN\nSWAP\nPUSH 2\nARRAYGET");
        m.step().unwrap();
        m.step().unwrap();
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(top(&m), Value::Number(2));
        let fault = run(&mut m).unwrap();
        assert_eq!(fault.error, RuntimeError::OutOfBounds { index: 2, len: 2 });
    }

    #[test]
    fn negative_index_is_out_of_bounds() {
        let mut m = machine("PUSH 1\nNEWARRAY\nPUSH -1\nPUSH 5\nARRAYSET");
        let fault = run(&mut m).unwrap();
        assert_eq!(fault.error, RuntimeError::OutOfBounds { index: -1, len: 1 });
        assert_eq!(m.stack().len(), 3);
    }

    #[test]
    fn negative_array_size() {
        let mut m = machine("PUSH -1\nNEWARRAY");
        let fault = run(&mut m).unwrap();
        assert_eq!(fault.error, RuntimeError::InvalidArraySize(-1));
        assert_eq!(m.heap().live_arrays(), 0);
    }

    #[test]
    fn freed_array_use_after_free() {
        for op in ["PUSH 0\nARRAYGET", "PUSH 0\nPUSH 1\nARRAYSET", "ARRAYLEN", "FREEARR"] {
            let source = format!("PUSH 2\nNEWARRAY\nSTORE a\nLOAD a\nFREEARR\nLOAD a\n{op}");
            let mut m = machine(&source);
            let fault = run(&mut m).unwrap();
            assert!(matches!(fault.error, RuntimeError::UseAfterFree(_)), "{op}: {fault}");
        }
    }

    #[test]
    fn array_op_on_string_is_type_mismatch() {
        let mut m = machine("NEWSTR \"s\"\nARRAYLEN");
        let fault = run(&mut m).unwrap();
        assert!(matches!(fault.error, RuntimeError::TypeMismatch { expected: "array", .. }));
    }

    #[test]
    fn strcat_then_strlen() {
        let mut m = machine("NEWSTR \"Hello, \"\nNEWSTR \"World!\"\nSTRCAT\nSTRLEN");
        assert!(run(&mut m).is_none());
        assert_eq!(top(&m), Value::Number(13));
        assert_eq!(m.heap().live_strings(), 3);
    }

    #[test]
    fn freed_string_use_after_free() {
        let mut m = machine("NEWSTR \"a\"\nDUP\nFREESTR\nSTRLEN");
        let fault = run(&mut m).unwrap();
        assert!(matches!(fault.error, RuntimeError::UseAfterFree(_)));
        assert_eq!(fault.pc, 3);
    }

    #[test]
    fn print_number_string_and_chars() {
        let mut m = machine(
            "PUSH 15\nPRINT\nNEWSTR \"hi\"\nPRINT\nPUSH 72\nPRINTCHAR\nPUSH 73\nPRINTCHAR\nPRINTSTR \"!\\n\"\nHALT",
        );
        assert!(run(&mut m).is_none());
        assert_eq!(m.output().lines(), vec!["15", "hi", "HI!"]);
    }

    #[test]
    fn print_array_is_type_mismatch() {
        let mut m = machine("PUSH 1\nNEWARRAY\nPRINT");
        let fault = run(&mut m).unwrap();
        assert!(matches!(fault.error, RuntimeError::TypeMismatch { .. }));
        assert!(m.output().is_empty());
    }

    #[test]
    fn printchar_rejects_invalid_code_points() {
        let mut m = machine("PUSH 55296\nPRINTCHAR");
        let fault = run(&mut m).unwrap();
        assert_eq!(fault.error, RuntimeError::InvalidCharacter(55296));
    }

    #[test]
    fn counting_loop() {
        let mut m = machine(
            "PUSH 1\nSTORE i\nloop:\nLOAD i\nDUP\nPRINT\nPUSH 1\nADD\nDUP\nSTORE i\nPUSH 5\nLE\nJMPNZ loop\nHALT",
        );
        assert!(run(&mut m).is_none());
        assert_eq!(m.output().lines(), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn jmpz_falls_through_on_nonzero() {
        let mut m = machine("PUSH 1\nJMPZ skip\nPUSH 10\nskip:\nHALT");
        run(&mut m);
        assert_eq!(top(&m), Value::Number(10));
    }

    #[test]
    fn halt_keeps_pc_and_blocks_further_steps() {
        let mut m = machine("PUSH 1\nHALT\nPUSH 2");
        run(&mut m);
        assert_eq!(m.pc(), 1);
        for _ in 0..3 {
            let fault = m.step().unwrap_err();
            assert_eq!(fault.error, RuntimeError::ProgramComplete);
            assert_eq!(m.stack().len(), 1);
        }
    }

    #[test]
    fn running_off_the_end_completes() {
        let mut m = machine("PUSH 1");
        m.step().unwrap();
        assert!(m.is_finished());
        let fault = m.step().unwrap_err();
        assert_eq!(fault.error, RuntimeError::ProgramComplete);
        assert_eq!(fault.instruction, None);
    }

    #[test]
    fn empty_program_is_immediately_complete() {
        let mut m = Machine::new(Program::default());
        assert!(m.is_finished());
        assert_eq!(m.step().unwrap_err().error, RuntimeError::ProgramComplete);
    }

    #[test]
    fn arithmetic_wraps_instead_of_panicking() {
        let mut m = machine("PUSH 9223372036854775807\nPUSH 1\nADD");
        run(&mut m);
        assert_eq!(top(&m), Value::Number(i64::MIN));
    }

    #[test]
    fn runtime_codes_are_distinct() {
        let errors = [
            RuntimeError::StackUnderflow { opcode: Opcode::Pop, needed: 1, depth: 0 },
            RuntimeError::TypeMismatch { opcode: Opcode::Add, expected: "number", found: "array" },
            RuntimeError::DivisionByZero,
            RuntimeError::OutOfBounds { index: 0, len: 0 },
            RuntimeError::UseAfterFree(String::new()),
            RuntimeError::InvalidHandle(String::new()),
            RuntimeError::UnknownVariable(String::new()),
            RuntimeError::ProgramComplete,
            RuntimeError::InvalidArraySize(-1),
            RuntimeError::InvalidCharacter(-1),
        ];
        let codes: std::collections::BTreeSet<_> = errors.iter().map(RuntimeError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }
}
