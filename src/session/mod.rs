use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::assembler::{self, ParseError};
use crate::program::Program;
use crate::vm::{Fault, Machine};

/// Serializable projection of the machine, the one shape every operation returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub stack: Vec<i64>,
    pub memory: BTreeMap<String, i64>,
    pub program_counter: usize,
    pub instructions: Vec<String>,
    pub output: Vec<String>,
    #[serde(default)]
    pub halted: bool,
}

impl Snapshot {
    fn of(machine: &Machine) -> Self {
        Snapshot {
            stack: machine.stack().iter().map(|v| v.to_wire()).collect(),
            memory: machine.memory().iter().map(|(k, v)| (k.clone(), v.to_wire())).collect(),
            program_counter: machine.pc(),
            instructions: machine.program().listing(),
            output: machine.output().lines(),
            halted: machine.is_finished(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] Fault),
    #[error("no program loaded")]
    NoProgram,
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Parse(e) => e.code(),
            SessionError::Runtime(f) => f.code(),
            SessionError::NoProgram => "SVM-S001",
        }
    }
}

/// Holds at most one loaded program and its execution state.
#[derive(Debug, Default)]
pub struct Session {
    machine: Option<Machine>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// Assemble and install `code`. A rejected program leaves the current one in place.
    pub fn load(&mut self, code: &str) -> Result<Snapshot, SessionError> {
        let program = assembler::assemble(code).inspect_err(|e| {
            log::warn!(target: "stackvm::session", "load rejected: {e}");
        })?;
        Ok(self.install(program))
    }

    /// Install an already assembled program.
    pub fn install(&mut self, program: Program) -> Snapshot {
        log::info!(
            target: "stackvm::session",
            "loaded {} instruction(s), {} label(s)",
            program.len(),
            program.labels.len()
        );
        let machine = Machine::new(program);
        let snapshot = Snapshot::of(&machine);
        self.machine = Some(machine);
        snapshot
    }

    pub fn step(&mut self) -> Result<Snapshot, SessionError> {
        self.advance()?;
        Ok(self.get_state())
    }

    /// `step` without building a snapshot.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        let machine = self.machine.as_mut().ok_or(SessionError::NoProgram)?;
        machine.step().inspect_err(|f| {
            log::warn!(target: "stackvm::session", "step faulted: {f}");
        })?;
        Ok(())
    }

    pub fn reset(&mut self) -> Snapshot {
        if self.machine.take().is_some() {
            log::info!(target: "stackvm::session", "session reset");
        }
        Snapshot::default()
    }

    pub fn get_state(&self) -> Snapshot {
        self.machine.as_ref().map(Snapshot::of).unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.machine.is_some()
    }

    pub fn machine(&self) -> Option<&Machine> {
        self.machine.as_ref()
    }
}

/// A `Session` behind one lock, for hosts with concurrent callers.
/// Every operation holds the lock for its whole duration.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new() -> Self {
        SharedSession::default()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // Operations are atomic, so a panicked holder cannot leave a half-applied step.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn load(&self, code: &str) -> Result<Snapshot, SessionError> {
        self.lock().load(code)
    }

    pub fn step(&self) -> Result<Snapshot, SessionError> {
        self.lock().step()
    }

    pub fn reset(&self) -> Snapshot {
        self.lock().reset()
    }

    pub fn get_state(&self) -> Snapshot {
        self.lock().get_state()
    }
}
