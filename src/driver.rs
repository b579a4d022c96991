//! Run-to-completion by repeated `step`. The engine itself only ever single-steps.

use crate::config::RunConfig;
use crate::session::{Session, SessionError, Snapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `HALT` ran or the program counter ran off the end.
    Halted,
    Faulted(SessionError),
    StepLimit(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub steps: u64,
    pub outcome: Outcome,
    /// State after the last successful step.
    pub snapshot: Snapshot,
}

/// Step the loaded program until it finishes, faults, or hits `config.max_steps`.
/// With `config.trace` set, `on_step` sees the snapshot after every step.
pub fn run(session: &mut Session, config: &RunConfig, mut on_step: impl FnMut(&Snapshot)) -> RunReport {
    let mut steps = 0;
    let outcome = loop {
        match session.machine() {
            None => break Outcome::Faulted(SessionError::NoProgram),
            Some(m) if m.is_finished() => break Outcome::Halted,
            Some(_) => {}
        }
        if steps >= config.max_steps {
            log::warn!(target: "stackvm::driver", "step limit {} reached", config.max_steps);
            break Outcome::StepLimit(config.max_steps);
        }
        if let Err(e) = session.advance() {
            break Outcome::Faulted(e);
        }
        steps += 1;
        if config.trace {
            on_step(&session.get_state());
        }
    };
    log::info!(target: "stackvm::driver", "stopped after {steps} step(s): {outcome:?}");
    RunReport { steps, outcome, snapshot: session.get_state() }
}
