//! A single-step stack machine for a small line-oriented assembly language.
//!
//! Text is assembled into a [`program::Program`], installed in a
//! [`session::Session`] and executed one instruction per `step`, each step
//! either fully applied or rejected with the state untouched.

pub mod assembler;
pub mod config;
pub mod diagnostic;
pub mod driver;
pub mod heap;
pub mod lexer;
pub mod logging;
pub mod program;
pub mod protocol;
pub mod session;
pub mod vm;

pub use assembler::{ParseError, assemble};
pub use session::{Session, SessionError, SharedSession, Snapshot};
