//! Stderr backend for the `log` facade, installed by the binary.

use std::io::Write;
use std::str::FromStr;

use log::{Level, LevelFilter, Log, Metadata, Record};

pub const ENV_VAR: &str = "STACKVM_LOG";

pub struct StderrLogger {
    use_color: bool,
}

static PLAIN: StderrLogger = StderrLogger { use_color: false };
static COLORED: StderrLogger = StderrLogger { use_color: true };

impl StderrLogger {
    fn tag(&self, level: Level) -> String {
        let name = level.as_str();
        if !self.use_color {
            return name.to_string();
        }
        let code = match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "32",
            Level::Debug | Level::Trace => "2",
        };
        format!("\x1b[{code}m{name}\x1b[0m")
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "[{} {}] {}", self.tag(record.level()), record.target(), record.args());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Parse a level name (`off`, `error`, `warn`, `info`, `debug`, `trace`).
pub fn parse_level(text: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(text.trim()).map_err(|_| {
        format!("unknown log level '{text}' (expected off, error, warn, info, debug or trace)")
    })
}

/// Install the logger once. A second call only adjusts the level.
pub fn init(level: LevelFilter, use_color: bool) {
    let logger = if use_color { &COLORED } else { &PLAIN };
    let _ = log::set_logger(logger);
    log::set_max_level(level);
}
