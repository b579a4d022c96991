pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// How diagnostics are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticFormat {
    Ansi,
    Text,
    Json,
}

impl DiagnosticFormat {
    /// Explicit flags win (json over text over ansi); otherwise ANSI on a terminal.
    pub fn resolve(json: bool, text: bool, ansi: bool) -> Self {
        if json {
            DiagnosticFormat::Json
        } else if text {
            DiagnosticFormat::Text
        } else if ansi || stderr_is_tty() {
            DiagnosticFormat::Ansi
        } else {
            DiagnosticFormat::Text
        }
    }

    pub fn render(self, d: &crate::diagnostic::Diagnostic) -> String {
        match self {
            DiagnosticFormat::Json => crate::diagnostic::json::render(d),
            DiagnosticFormat::Ansi => crate::diagnostic::ansi::AnsiRenderer { use_color: true }.render(d),
            DiagnosticFormat::Text => crate::diagnostic::ansi::AnsiRenderer { use_color: false }.render(d),
        }
    }
}

pub fn stderr_is_tty() -> bool {
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(libc::STDERR_FILENO) == 1 }
}

/// Settings for `stackvm run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub max_steps: u64,
    /// Emit a snapshot as a JSON line after every step.
    pub trace: bool,
    /// Print the final snapshot as JSON.
    pub snapshot: bool,
    pub format: DiagnosticFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_steps: DEFAULT_MAX_STEPS,
            trace: false,
            snapshot: false,
            format: DiagnosticFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;

    #[test]
    fn explicit_flags_take_priority() {
        assert_eq!(DiagnosticFormat::resolve(true, true, true), DiagnosticFormat::Json);
        assert_eq!(DiagnosticFormat::resolve(false, true, true), DiagnosticFormat::Text);
        assert_eq!(DiagnosticFormat::resolve(false, false, true), DiagnosticFormat::Ansi);
    }

    #[test]
    fn render_dispatches_on_format() {
        let d = Diagnostic::error("division by zero").with_code("SVM-R003");
        assert!(DiagnosticFormat::Json.render(&d).starts_with('{'));
        assert!(DiagnosticFormat::Text.render(&d).starts_with("error[SVM-R003]"));
        assert!(DiagnosticFormat::Ansi.render(&d).contains("\x1b["));
    }

    #[test]
    fn defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_steps, 1_000_000);
        assert!(!config.trace);
        assert_eq!(config.format, DiagnosticFormat::Text);
    }
}
