use super::{Diagnostic, Severity};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_yellow(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;33m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[SVM-P005]: message"
        let (severity, paint): (&str, fn(&Self, &str) -> String) = match d.severity {
            Severity::Error => ("error", Self::bold_red),
            Severity::Warning => ("warning", Self::bold_yellow),
        };
        let head = match d.code {
            Some(code) => format!("{severity}[{code}]"),
            None => severity.to_string(),
        };
        out.push_str(&format!("{}: {}\n", paint(self, &head), self.bold(&d.message)));

        let primary = d.labels.iter().find(|l| l.is_primary);
        let line_text = match (primary, &d.source) {
            (Some(label), Some(source)) if label.span.line > 0 => {
                source.lines().nth(label.span.line - 1).map(|text| (label, text))
            }
            _ => None,
        };

        if let Some((label, text)) = line_text {
            let line = label.span.line;
            // "  --> line:col"
            out.push_str(&format!("  {} {}:{}\n", self.cyan("-->"), line, label.span.start + 1));

            let gutter = line.to_string().len();
            let pipe = self.cyan("|");
            let pad = " ".repeat(gutter);

            out.push_str(&format!("{pad} {pipe}\n"));
            let line_num = self.cyan(&format!("{line:>gutter$}"));
            out.push_str(&format!("{line_num} {pipe} {text}\n"));

            // A zero-width span marks the whole line.
            let (start, len) = if label.span.end > label.span.start {
                (label.span.start, label.span.end - label.span.start)
            } else {
                let indent = text.len() - text.trim_start().len();
                (indent, text.trim().len().max(1))
            };
            let carets = paint(self, &"^".repeat(len));
            let indent = " ".repeat(start);
            if label.message.is_empty() {
                out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
            } else {
                out.push_str(&format!("{pad} {pipe} {indent}{carets} {}\n", paint(self, &label.message)));
            }
            out.push_str(&format!("{pad} {pipe}\n"));
        } else if let Some(label) = primary {
            if label.span.line > 0 {
                out.push_str(&format!("  {} line {}: {}\n", self.cyan("-->"), label.span.line, label.message));
            }
        }

        for label in d.labels.iter().filter(|l| !l.is_primary) {
            if !label.message.is_empty() {
                out.push_str(&format!("  {} line {}: {}\n", self.dim("="), label.span.line, label.message));
            }
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }

        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }

        out
    }
}
