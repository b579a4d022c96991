/// Line-structured capture of everything a program prints.
///
/// `PRINT` closes the current line; `PRINTCHAR` and `PRINTSTR` append to it and a
/// newline inside appended text closes it too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    lines: Vec<String>,
    pending: String,
}

impl Output {
    pub fn print_line(&mut self, text: &str) {
        self.pending.push_str(text);
        self.lines.push(std::mem::take(&mut self.pending));
    }

    pub fn push_char(&mut self, c: char) {
        if c == '\n' {
            self.lines.push(std::mem::take(&mut self.pending));
        } else {
            self.pending.push(c);
        }
    }

    pub fn push_text(&mut self, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.pending.push_str(first);
        }
        for part in parts {
            self.lines.push(std::mem::take(&mut self.pending));
            self.pending.push_str(part);
        }
    }

    /// Completed lines, then the unterminated tail if it has any text.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = self.lines.clone();
        if !self.pending.is_empty() {
            lines.push(self.pending.clone());
        }
        lines
    }

    /// The raw transcript, newlines included.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.pending);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.pending.is_empty()
    }
}
