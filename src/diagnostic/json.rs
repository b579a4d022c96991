use super::{Diagnostic, Severity};

pub fn to_value(d: &Diagnostic) -> serde_json::Value {
    let severity = match d.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };

    let labels: Vec<serde_json::Value> = d.labels.iter().map(|l| {
        serde_json::json!({
            "line": l.span.line,
            "start": l.span.start,
            "end": l.span.end,
            "message": l.message,
            "primary": l.is_primary,
        })
    }).collect();

    let mut obj = serde_json::json!({
        "severity": severity,
        "message": d.message,
        "labels": labels,
        "notes": d.notes,
    });

    if let Some(code) = d.code {
        obj["code"] = serde_json::Value::String(code.to_string());
    }

    if let Some(s) = &d.suggestion {
        obj["suggestion"] = serde_json::Value::String(s.clone());
    }

    obj
}

pub fn render(d: &Diagnostic) -> String {
    serde_json::to_string(&to_value(d)).unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Span;

    fn parse_json(s: &str) -> serde_json::Value {
        serde_json::from_str(s).expect("valid JSON")
    }

    #[test]
    fn render_basic_error() {
        let v = parse_json(&render(&Diagnostic::error("stack underflow")));
        assert_eq!(v["severity"], "error");
        assert_eq!(v["message"], "stack underflow");
        assert!(v["labels"].as_array().unwrap().is_empty());
        assert!(v.get("code").is_none());
    }

    #[test]
    fn render_code_and_span() {
        let d = Diagnostic::error("unknown opcode 'OVER'")
            .with_code("SVM-P001")
            .with_span(Span { line: 4, start: 2, end: 6 }, "not an instruction");
        let v = parse_json(&render(&d));
        assert_eq!(v["code"], "SVM-P001");
        let label = &v["labels"][0];
        assert_eq!(label["line"], 4);
        assert_eq!(label["start"], 2);
        assert_eq!(label["end"], 6);
        assert_eq!(label["primary"], true);
    }

    #[test]
    fn render_notes_and_suggestion() {
        let d = Diagnostic::error("bad")
            .with_note("first")
            .with_note("second")
            .with_suggestion("try this instead");
        let v = parse_json(&render(&d));
        assert_eq!(v["notes"].as_array().unwrap().len(), 2);
        assert_eq!(v["suggestion"], "try this instead");
    }

    #[test]
    fn render_secondary_label() {
        let d = Diagnostic::error("label 'a' is already defined on line 1")
            .with_span(Span { line: 3, start: 0, end: 1 }, "redefined here")
            .with_secondary_span(Span { line: 1, start: 0, end: 1 }, "first defined here");
        let v = parse_json(&render(&d));
        assert_eq!(v["labels"][1]["primary"], false);
    }

    #[test]
    fn render_warning_severity() {
        let v = parse_json(&render(&Diagnostic::warning("unused label")));
        assert_eq!(v["severity"], "warning");
    }
}
