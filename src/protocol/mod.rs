//! JSON-lines front end: one request object per input line, one response per output line.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionError, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Load { code: String },
    Step,
    Reset,
    GetState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Ok { ok: bool, state: Snapshot },
    Err { ok: bool, error: ErrorBody },
}

impl Response {
    pub fn ok(state: Snapshot) -> Self {
        Response::Ok { ok: true, state }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>, line: Option<usize>) -> Self {
        Response::Err {
            ok: false,
            error: ErrorBody { code: code.into(), message: message.into(), line },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }
}

impl From<SessionError> for Response {
    fn from(e: SessionError) -> Self {
        let line = match &e {
            SessionError::Parse(p) => Some(p.line),
            SessionError::Runtime(f) => f.line,
            SessionError::NoProgram => None,
        };
        Response::error(e.code(), e.to_string(), line)
    }
}

pub fn handle(session: &mut Session, request: Request) -> Response {
    log::debug!(target: "stackvm::protocol", "request {request:?}");
    let result = match request {
        Request::Load { code } => session.load(&code),
        Request::Step => session.step(),
        Request::Reset => Ok(session.reset()),
        Request::GetState => Ok(session.get_state()),
    };
    match result {
        Ok(state) => Response::ok(state),
        Err(e) => e.into(),
    }
}

/// Decode one line and answer it. Malformed input gets an error response, not an `Err`.
pub fn handle_line(session: &mut Session, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle(session, request),
        Err(e) => {
            log::warn!(target: "stackvm::protocol", "malformed request: {e}");
            Response::error("SVM-S002", format!("malformed request: {e}"), None)
        }
    }
}

/// Serve requests until `reader` is exhausted. Blank lines are ignored; a line that
/// is not UTF-8 is answered like any other malformed request.
pub fn serve<R: BufRead, W: Write>(session: &mut Session, mut reader: R, mut writer: W) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle_line(session, line.trim_end_matches(['\n', '\r'])),
            Err(e) => {
                log::warn!(target: "stackvm::protocol", "malformed request: {e}");
                Response::error("SVM-S002", "malformed request: line is not valid UTF-8", None)
            }
        };
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn exchange(input: &str) -> Vec<Value> {
        exchange_bytes(input.as_bytes())
    }

    fn exchange_bytes(input: &[u8]) -> Vec<Value> {
        let mut session = Session::new();
        let mut out = Vec::new();
        serve(&mut session, input, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn request_shapes() {
        let load: Request = serde_json::from_str(r#"{"op":"load","code":"HALT"}"#).unwrap();
        assert_eq!(load, Request::Load { code: "HALT".into() });
        let state: Request = serde_json::from_str(r#"{"op":"get_state"}"#).unwrap();
        assert_eq!(state, Request::GetState);
    }

    #[test]
    fn load_step_get_state() {
        let replies = exchange(concat!(
            r#"{"op":"load","code":"PUSH 5\nPUSH 3\nSUB"}"#, "\n",
            r#"{"op":"step"}"#, "\n",
            r#"{"op":"step"}"#, "\n",
            r#"{"op":"step"}"#, "\n",
            r#"{"op":"get_state"}"#, "\n",
        ));
        assert_eq!(replies.len(), 5);
        assert_eq!(replies[0]["ok"], true);
        assert_eq!(replies[0]["state"]["instructions"], json!(["PUSH 5", "PUSH 3", "SUB"]));
        assert_eq!(replies[4]["state"]["stack"], json!([2]));
        assert_eq!(replies[4]["state"]["program_counter"], 3);
    }

    #[test]
    fn errors_are_out_of_band() {
        let replies = exchange(concat!(
            r#"{"op":"step"}"#, "\n",
            r#"{"op":"load","code":"PUSH 1\nJMP missing_label"}"#, "\n",
        ));
        assert_eq!(replies[0], json!({"ok": false, "error": {"code": "SVM-S001", "message": "no program loaded"}}));
        assert_eq!(replies[1]["ok"], false);
        assert_eq!(replies[1]["error"]["code"], "SVM-P005");
        assert_eq!(replies[1]["error"]["line"], 2);
        assert!(replies[1].get("state").is_none());
    }

    #[test]
    fn malformed_line_does_not_stop_the_loop() {
        let replies = exchange("not json\n{\"op\":\"fly\"}\n\n{\"op\":\"reset\"}\n");
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["error"]["code"], "SVM-S002");
        assert_eq!(replies[1]["error"]["code"], "SVM-S002");
        assert_eq!(replies[2]["ok"], true);
        assert_eq!(replies[2]["state"]["instructions"], json!([]));
    }

    #[test]
    fn non_utf8_line_gets_an_error_reply() {
        let mut input = b"{\"op\":\"load\",\"code\":\"PUSH 1\"}\n".to_vec();
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(b"{\"op\":\"get_state\"}\r\n");
        let replies = exchange_bytes(&input);
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[1]["ok"], false);
        assert_eq!(replies[1]["error"]["code"], "SVM-S002");
        assert_eq!(replies[2]["state"]["instructions"], json!(["PUSH 1"]));
    }

    #[test]
    fn runtime_fault_carries_line() {
        let mut session = Session::new();
        handle(&mut session, Request::Load { code: "// div\nPUSH 1\nPUSH 0\nDIV".into() });
        handle(&mut session, Request::Step);
        handle(&mut session, Request::Step);
        let response = handle(&mut session, Request::Step);
        assert!(!response.is_ok());
        let Response::Err { error, .. } = response else { unreachable!() };
        assert_eq!(error.code, "SVM-R003");
        assert_eq!(error.line, Some(4));
    }
}
