//! Client protocol messages (line-delimited JSON).
//!
//! One JSON object per line: requests in, responses and events out.
//! Line numbering at this boundary: client-facing lines are 0-based,
//! engine-facing lines are 1-based. [`client_line`] and
//! [`engine_line`] are the only translation points.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use smol_str::SmolStr;
use weft_engine::{OutputCategory, SourceLocation};

/// The single logical execution thread every session exposes.
pub const THREAD_ID: u64 = 1;

/// Engine (1-based) line to client (0-based).
pub fn client_line(engine_line: u32) -> u32 {
    engine_line.saturating_sub(1)
}

/// Client (0-based) line to engine (1-based). `None` when the line
/// has no engine-side representation.
pub fn engine_line(client_line: u32) -> Option<u32> {
    client_line.checked_add(1)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub seq: u64,
    pub command: String,
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub request_seq: u64,
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn ok(request: &Request, body: Option<Value>) -> Self {
        Self {
            request_seq: request.seq,
            command: request.command.clone(),
            success: true,
            body,
            message: None,
        }
    }

    pub fn error(request: &Request, message: String) -> Self {
        Self {
            request_seq: request.seq,
            command: request.command.clone(),
            success: false,
            body: None,
            message: Some(message),
        }
    }

    /// Error response for input that never parsed into a request.
    pub fn protocol_error(message: String) -> Self {
        Self {
            request_seq: 0,
            command: String::new(),
            success: false,
            body: None,
            message: Some(message),
        }
    }
}

/// Asynchronous notification to the client.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Event {
    pub fn initialized() -> Self {
        Self {
            event: SmolStr::new("initialized"),
            body: None,
        }
    }

    pub fn stopped(reason: &str) -> Self {
        Self {
            event: SmolStr::new("stopped"),
            body: Some(json!({
                "reason": reason,
                "threadId": THREAD_ID,
            })),
        }
    }

    /// Stop caused by a fatal engine error, carrying the message and,
    /// when known, the failing location.
    pub fn stopped_error(message: &str, location: Option<&SourceLocation>) -> Self {
        let mut body = json!({
            "reason": "error",
            "threadId": THREAD_ID,
            "text": message,
        });
        if let (Some(loc), Some(obj)) = (location, body.as_object_mut()) {
            obj.insert("source".into(), json!(SourceRef::from_path(&loc.path)));
            obj.insert("line".into(), json!(client_line(loc.line)));
        }
        Self {
            event: SmolStr::new("stopped"),
            body: Some(body),
        }
    }

    pub fn output(category: OutputCategory, text: &str, location: Option<&SourceLocation>) -> Self {
        let mut body = json!({
            "category": category.as_str(),
            "output": text,
        });
        if let (Some(loc), Some(obj)) = (location, body.as_object_mut()) {
            obj.insert("source".into(), json!(SourceRef::from_path(&loc.path)));
            obj.insert("line".into(), json!(client_line(loc.line)));
        }
        Self {
            event: SmolStr::new("output"),
            body: Some(body),
        }
    }

    pub fn terminated() -> Self {
        Self {
            event: SmolStr::new("terminated"),
            body: None,
        }
    }
}

/// What the adapter advertises in the initialize response.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub supports_configuration_done_request: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_configuration_done_request: true,
        }
    }
}

/// A source file reference in responses and events.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
}

impl SourceRef {
    pub fn from_path(path: &str) -> Self {
        let name = std::path::Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
        Self {
            name,
            path: path.to_string(),
        }
    }
}

/// Per-breakpoint verification result in the setBreakpoints response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BreakpointInfo {
    pub verified: bool,
    /// Client convention, 0-based.
    pub line: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrameInfo {
    pub id: u64,
    pub name: String,
    pub source: SourceRef,
    /// Client convention, 0-based.
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeInfo {
    pub name: String,
    pub variables_reference: u64,
    pub expensive: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableInfo {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub type_label: String,
    /// Nonzero iff the variable has expandable children.
    pub variables_reference: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadInfo {
    pub id: u64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_conversion_round_trips() {
        assert_eq!(engine_line(0), Some(1));
        assert_eq!(client_line(1), 0);
        assert_eq!(client_line(engine_line(41).unwrap()), 41);
        // 0 has no engine-side counterpart; stay at the first line.
        assert_eq!(client_line(0), 0);
        // u32::MAX has no 1-based counterpart.
        assert_eq!(engine_line(u32::MAX), None);
    }

    #[test]
    fn response_serializes_without_empty_fields() {
        let request = Request {
            seq: 7,
            command: "threads".into(),
            arguments: None,
        };
        let text = serde_json::to_string(&Response::ok(&request, None)).unwrap();
        assert_eq!(
            text,
            r#"{"request_seq":7,"command":"threads","success":true}"#
        );
    }

    #[test]
    fn stopped_error_event_carries_location() {
        let loc = SourceLocation::new("/work/main.xsl", 3, 5);
        let event = Event::stopped_error("bad cast", Some(&loc));
        let body = event.body.unwrap();
        assert_eq!(body["reason"], "error");
        assert_eq!(body["text"], "bad cast");
        assert_eq!(body["line"], 2);
        assert_eq!(body["source"]["name"], "main.xsl");
    }
}
