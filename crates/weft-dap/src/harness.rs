//! In-process test harness.
//!
//! Drives a [`Session`] against a [`ScriptedFactory`] without any
//! transport, collecting events from the session's channel. Lives in
//! the library so integration tests and downstream engine crates can
//! exercise the adapter the same way.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::Arc;
use weft_engine::{ScriptAction, ScriptedFactory};

use crate::protocol::{Event, Request, Response};
use crate::session::Session;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestHarness {
    session: Session,
    events: Receiver<Event>,
    buffered: VecDeque<Event>,
    next_seq: u64,
}

impl TestHarness {
    /// Harness over an engine that replays `script` on every launch.
    pub fn with_script(script: Vec<ScriptAction>) -> Self {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let session = Session::new(Arc::new(ScriptedFactory::new(script)), event_tx);
        Self {
            session,
            events: event_rx,
            buffered: VecDeque::new(),
            next_seq: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send one request; `Value::Null` means no arguments.
    pub fn request(&mut self, command: &str, arguments: Value) -> Response {
        self.next_seq += 1;
        let request = Request {
            seq: self.next_seq,
            command: command.into(),
            arguments: if arguments.is_null() {
                None
            } else {
                Some(arguments)
            },
        };
        self.session.handle_request(&request)
    }

    /// Send one request and assert it succeeded, returning the body.
    pub fn request_ok(&mut self, command: &str, arguments: Value) -> Value {
        let response = self.request(command, arguments);
        assert!(
            response.success,
            "request {command} failed: {:?}",
            response.message
        );
        response.body.unwrap_or(Value::Null)
    }

    /// Standard preamble through `configurationDone`: initialize,
    /// launch, then one setBreakpoints per distinct path. Breakpoint
    /// lines use the client (0-based) convention.
    pub fn start_run(&mut self, breakpoints: &[(&str, u32)]) {
        self.request_ok("initialize", json!({}));
        self.request_ok("launch", json!({ "program": "main.xsl" }));
        let mut by_path: IndexMap<&str, Vec<u32>> = IndexMap::new();
        for (path, line) in breakpoints {
            by_path.entry(*path).or_default().push(*line);
        }
        for (path, lines) in by_path {
            let entries: Vec<Value> = lines.iter().map(|line| json!({ "line": line })).collect();
            self.request_ok(
                "setBreakpoints",
                json!({ "source": { "path": path }, "breakpoints": entries }),
            );
        }
        self.request_ok("configurationDone", Value::Null);
    }

    /// Wait for the named event, buffering any others that arrive
    /// first. Panics after five seconds.
    pub fn wait_for_event(&mut self, name: &str) -> Event {
        if let Some(position) = self.buffered.iter().position(|event| event.event == name) {
            if let Some(event) = self.buffered.remove(position) {
                return event;
            }
        }
        let deadline = Instant::now() + EVENT_TIMEOUT;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.events.recv_timeout(deadline - now) {
                Ok(event) if event.event == name => return event,
                Ok(event) => self.buffered.push_back(event),
                Err(_) => break,
            }
        }
        panic!(
            "timed out waiting for event '{name}'; buffered: {:?}",
            self.buffered
        );
    }

    /// Assert the named event does not arrive within `within`. Other
    /// events are buffered as usual.
    pub fn expect_no_event(&mut self, name: &str, within: Duration) {
        assert!(
            !self.buffered.iter().any(|event| event.event == name),
            "unexpected buffered event '{name}'"
        );
        let deadline = Instant::now() + within;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            match self.events.recv_timeout(deadline - now) {
                Ok(event) if event.event == name => {
                    panic!("unexpected event '{name}': {event:?}")
                }
                Ok(event) => self.buffered.push_back(event),
                Err(_) => return,
            }
        }
    }
}
