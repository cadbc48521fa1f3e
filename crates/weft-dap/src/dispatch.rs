//! Request dispatch.
//!
//! Commands map to handler functions through a registry built once
//! per session. Handler failures come back as [`AdapterError`] and
//! turn into error responses at the session boundary.

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use weft_engine::LaunchConfig;

use crate::coordinator;
use crate::error::AdapterError;
use crate::model;
use crate::protocol::{
    client_line, BreakpointInfo, Capabilities, Event, Request, ScopeInfo, SourceRef,
    StackFrameInfo, ThreadInfo, VariableInfo, THREAD_ID,
};
use crate::session::{ExecState, Session};

pub type Handler = fn(&Session, &Request) -> Result<Option<Value>, AdapterError>;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: FxHashMap<&'static str, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a command. Duplicate registration is a
    /// programming error and panics at session construction.
    pub fn register(&mut self, command: &'static str, handler: Handler) {
        if self.handlers.insert(command, handler).is_some() {
            panic!("duplicate handler registered for command '{command}'");
        }
    }

    pub fn get(&self, command: &str) -> Option<Handler> {
        self.handlers.get(command).copied()
    }
}

pub(crate) fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("initialize", handle_initialize);
    registry.register("launch", handle_launch);
    registry.register("setBreakpoints", handle_set_breakpoints);
    registry.register("configurationDone", handle_configuration_done);
    registry.register("threads", handle_threads);
    registry.register("stackTrace", handle_stack_trace);
    registry.register("scopes", handle_scopes);
    registry.register("variables", handle_variables);
    registry.register("continue", handle_continue);
    registry.register("disconnect", handle_disconnect);
    registry
}

fn parse_args<T: DeserializeOwned>(request: &Request) -> Result<T, AdapterError> {
    let arguments = request
        .arguments
        .clone()
        .ok_or_else(|| AdapterError::InvalidArguments("missing arguments".into()))?;
    serde_json::from_value(arguments).map_err(|err| AdapterError::InvalidArguments(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct LaunchArgs {
    program: PathBuf,
    #[serde(default)]
    input: Option<PathBuf>,
    #[serde(default)]
    output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct SourceArg {
    path: String,
}

#[derive(Debug, Deserialize)]
struct SourceBreakpointArg {
    line: u32,
}

#[derive(Debug, Deserialize)]
struct SetBreakpointsArgs {
    source: SourceArg,
    #[serde(default)]
    breakpoints: Vec<SourceBreakpointArg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScopesArgs {
    frame_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariablesArgs {
    variables_reference: u64,
}

fn handle_initialize(session: &Session, _request: &Request) -> Result<Option<Value>, AdapterError> {
    session.send_event(Event::initialized());
    Ok(Some(json!(Capabilities::default())))
}

fn handle_launch(session: &Session, request: &Request) -> Result<Option<Value>, AdapterError> {
    let args: LaunchArgs = parse_args(request)?;
    let config = LaunchConfig {
        program: args.program,
        input: args.input,
        output: args.output,
    };
    let engine = session.factory.prepare(&config)?;
    info!(program = %config.program.display(), "engine run prepared");
    let mut state = session.lock()?;
    state.prepared = Some(engine);
    Ok(None)
}

fn handle_set_breakpoints(
    session: &Session,
    request: &Request,
) -> Result<Option<Value>, AdapterError> {
    let args: SetBreakpointsArgs = parse_args(request)?;
    let lines: Vec<u32> = args.breakpoints.iter().map(|bp| bp.line).collect();
    let mut state = session.lock()?;
    let canonical = state.breakpoints.replace(&args.source.path, &lines)?;
    debug!(path = %args.source.path, count = canonical.len(), "breakpoints replaced");
    let verified: Vec<BreakpointInfo> = canonical
        .iter()
        .map(|line| BreakpointInfo {
            verified: true,
            line: client_line(*line),
        })
        .collect();
    Ok(Some(json!({ "breakpoints": verified })))
}

fn handle_configuration_done(
    session: &Session,
    _request: &Request,
) -> Result<Option<Value>, AdapterError> {
    coordinator::start(session)?;
    Ok(None)
}

fn handle_threads(_session: &Session, _request: &Request) -> Result<Option<Value>, AdapterError> {
    let threads = vec![ThreadInfo {
        id: THREAD_ID,
        name: "main".into(),
    }];
    Ok(Some(json!({ "threads": threads })))
}

fn handle_stack_trace(session: &Session, _request: &Request) -> Result<Option<Value>, AdapterError> {
    let mut guard = session.lock()?;
    if guard.exec != ExecState::Paused {
        return Err(AdapterError::NotPaused);
    }
    let state = &mut *guard;
    let stack_len = state.stack.len();
    model::ensure_frame_refs(&mut state.pool, &mut state.frame_refs, stack_len);

    // Innermost frame first.
    let frames: Vec<StackFrameInfo> = state
        .stack
        .iter()
        .enumerate()
        .rev()
        .map(|(index, frame)| StackFrameInfo {
            id: state.frame_refs[index],
            name: frame.label(),
            source: SourceRef::from_path(&frame.location.path),
            line: client_line(frame.location.line),
            column: frame.location.column,
        })
        .collect();
    Ok(Some(json!({
        "stackFrames": frames,
        "totalFrames": frames.len(),
    })))
}

fn handle_scopes(session: &Session, request: &Request) -> Result<Option<Value>, AdapterError> {
    let args: ScopesArgs = parse_args(request)?;
    let state = session.lock()?;
    match state.pool.get(args.frame_id) {
        Some(crate::model::PoolEntry::FrameScope(_)) => {}
        _ => return Err(AdapterError::UnknownFrame(args.frame_id)),
    }
    let scopes = vec![ScopeInfo {
        name: "Locals".into(),
        variables_reference: args.frame_id,
        expensive: false,
    }];
    Ok(Some(json!({ "scopes": scopes })))
}

fn handle_variables(session: &Session, request: &Request) -> Result<Option<Value>, AdapterError> {
    let args: VariablesArgs = parse_args(request)?;
    let mut guard = session.lock()?;
    let state = &mut *guard;
    let variables: Vec<VariableInfo> = model::resolve_variables(
        &mut state.pool,
        &mut state.children_memo,
        &state.stack,
        args.variables_reference,
    );
    debug!(
        reference = args.variables_reference,
        count = variables.len(),
        "variables resolved"
    );
    Ok(Some(json!({ "variables": variables })))
}

fn handle_continue(session: &Session, _request: &Request) -> Result<Option<Value>, AdapterError> {
    coordinator::resume(&session.shared)?;
    Ok(Some(json!({ "allThreadsContinued": true })))
}

fn handle_disconnect(session: &Session, _request: &Request) -> Result<Option<Value>, AdapterError> {
    coordinator::stop(&session.shared);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_session: &Session, _request: &Request) -> Result<Option<Value>, AdapterError> {
        Ok(None)
    }

    #[test]
    fn registry_resolves_registered_commands() {
        let mut registry = HandlerRegistry::new();
        registry.register("ping", noop);
        assert!(registry.get("ping").is_some());
        assert!(registry.get("pong").is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate handler registered for command 'ping'")]
    fn duplicate_registration_panics() {
        let mut registry = HandlerRegistry::new();
        registry.register("ping", noop);
        registry.register("ping", noop);
    }

    #[test]
    fn default_registry_covers_the_protocol_surface() {
        let registry = default_registry();
        for command in [
            "initialize",
            "launch",
            "setBreakpoints",
            "configurationDone",
            "threads",
            "stackTrace",
            "scopes",
            "variables",
            "continue",
            "disconnect",
        ] {
            assert!(registry.get(command).is_some(), "missing {command}");
        }
    }

    #[test]
    fn parse_args_reports_missing_and_malformed_arguments() {
        let missing = Request {
            seq: 1,
            command: "scopes".into(),
            arguments: None,
        };
        assert!(matches!(
            parse_args::<ScopesArgs>(&missing),
            Err(AdapterError::InvalidArguments(_))
        ));

        let malformed = Request {
            seq: 2,
            command: "scopes".into(),
            arguments: Some(json!({"frameId": "not-a-number"})),
        };
        assert!(matches!(
            parse_args::<ScopesArgs>(&malformed),
            Err(AdapterError::InvalidArguments(_))
        ));
    }
}
