//! Per-connection debug session.
//!
//! All mutable session state sits behind one lock. The control thread
//! (request dispatch) and the engine thread (trace callbacks) are the
//! only writers; sessions of different connections share nothing.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crossbeam_channel::Sender;
use tracing::{debug, warn};
use weft_engine::{Engine, EngineFactory};

use crate::breakpoints::BreakpointTable;
use crate::coordinator;
use crate::dispatch::{self, HandlerRegistry};
use crate::error::AdapterError;
use crate::model::{ChildrenMemo, Frame, VariablePool};
use crate::protocol::{Event, Request, Response};

/// Coordinator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    /// No run started yet.
    Idle,
    Running,
    Paused,
    Terminated,
}

pub struct SessionState {
    pub exec: ExecState,
    pub stack: Vec<Frame>,
    pub breakpoints: BreakpointTable,
    pub pool: VariablePool,
    pub children_memo: ChildrenMemo,
    /// Pooled frame scope id per stack index, valid for one pause.
    pub frame_refs: Vec<u64>,
    /// Cooperative cancellation flag, observed at engine checkpoints.
    pub(crate) cancel: bool,
    pub(crate) prepared: Option<Box<dyn Engine>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            exec: ExecState::Idle,
            stack: Vec::new(),
            breakpoints: BreakpointTable::new(),
            pool: VariablePool::new(),
            children_memo: ChildrenMemo::default(),
            frame_refs: Vec::new(),
            cancel: false,
            prepared: None,
        }
    }
}

pub(crate) struct SessionShared {
    pub state: Mutex<SessionState>,
    /// Signalled by resume and stop; the engine thread waits on it
    /// while paused.
    pub resumed: Condvar,
    pub events: Sender<Event>,
}

/// One debug session, created per client connection and destroyed on
/// disconnect. Exactly one engine run is active per session at a
/// time.
pub struct Session {
    pub(crate) shared: Arc<SessionShared>,
    pub(crate) factory: Arc<dyn EngineFactory>,
    registry: HandlerRegistry,
}

impl Session {
    pub fn new(factory: Arc<dyn EngineFactory>, events: Sender<Event>) -> Self {
        let shared = Arc::new(SessionShared {
            state: Mutex::new(SessionState::new()),
            resumed: Condvar::new(),
            events,
        });
        Self {
            shared,
            factory,
            registry: dispatch::default_registry(),
        }
    }

    /// Handle one client request synchronously. Failures become error
    /// responses; the session stays open.
    pub fn handle_request(&self, request: &Request) -> Response {
        debug!(command = %request.command, seq = request.seq, "dispatching request");
        match self.registry.get(&request.command) {
            Some(handler) => match handler(self, request) {
                Ok(body) => Response::ok(request, body),
                Err(err) => {
                    warn!(command = %request.command, error = %err, "request failed");
                    Response::error(request, err.to_string())
                }
            },
            None => Response::error(
                request,
                AdapterError::UnrecognizedRequest(request.command.clone()).to_string(),
            ),
        }
    }

    /// Cancel any active run; called when the connection goes away
    /// without a disconnect request.
    pub fn shutdown(&self) {
        coordinator::stop(&self.shared);
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, SessionState>, AdapterError> {
        self.shared
            .state
            .lock()
            .map_err(|_| AdapterError::StateUnavailable)
    }

    pub(crate) fn send_event(&self, event: Event) {
        let _ = self.shared.events.send(event);
    }
}
