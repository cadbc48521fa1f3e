//! Execution coordination.
//!
//! The engine runs on its own thread and reports steps through
//! [`Tracer`]. Pausing works by blocking the engine thread inside
//! `on_enter` on the session condvar; the control thread wakes it via
//! [`resume`] or [`stop`]. A stopped event is sent before the engine
//! thread parks, so the client always learns about a pause that is
//! already in effect.

use std::sync::Arc;
use std::thread;

use tracing::{debug, info};
use weft_engine::{
    EngineError, OutputCategory, SourceLocation, StepEvent, TraceDirective, TraceHook,
};

use crate::error::AdapterError;
use crate::model::Frame;
use crate::protocol::Event;
use crate::session::{ExecState, Session, SessionShared};

/// Start the prepared engine on a worker thread. A second call while
/// a run is active or finished is a no-op.
pub(crate) fn start(session: &Session) -> Result<(), AdapterError> {
    let engine = {
        let mut state = session.lock()?;
        if state.exec != ExecState::Idle {
            return Ok(());
        }
        let engine = state.prepared.take().ok_or(AdapterError::NotLaunched)?;
        state.exec = ExecState::Running;
        engine
    };

    info!("starting engine run");
    let shared = Arc::clone(&session.shared);
    let spawned = thread::Builder::new().name("weft-engine".into()).spawn({
        let shared = Arc::clone(&shared);
        move || {
            let tracer = Tracer { shared };
            let mut engine = engine;
            engine.run(&tracer);
        }
    });
    if spawned.is_err() {
        // The engine was consumed by the failed spawn; the run is over.
        if let Ok(mut state) = shared.state.lock() {
            state.exec = ExecState::Terminated;
        }
        let _ = shared.events.send(Event::terminated());
        return Err(AdapterError::StateUnavailable);
    }
    Ok(())
}

/// Resume a paused run. Invalidates every outstanding reference id
/// before the engine wakes, so nothing observed during the previous
/// pause survives it.
pub(crate) fn resume(shared: &Arc<SessionShared>) -> Result<(), AdapterError> {
    let mut state = shared
        .state
        .lock()
        .map_err(|_| AdapterError::StateUnavailable)?;
    if state.exec != ExecState::Paused {
        return Err(AdapterError::NotPaused);
    }
    state.exec = ExecState::Running;
    state.pool.clear();
    state.children_memo.clear();
    state.frame_refs.clear();
    debug!("resuming engine run");
    shared.resumed.notify_all();
    Ok(())
}

/// Request termination from any state. A running or paused engine
/// aborts cooperatively at its next checkpoint and reports through
/// `on_complete`; with no engine running the session terminates here.
pub(crate) fn stop(shared: &Arc<SessionShared>) {
    let Ok(mut state) = shared.state.lock() else {
        return;
    };
    state.cancel = true;
    if state.exec == ExecState::Idle {
        state.exec = ExecState::Terminated;
        let _ = shared.events.send(Event::terminated());
    }
    shared.resumed.notify_all();
}

/// The adapter side of the trace contract, handed to the engine for
/// the duration of one run.
pub(crate) struct Tracer {
    pub(crate) shared: Arc<SessionShared>,
}

impl TraceHook for Tracer {
    fn on_start(&self) {
        debug!("engine run started");
    }

    fn on_enter(&self, step: StepEvent) -> TraceDirective {
        let Ok(mut state) = self.shared.state.lock() else {
            return TraceDirective::Abort;
        };
        if state.cancel {
            return TraceDirective::Abort;
        }

        let location = step.location.clone();
        state.stack.push(Frame::from_step(step));

        if state.exec == ExecState::Running && state.breakpoints.matches(&location) {
            debug!(path = %location.path, line = location.line, "breakpoint hit");
            state.exec = ExecState::Paused;
            let _ = self.shared.events.send(Event::stopped("breakpoint"));
            while state.exec == ExecState::Paused && !state.cancel {
                state = match self.shared.resumed.wait(state) {
                    Ok(guard) => guard,
                    Err(_) => return TraceDirective::Abort,
                };
            }
        }

        if state.cancel {
            TraceDirective::Abort
        } else {
            TraceDirective::Continue
        }
    }

    fn on_leave(&self) -> TraceDirective {
        let Ok(mut state) = self.shared.state.lock() else {
            return TraceDirective::Abort;
        };
        state.stack.pop();
        if state.cancel {
            TraceDirective::Abort
        } else {
            TraceDirective::Continue
        }
    }

    fn on_output(&self, category: OutputCategory, text: &str, location: Option<&SourceLocation>) {
        let _ = self.shared.events.send(Event::output(category, text, location));
    }

    fn on_complete(&self, error: Option<EngineError>) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.exec = ExecState::Terminated;
        }
        match error {
            None | Some(EngineError::Cancelled) => {
                debug!("engine run finished");
            }
            Some(err) => {
                let location = match &err {
                    EngineError::Fatal { location, .. } => location.clone(),
                    _ => None,
                };
                info!(error = %err, "engine run failed");
                let _ = self
                    .shared
                    .events
                    .send(Event::stopped_error(&err.to_string(), location.as_ref()));
            }
        }
        let _ = self.shared.events.send(Event::terminated());
    }
}
