//! A deterministic engine that replays a fixed script of trace
//! actions. Exists so the adapter can be tested without a real
//! transform engine behind it.

use crate::trace::{
    Engine, EngineError, EngineFactory, LaunchConfig, OutputCategory, StepEvent, TraceDirective,
    TraceHook,
};
use crate::value::SourceLocation;

/// One scripted trace action.
#[derive(Debug, Clone)]
pub enum ScriptAction {
    Enter(StepEvent),
    Leave,
    Output {
        category: OutputCategory,
        text: String,
        location: Option<SourceLocation>,
    },
    /// Abort the run with a fatal error; later actions are ignored.
    Fail {
        message: String,
        location: Option<SourceLocation>,
    },
}

/// Replays its script through a [`TraceHook`], honouring
/// [`TraceDirective::Abort`] the way a cooperative engine must.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    actions: Vec<ScriptAction>,
}

impl ScriptedEngine {
    pub fn new(actions: Vec<ScriptAction>) -> Self {
        Self { actions }
    }
}

impl Engine for ScriptedEngine {
    fn run(&mut self, trace: &dyn TraceHook) {
        trace.on_start();
        for action in self.actions.drain(..) {
            match action {
                ScriptAction::Enter(step) => {
                    if trace.on_enter(step) == TraceDirective::Abort {
                        trace.on_complete(Some(EngineError::Cancelled));
                        return;
                    }
                }
                ScriptAction::Leave => {
                    if trace.on_leave() == TraceDirective::Abort {
                        trace.on_complete(Some(EngineError::Cancelled));
                        return;
                    }
                }
                ScriptAction::Output {
                    category,
                    text,
                    location,
                } => {
                    trace.on_output(category, &text, location.as_ref());
                }
                ScriptAction::Fail { message, location } => {
                    trace.on_complete(Some(EngineError::Fatal { message, location }));
                    return;
                }
            }
        }
        trace.on_complete(None);
    }
}

/// Factory that hands out fresh replays of the same script, ignoring
/// the launch configuration.
#[derive(Debug, Clone)]
pub struct ScriptedFactory {
    script: Vec<ScriptAction>,
}

impl ScriptedFactory {
    pub fn new(script: Vec<ScriptAction>) -> Self {
        Self { script }
    }
}

impl EngineFactory for ScriptedFactory {
    fn prepare(&self, _config: &LaunchConfig) -> Result<Box<dyn Engine>, EngineError> {
        Ok(Box::new(ScriptedEngine::new(self.script.clone())))
    }
}
