//! The trace contract between an engine and the adapter.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use smol_str::SmolStr;
use thiserror::Error;

use crate::value::{EngineValue, SourceLocation};

/// Kind of program construct the engine entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructKind {
    Template,
    Function,
    FunctionCall,
    Expression,
    LetBinding,
    LiteralElement,
    LiteralAttribute,
    /// A named engine instruction, e.g. `xsl:for-each`.
    Instruction(SmolStr),
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructKind::Template => f.write_str("template"),
            ConstructKind::Function => f.write_str("function"),
            ConstructKind::FunctionCall => f.write_str("function-call"),
            ConstructKind::Expression => f.write_str("expression"),
            ConstructKind::LetBinding => f.write_str("let"),
            ConstructKind::LiteralElement => f.write_str("literal-element"),
            ConstructKind::LiteralAttribute => f.write_str("literal-attribute"),
            ConstructKind::Instruction(name) => f.write_str(name),
        }
    }
}

/// Everything the engine reports when it enters a traced construct.
/// All values are materialized snapshots (see [`crate::value`]).
#[derive(Debug, Clone)]
pub struct StepEvent {
    pub location: SourceLocation,
    pub construct: ConstructKind,
    /// The current context value, when the construct has one.
    pub context: Option<EngineValue>,
    /// Declared parameters, in declaration order.
    pub parameters: IndexMap<SmolStr, EngineValue>,
    /// Local bindings visible at the construct, in declaration order.
    pub locals: Vec<(SmolStr, EngineValue)>,
}

impl StepEvent {
    /// A bare step at a location, defaulting to an unnamed instruction
    /// with no bindings.
    pub fn at(path: impl Into<SmolStr>, line: u32, column: u32) -> Self {
        Self {
            location: SourceLocation::new(path, line, column),
            construct: ConstructKind::Expression,
            context: None,
            parameters: IndexMap::new(),
            locals: Vec::new(),
        }
    }

    pub fn with_construct(mut self, construct: ConstructKind) -> Self {
        self.construct = construct;
        self
    }

    pub fn with_context(mut self, context: EngineValue) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<SmolStr>, value: EngineValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_local(mut self, name: impl Into<SmolStr>, value: EngineValue) -> Self {
        self.locals.push((name.into(), value));
        self
    }
}

/// Stream an output line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCategory {
    Stdout,
    Stderr,
}

impl OutputCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputCategory::Stdout => "stdout",
            OutputCategory::Stderr => "stderr",
        }
    }
}

/// What the engine should do after a checkpoint callback returns.
///
/// `Abort` is the cooperative cancellation signal: the engine must
/// unwind promptly and finish with
/// `on_complete(Some(EngineError::Cancelled))`. Engine threads are
/// never killed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirective {
    Continue,
    Abort,
}

/// Failures an engine can report to the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("failed to prepare engine run: {message}")]
    Prepare { message: String },
    #[error("{message}")]
    Fatal {
        message: String,
        location: Option<SourceLocation>,
    },
    #[error("run cancelled")]
    Cancelled,
}

/// Step callbacks the engine invokes synchronously, in nested order
/// matching program structure, on its own thread.
///
/// `on_enter`/`on_leave` may block for arbitrarily long while the
/// session is paused; the engine must not assume they return quickly.
pub trait TraceHook: Send + Sync {
    /// Called once when the run starts, before the first step.
    fn on_start(&self) {}

    /// Called when the engine enters a traced construct.
    fn on_enter(&self, step: StepEvent) -> TraceDirective;

    /// Called when the engine leaves the most recently entered
    /// construct.
    fn on_leave(&self) -> TraceDirective;

    /// Program output produced during the run.
    fn on_output(&self, category: OutputCategory, text: &str, location: Option<&SourceLocation>) {
        let _ = (category, text, location);
    }

    /// Called exactly once when the run finishes, normally or not.
    fn on_complete(&self, error: Option<EngineError>);
}

/// A prepared, runnable engine instance. Errors are reported through
/// [`TraceHook::on_complete`], never by panicking across the
/// boundary.
pub trait Engine: Send {
    fn run(&mut self, trace: &dyn TraceHook);
}

/// What a client's launch request configures.
#[derive(Debug, Clone, Default)]
pub struct LaunchConfig {
    /// The program (stylesheet, template, script) to run.
    pub program: PathBuf,
    /// Input document fed to the program, when the engine takes one.
    pub input: Option<PathBuf>,
    /// Where serialized output goes, when the engine produces any.
    pub output: Option<PathBuf>,
}

/// Turns launch configuration into a runnable engine. One factory
/// serves many sessions; each `prepare` call yields an independent
/// run.
pub trait EngineFactory: Send + Sync {
    fn prepare(&self, config: &LaunchConfig) -> Result<Box<dyn Engine>, EngineError>;
}
