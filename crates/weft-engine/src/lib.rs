//! Interface between an instrumented transform engine and the weft
//! debug adapter.
//!
//! The adapter never runs a program itself. It consumes an [`Engine`]
//! prepared by an [`EngineFactory`] and observes its progress through
//! the [`TraceHook`] callbacks, which carry already-materialized
//! [`EngineValue`] snapshots. Engines live elsewhere; this crate only
//! fixes the contract, plus a deterministic [`scripted::ScriptedEngine`]
//! used for testing the adapter.

pub mod scripted;
pub mod trace;
pub mod value;

pub use scripted::{ScriptAction, ScriptedEngine, ScriptedFactory};
pub use trace::{
    ConstructKind, Engine, EngineError, EngineFactory, LaunchConfig, OutputCategory, StepEvent,
    TraceDirective, TraceHook,
};
pub use value::{EngineValue, NodeKind, NodeValue, SourceLocation};
