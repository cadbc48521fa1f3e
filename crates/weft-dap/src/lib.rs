//! Debug adapter for instrumented transform engines.
//!
//! Bridges an engine that reports step-by-step progress (see
//! [`weft_engine`]) to a DAP-style client protocol: breakpoints,
//! suspend/resume from a control connection, and lazily expandable
//! call-stack and variable snapshots taken at the moment of
//! suspension.
//!
//! The transport is deliberately thin: line-delimited JSON over TCP,
//! one session per connection, sessions fully independent. Everything
//! interesting lives in the session coordinator, which runs between
//! the engine thread (trace callbacks) and the control thread
//! (client requests) under a single session lock.

pub mod breakpoints;
pub(crate) mod coordinator;
pub mod dispatch;
pub mod error;
pub mod harness;
pub mod model;
pub mod pool;
pub mod protocol;
pub mod render;
pub mod server;
pub mod session;

pub use error::AdapterError;
pub use harness::TestHarness;
pub use protocol::{Event, Request, Response};
pub use server::DebugServer;
pub use session::{ExecState, Session};
