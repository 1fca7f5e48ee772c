//! `claude-driver` — subprocess driver for the Claude CLI.
//!
//! This crate spawns `claude --dangerously-skip-permissions -p <prompt>
//! --output-format stream-json`, parses the line-delimited JSON it writes to
//! stdout, and hands typed [`AgentEvent`]s to a caller-supplied handler in
//! stream order.
//!
//! # Architecture
//!
//! ```text
//! AgentRunner::run(prompt, model, handler, cancel)
//!     │
//!     ▼
//! AgentProcess    ← spawns the binary, drains stderr on a side task
//!     │              reads JSONL from stdout
//!     ▼
//! EventParser     ← one logical line at a time, lazily
//!     │              blank / undecodable / unknown-type lines are skipped
//!     ▼
//! AgentEvent      ← session init, assistant text, tool use, tool result,
//!                   session result
//! ```
//!
//! Events are delivered synchronously: the handler sees each event before the
//! next stdout line is read, so a progress UI observes the session exactly in
//! source order. Cancelling the token kills the subprocess and resolves the
//! run with [`RunOutcome::Cancelled`].

pub mod error;
pub mod event;
pub mod parser;
pub mod runner;

pub(crate) mod process;


pub use error::AgentError;
pub use event::{AgentEvent, ToolResult, ToolUse};
pub use parser::EventParser;
pub use runner::{AgentRunner, RunOutcome, StderrSink};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AgentError>;
