//! # parley-task
//!
//! Local command execution for CLI-wrapped providers.
//!
//! ## Features
//!
//! - Command resolution from a contact's `extra` bag with per-kind defaults
//! - `{prompt}` substitution across arguments, or prompt delivery over stdin
//! - Single timeout with SIGTERM -> SIGKILL escalation
//! - Explicit lifecycle state machine with a one-shot completion latch

pub mod command;
pub mod error;
pub mod executor;
pub mod state;

pub use command::{
    timeout_from_value, CommandDefaults, CommandSpec, ParseMode, DEFAULT_TIMEOUT_MS,
    PROMPT_PLACEHOLDER,
};
pub use error::CliError;
pub use executor::{local::LocalExecutorConfig, Executor, LocalExecutor, ProcessOutput};
pub use state::{CompletionLatch, ProcessState};
