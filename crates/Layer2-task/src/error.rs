//! Process execution errors

use thiserror::Error;

/// Errors raised while resolving or running a local command
#[derive(Error, Debug)]
pub enum CliError {
    /// No command configured for the contact or kind
    #[error("no command configured; set extra.command")]
    MissingCommand,

    /// Malformed `extra` entry
    #[error("invalid command config: {0}")]
    InvalidConfig(String),

    /// The executable could not be started
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The timeout fired before the process exited
    #[error("timed out after {0}ms")]
    TimedOut(u64),

    /// Waiting on the process failed
    #[error("process error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CliError::TimedOut(_))
    }
}
