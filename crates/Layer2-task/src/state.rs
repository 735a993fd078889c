//! Process state machine
//!
//! `Created -> Running -> {TimedOut | Errored | Exited}`. A spawn failure goes
//! straight from `Created` to `Errored`. The latch settles once; later
//! terminal signals are ignored.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one spawned command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Not spawned yet
    Created,

    /// Spawned, waiting for exit or timeout
    Running,

    /// Timeout fired first; the process was signalled
    TimedOut,

    /// Spawn or wait failed
    Errored,

    /// Process exited (any exit code)
    Exited,
}

impl ProcessState {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessState::TimedOut | ProcessState::Errored | ProcessState::Exited
        )
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            ProcessState::Created => "created",
            ProcessState::Running => "running",
            ProcessState::TimedOut => "timed out",
            ProcessState::Errored => "errored",
            ProcessState::Exited => "exited",
        }
    }
}

/// One-shot completion latch over [`ProcessState`]
#[derive(Debug)]
pub struct CompletionLatch {
    state: ProcessState,
}

impl Default for CompletionLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self {
            state: ProcessState::Created,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// `Created -> Running`
    pub fn start(&mut self) -> bool {
        if self.state == ProcessState::Created {
            self.state = ProcessState::Running;
            true
        } else {
            false
        }
    }

    /// Move to a terminal state; returns false when already settled
    pub fn settle(&mut self, terminal: ProcessState) -> bool {
        let allowed = match terminal {
            ProcessState::Errored => !self.state.is_terminal(),
            ProcessState::TimedOut | ProcessState::Exited => self.state == ProcessState::Running,
            ProcessState::Created | ProcessState::Running => false,
        };

        if allowed {
            self.state = terminal;
        }
        allowed
    }
}
