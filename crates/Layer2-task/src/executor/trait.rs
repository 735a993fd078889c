//! Executor trait

use crate::command::CommandSpec;
use crate::error::CliError;
use async_trait::async_trait;

/// Captured result of a process that exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was ended by a signal
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Failure text: stderr, then stdout, then the bare exit code
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit code {}", self.exit_code)
    }
}

/// Executor trait - implement to add new execution backends
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `spec` once, feeding `prompt` through argv or stdin
    ///
    /// Resolves with the output whenever the process exits, whatever its
    /// exit code; fails on spawn errors and timeouts.
    async fn run(&self, spec: &CommandSpec, prompt: &str) -> Result<ProcessOutput, CliError>;

    /// Get executor name
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str, exit_code: i32) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    #[test]
    fn test_failure_message_priority() {
        assert_eq!(output("out", "boom\n", 1).failure_message(), "boom");
        assert_eq!(output(" out ", "  ", 1).failure_message(), "out");
        assert_eq!(output("", "", 7).failure_message(), "exit code 7");
    }

    #[test]
    fn test_success() {
        assert!(output("", "", 0).success());
        assert!(!output("", "", -1).success());
    }
}
