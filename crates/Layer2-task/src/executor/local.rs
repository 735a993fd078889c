//! Local executor - runs a command on the host system
//!
//! Features:
//! - stdout/stderr accumulated incrementally while the process runs
//! - prompt delivered on stdin (then closed), or stdin closed immediately
//! - a single timeout; SIGTERM on expiry, SIGKILL after a grace period
//! - kill-on-drop, so dropping the future tears the process down

use crate::command::CommandSpec;
use crate::error::CliError;
use crate::executor::{Executor, ProcessOutput};
use crate::state::{CompletionLatch, ProcessState};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Local executor configuration
#[derive(Debug, Clone)]
pub struct LocalExecutorConfig {
    /// Time between SIGTERM and SIGKILL after a timeout
    pub kill_grace: Duration,
}

impl Default for LocalExecutorConfig {
    fn default() -> Self {
        Self {
            kill_grace: Duration::from_secs(2),
        }
    }
}

/// How the wait ended
enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
}

/// Executor that spawns commands directly on the host
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    config: LocalExecutorConfig,
}

impl LocalExecutor {
    /// Create a new local executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with configuration
    pub fn with_config(config: LocalExecutorConfig) -> Self {
        Self { config }
    }

    fn build_command(spec: &CommandSpec, prompt: &str) -> Command {
        let mut cmd = Command::new(&spec.command);
        cmd.args(spec.argv_with_prompt(prompt))
            .stdin(if spec.stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        // Inherits the parent environment; contact entries override it
        cmd.envs(&spec.env);
        cmd
    }

    /// Signal a timed-out process and reap it in the background
    fn terminate(&self, mut child: Child) {
        if !send_sigterm(&mut child) {
            debug!("SIGTERM not delivered, falling back to kill");
            let _ = child.start_kill();
        }

        let grace = self.config.kill_grace;
        tokio::spawn(async move {
            if tokio::time::timeout(grace, child.wait()).await.is_err() {
                debug!("Grace period expired - killing process");
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        });
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn run(&self, spec: &CommandSpec, prompt: &str) -> Result<ProcessOutput, CliError> {
        let mut latch = CompletionLatch::new();
        let timeout_ms = spec.timeout_ms();

        let mut child = match Self::build_command(spec, prompt).spawn() {
            Ok(child) => child,
            Err(source) => {
                latch.settle(ProcessState::Errored);
                debug!(command = %spec.command, error = %source, "Failed to spawn command");
                return Err(CliError::Spawn {
                    command: spec.command.clone(),
                    source,
                });
            }
        };
        latch.start();
        let deadline = Instant::now() + spec.timeout;

        debug!(
            command = %spec.command,
            pid = ?child.id(),
            timeout_ms,
            stdin = spec.stdin,
            "Spawned command"
        );

        if let Some(mut stdin) = child.stdin.take() {
            let input = prompt.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!("Failed to write prompt to stdin: {}", e);
                }
                let _ = stdin.shutdown().await;
            });
        }

        let stdout_task = child.stdout.take().map(|out| tokio::spawn(collect(out)));
        let stderr_task = child.stderr.take().map(|err| tokio::spawn(collect(err)));

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = tokio::time::sleep_until(deadline) => Outcome::TimedOut,
        };

        match outcome {
            Outcome::TimedOut => {
                if latch.settle(ProcessState::TimedOut) {
                    warn!(command = %spec.command, timeout_ms, "Command timed out - terminating");
                    self.terminate(child);
                }
                Err(CliError::TimedOut(timeout_ms))
            }
            Outcome::Exited(Err(e)) => {
                latch.settle(ProcessState::Errored);
                Err(CliError::Io(e))
            }
            Outcome::Exited(Ok(status)) => {
                latch.settle(ProcessState::Exited);

                // Pipes may outlive the process when it leaves children behind
                let drained = tokio::time::timeout_at(deadline, async {
                    (join_output(stdout_task).await, join_output(stderr_task).await)
                })
                .await;

                let (stdout, stderr) = match drained {
                    Ok(pair) => pair,
                    Err(_) => {
                        warn!(command = %spec.command, "Output still open at deadline");
                        return Err(CliError::TimedOut(timeout_ms));
                    }
                };

                let exit_code = status.code().unwrap_or(-1);
                debug!(
                    command = %spec.command,
                    exit_code,
                    stdout_bytes = stdout.len(),
                    stderr_bytes = stderr.len(),
                    state = latch.state().display_name(),
                    "Command finished"
                );

                Ok(ProcessOutput {
                    stdout,
                    stderr,
                    exit_code,
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Read a pipe to EOF, chunk by chunk
async fn collect<R>(mut reader: R) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(e) => {
                debug!("Pipe read error: {}", e);
                break;
            }
        }
    }
    buffer
}

async fn join_output(task: Option<JoinHandle<Vec<u8>>>) -> String {
    match task {
        Some(handle) => handle
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
        None => String::new(),
    }
}

/// Send graceful termination signal (SIGTERM on Unix)
#[cfg(unix)]
fn send_sigterm(child: &mut Child) -> bool {
    match child.id() {
        // SAFETY: plain kill(2) on a pid we spawned and have not reaped yet
        Some(pid) => unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 },
        None => false,
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) -> bool {
    // No SIGTERM equivalent; kill outright
    child.start_kill().is_ok()
}
