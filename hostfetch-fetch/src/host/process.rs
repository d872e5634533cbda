//! Subprocess execution for data-source programs.
//!
//! Data-source programs are configured as a single command line, so the
//! runner hands it to `sh -c` and captures raw stdout bytes. Agent output
//! is not required to be UTF-8.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

/// Shell used to interpret command lines.
const SHELL: &str = "sh";

/// Exit code the shell reports for an unknown command.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

// ============================================================================
// Process Output
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code (0 = success, -1 = killed by signal).
    pub exit_code: i32,
    /// How long the command took to execute.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// Runs command lines through the shell.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Runs `cmdline`, feeding `stdin` if given.
    ///
    /// The child is killed when `timeout` expires.
    #[instrument(skip(self, stdin), fields(cmdline = %cmdline, timeout = ?timeout))]
    pub async fn run_shell(
        &self,
        cmdline: &str,
        stdin: Option<&[u8]>,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ProcessError> {
        let shell = self.which(SHELL).ok_or_else(|| {
            warn!("Shell not found");
            ProcessError::NotFound(SHELL.to_string())
        })?;

        let start = Instant::now();

        let mut command = Command::new(&shell);
        command
            .arg("-c")
            .arg(cmdline)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let pipe = child.stdin.take();

        // Stdin is fed while stdout and stderr are drained. A child that
        // echoes its input would otherwise block on a full stdout pipe.
        let exchange = async move {
            let feed = async move {
                if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
                    match pipe.write_all(input).await {
                        // The child may exit without reading all of its input.
                        Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e),
                        _ => {}
                    }
                    // Closing the pipe signals EOF to the child.
                    drop(pipe);
                }
                Ok(())
            };
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        let output = if let Some(timeout) = timeout {
            match tokio::time::timeout(timeout, exchange).await {
                Ok(result) => result?,
                Err(_) => {
                    // Dropping the exchange kills the child.
                    warn!(timeout = ?timeout, "Command timed out");
                    return Err(ProcessError::Timeout(timeout));
                }
            }
        } else {
            exchange.await?
        };

        let duration = start.elapsed();
        let result = ProcessOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            duration,
        };

        debug!(
            exit_code = result.exit_code,
            duration = ?duration,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Command completed"
        );

        Ok(result)
    }

    /// Check if a command exists on PATH.
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Find the path to a command.
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
