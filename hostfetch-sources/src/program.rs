//! Data-source program fetcher.
//!
//! Runs a configured command line through the shell and returns its raw
//! stdout. Output is agent data, not necessarily UTF-8.

use std::time::Duration;

use async_trait::async_trait;
use hostfetch_core::{AgentRawData, Mode};
use hostfetch_fetch::host::process::EXIT_COMMAND_NOT_FOUND;
use hostfetch_fetch::{FetchFailure, Fetcher, FetcherError, FetcherType, ProcessError, ProcessRunner};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Runs a program and returns what it prints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramFetcher {
    /// Shell command line.
    pub cmdline: String,
    /// Fed to the program's stdin.
    #[serde(default)]
    pub stdin: Option<String>,
    /// Seconds after which the program is killed.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(skip)]
    runner: ProcessRunner,
}

impl ProgramFetcher {
    /// Creates a fetcher without stdin or timeout.
    pub fn new(cmdline: impl Into<String>) -> Self {
        Self {
            cmdline: cmdline.into(),
            stdin: None,
            timeout: None,
            runner: ProcessRunner::new(),
        }
    }

    /// Sets the program's stdin.
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Sets the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// First word of the command line, without quotes.
    pub fn executable(&self) -> &str {
        self.cmdline
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_matches(|c| c == '"' || c == '\'')
    }

    fn map_process_error(&self, err: ProcessError) -> FetcherError {
        match err {
            ProcessError::Timeout(after) => FetcherError::Timeout(format!(
                "Program '{}' timed out after {}s",
                self.executable(),
                after.as_secs()
            )),
            ProcessError::NotFound(cmd) => FetcherError::Program(format!("'{cmd}' not found")),
            ProcessError::Io(e) => FetcherError::Io(e),
        }
    }
}

#[async_trait]
impl Fetcher for ProgramFetcher {
    type RawData = AgentRawData;

    fn fetcher_type(&self) -> FetcherType {
        FetcherType::Program
    }

    async fn open(&mut self) -> Result<(), FetchFailure> {
        // Shell builtins and paths relative to a `cd` are not on PATH, so a
        // miss here only warns; the shell's exit code is authoritative.
        let exe = self.executable();
        if !exe.is_empty() && !self.runner.command_exists(exe) {
            warn!(program = %exe, "Program not found on PATH");
        }
        Ok(())
    }

    async fn close(&mut self) {}

    #[instrument(skip_all, fields(program = %self.executable()))]
    async fn fetch_from_io(&mut self, _mode: Mode) -> Result<AgentRawData, FetchFailure> {
        let output = self
            .runner
            .run_shell(
                &self.cmdline,
                self.stdin.as_deref().map(str::as_bytes),
                self.timeout.map(Duration::from_secs),
            )
            .await
            .map_err(|e| self.map_process_error(e))?;

        if output.exit_code == EXIT_COMMAND_NOT_FOUND {
            return Err(FetcherError::Program(format!(
                "Program '{}' not found (exit code {EXIT_COMMAND_NOT_FOUND})",
                self.executable()
            ))
            .into());
        }
        if !output.success() && output.stdout.is_empty() {
            return Err(FetcherError::Program(format!(
                "Agent exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            ))
            .into());
        }

        debug!(bytes = output.stdout.len(), exit_code = output.exit_code, "Program output read");
        Ok(AgentRawData(output.stdout))
    }
}
