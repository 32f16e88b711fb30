use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Default timeout applied to every external call that does not pick its own.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// Captured stdout/stderr beyond this is treated as a failure, not buffered.
pub const MAX_CAPTURED_OUTPUT: usize = 10 * 1024 * 1024;

/// Captured output of a finished external command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("{program}: command not found")]
    NotFound { program: String },

    #[error("{program} exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} produced more than {limit} bytes of output")]
    OutputTooLarge { program: String, limit: usize },

    #[error("io error running {program}: {message}")]
    Io { program: String, message: String },
}

impl CommandError {
    /// True when the tool itself is absent, as opposed to present-but-erroring.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Port for spawning external processes.
///
/// Commands are always an explicit program + argument vector; nothing in
/// the crate goes through a shell. Implementations must never panic across
/// this boundary: every failure mode maps to a `CommandError` variant.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing stdout/stderr, failing past `timeout`.
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;

    /// Run with the default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        self.run_with_timeout(program, args, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Launch without waiting for exit (daemon-style children).
    async fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<(), CommandError>;
}
