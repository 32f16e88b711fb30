use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::ports::{CommandError, CommandOutput, CommandRunner, MAX_CAPTURED_OUTPUT};

/// Process spawner backed by `tokio::process`.
///
/// One child process per call, no retries. `kill_on_drop` ensures a timed-out
/// child does not outlive the call that spawned it.
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }

    fn spawn_error(program: &str, err: std::io::Error) -> CommandError {
        if err.kind() == std::io::ErrorKind::NotFound {
            CommandError::NotFound {
                program: program.to_string(),
            }
        } else {
            CommandError::Io {
                program: program.to_string(),
                message: err.to_string(),
            }
        }
    }

    fn build_output(program: &str, output: std::process::Output) -> Result<CommandOutput, CommandError> {
        if output.stdout.len() + output.stderr.len() > MAX_CAPTURED_OUTPUT {
            return Err(CommandError::OutputTooLarge {
                program: program.to_string(),
                limit: MAX_CAPTURED_OUTPUT,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(CommandOutput::new(stdout, stderr))
        } else {
            Err(CommandError::Failed {
                program: program.to_string(),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let started = Instant::now();

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Self::spawn_error(program, e))?;

        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CommandError::Io {
                    program: program.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout: limit,
                })
            }
        };

        debug!(
            program = %program,
            args = ?args,
            elapsed_ms = %started.elapsed().as_millis(),
            exit_code = ?output.status.code(),
            "command finished"
        );

        Self::build_output(program, output)
    }

    async fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<(), CommandError> {
        debug!(program = %program, args = ?args, "spawning detached");

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Self::spawn_error(program, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::DEFAULT_COMMAND_TIMEOUT;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = TokioCommandRunner::new();
        let output = runner.run("echo", &["hello"]).await.unwrap();
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let runner = TokioCommandRunner::new();
        let err = runner
            .run("definitely-not-a-real-binary-xyz", &[])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failed() {
        let runner = TokioCommandRunner::new();
        let err = runner.run("false", &[]).await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let runner = TokioCommandRunner::new();
        let err = runner
            .run_with_timeout("sleep", &["10"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[test]
    fn test_default_timeout_is_fifteen_seconds() {
        assert_eq!(DEFAULT_COMMAND_TIMEOUT, Duration::from_secs(15));
    }
}
