pub mod availability;
pub mod docker;
pub mod exec;
pub mod kube;
pub mod shimmy;
pub mod tabular;

pub use availability::AvailabilityCache;
pub use docker::DockerAdapter;
pub use exec::TokioCommandRunner;
pub use kube::KubeAdapter;
pub use shimmy::InferenceAdapter;

use thiserror::Error;

use crate::ports::CommandError;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0} is not available")]
    Unavailable(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("invalid {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("unexpected output: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("administrative command execution is disabled")]
    ExecDisabled,
}

impl AdapterError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Validation failures map to HTTP 400; everything else is a 500.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

/// Identifiers that reach a command line (container ids, image refs, pod and
/// deployment names, namespaces, model names) must match this charset.
pub(crate) fn validate_identifier(field: &str, value: &str) -> Result<(), AdapterError> {
    if value.is_empty() {
        return Err(AdapterError::invalid(field, "must not be empty"));
    }
    if value.len() > 253 {
        return Err(AdapterError::invalid(field, "longer than 253 characters"));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '/' | '-')))
    {
        return Err(AdapterError::invalid(
            field,
            format!("character {:?} is not allowed", bad),
        ));
    }
    Ok(())
}


#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::ports::{CommandError, CommandOutput, CommandRunner};

    enum Arity {
        Always,
        Once,
    }

    /// Command double: canned responses matched on a substring of the
    /// rendered command line, plus call/spawn logs for count assertions.
    pub struct ScriptedRunner {
        rules: Mutex<Vec<(String, Result<CommandOutput, CommandError>, Arity)>>,
        calls: Mutex<Vec<String>>,
        spawns: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self {
                rules: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                spawns: Mutex::new(Vec::new()),
            }
        }

        pub fn ok(self, needle: &str, stdout: &str) -> Self {
            self.push(needle, Ok(CommandOutput::new(stdout, "")), Arity::Always);
            self
        }

        /// Like `ok`, but consumed by the first matching call.
        pub fn ok_once(self, needle: &str, stdout: &str) -> Self {
            self.push(needle, Ok(CommandOutput::new(stdout, "")), Arity::Once);
            self
        }

        pub fn failed(self, needle: &str, stderr: &str) -> Self {
            self.push(
                needle,
                Err(CommandError::Failed {
                    program: needle.to_string(),
                    code: Some(1),
                    stderr: stderr.to_string(),
                }),
                Arity::Always,
            );
            self
        }

        pub fn not_found(self, needle: &str) -> Self {
            self.push(
                needle,
                Err(CommandError::NotFound {
                    program: needle.to_string(),
                }),
                Arity::Always,
            );
            self
        }

        fn push(&self, needle: &str, response: Result<CommandOutput, CommandError>, arity: Arity) {
            self.rules
                .lock()
                .unwrap()
                .push((needle.to_string(), response, arity));
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_matching(&self, needle: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|line| line.contains(needle))
                .count()
        }

        pub fn spawn_count(&self) -> usize {
            self.spawns.lock().unwrap().len()
        }

        fn render(program: &str, args: &[&str]) -> String {
            if args.is_empty() {
                program.to_string()
            } else {
                format!("{} {}", program, args.join(" "))
            }
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run_with_timeout(
            &self,
            program: &str,
            args: &[&str],
            _timeout: Duration,
        ) -> Result<CommandOutput, CommandError> {
            let line = Self::render(program, args);
            self.calls.lock().unwrap().push(line.clone());

            let mut rules = self.rules.lock().unwrap();
            for index in 0..rules.len() {
                if line.contains(rules[index].0.as_str()) {
                    if matches!(rules[index].2, Arity::Once) {
                        return rules.remove(index).1;
                    }
                    return rules[index].1.clone();
                }
            }

            Err(CommandError::Failed {
                program: program.to_string(),
                code: Some(1),
                stderr: format!("no scripted response for `{}`", line),
            })
        }

        async fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<(), CommandError> {
            self.spawns.lock().unwrap().push(Self::render(program, args));
            Ok(())
        }
    }
}
