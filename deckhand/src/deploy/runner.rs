//! Execution runner
//!
//! Runs one script as a child process, waits for it and classifies the
//! outcome. There is exactly one attempt per call.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// Arguments and extra environment handed to a script.
///
/// The child inherits the service's own environment; `vars` are layered on
/// top of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    pub args: Vec<String>,
    pub vars: BTreeMap<String, String>,
}

impl ExecutionEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

/// Whether `key` can be used as an environment variable name
pub fn is_valid_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Outcome of one script execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,

    /// `None` when the process never ran or was killed by a signal
    pub exit_code: Option<i32>,

    /// Spawn failure or timeout
    pub error: Option<String>,
}

impl ExecutionResult {
    fn failed(error: String) -> Self {
        Self {
            succeeded: false,
            error: Some(error),
            ..Default::default()
        }
    }

    /// Captured stdout then stderr, split into lines
    pub fn output_lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .map(str::to_string)
            .collect()
    }

    /// Short reason for a failed run
    pub fn failure_reason(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        match self.exit_code {
            Some(code) => format!("script exited with status {}", code),
            None => "script was terminated by a signal".to_string(),
        }
    }
}

/// Executes a resolved script
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, script_path: &Path, env: &ExecutionEnvironment) -> ExecutionResult;
}

/// Runs scripts as local child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Program the script is handed to; the script is executed directly if unset
    interpreter: Option<PathBuf>,

    /// Kill the script after this long; unbounded if unset
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(interpreter: Option<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            interpreter,
            timeout,
        }
    }

    fn command(&self, script_path: &Path, env: &ExecutionEnvironment) -> Command {
        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(script_path);
                command
            }
            None => Command::new(script_path),
        };

        command
            .args(&env.args)
            .envs(&env.vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ScriptRunner for ProcessRunner {
    async fn run(&self, script_path: &Path, env: &ExecutionEnvironment) -> ExecutionResult {
        info!("Running script {}", script_path.display());
        let mut command = self.command(script_path, env);

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, command.output()).await {
                Ok(output) => output,
                Err(_) => {
                    return ExecutionResult::failed(format!(
                        "script timed out after {:?}",
                        limit
                    ))
                }
            },
            None => command.output().await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return ExecutionResult::failed(format!(
                    "failed to run {}: {}",
                    script_path.display(),
                    e
                ))
            }
        };

        let result = ExecutionResult {
            succeeded: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            error: None,
        };
        debug!(
            "Script {} finished with {:?}",
            script_path.display(),
            result.exit_code
        );
        result
    }
}
