//! Execution of exercise-supplied evaluator programs.

use async_trait::async_trait;
use serde_json::json;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use verity_common::config::LanguageConfigManager;
use verity_common::value::Value;

/// Exit status reported when a child is killed for using too much memory.
const OOM_EXIT_CODE: i32 = 137;

/// One call of a custom evaluator program.
#[derive(Debug, Clone, Copy)]
pub struct CustomInvocation<'a> {
    pub language: &'a str,
    pub program: &'a Path,
    pub expected: &'a Value,
    pub actual: &'a Value,
    pub arguments: &'a [Value],
    pub budget: Duration,
}

impl CustomInvocation<'_> {
    /// JSON document written to the program's standard input.
    pub fn payload(&self) -> String {
        json!({
            "expected": self.expected.to_json(),
            "actual": self.actual.to_json(),
            "arguments": self.arguments.iter().map(Value::to_json).collect::<Vec<_>>(),
        })
        .to_string()
    }
}

/// What the program printed. Failures to start or finish the program are
/// folded into an empty `stdout` with an explanation on `stderr`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramOutput {
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub memory_exceeded: bool,
}

impl ProgramOutput {
    fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait ProgramRunner: Debug + Send + Sync {
    async fn evaluate_custom(&self, invocation: CustomInvocation<'_>) -> ProgramOutput;
}

/// Runs evaluator programs as child processes using the language table.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    languages: LanguageConfigManager,
    resources: PathBuf,
}

impl ProcessRunner {
    /// Programs run from `resources`, so relative program paths resolve there.
    pub fn new(languages: LanguageConfigManager, resources: impl Into<PathBuf>) -> Self {
        Self {
            languages,
            resources: resources.into(),
        }
    }

    fn command(&self, invocation: &CustomInvocation<'_>) -> Result<Command, String> {
        let config = self
            .languages
            .get_config(invocation.language)
            .map_err(|e| e.to_string())?;
        let mut command = Command::new(&config.execution.command);
        command
            .args(&config.execution.args)
            .arg(invocation.program)
            .current_dir(&self.resources)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(command)
    }
}

#[async_trait]
impl ProgramRunner for ProcessRunner {
    async fn evaluate_custom(&self, invocation: CustomInvocation<'_>) -> ProgramOutput {
        let mut command = match self.command(&invocation) {
            Ok(command) => command,
            Err(e) => {
                warn!(language = invocation.language, error = %e, "Cannot run custom evaluator");
                return ProgramOutput::failed(e);
            }
        };

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    language = invocation.language,
                    program = %invocation.program.display(),
                    error = %e,
                    "Failed to start custom evaluator"
                );
                return ProgramOutput::failed(format!("Failed to start custom evaluator: {e}"));
            }
        };

        let start = Instant::now();
        let payload = invocation.payload();
        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                // A program that never reads its input closes the pipe early
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    debug!(error = %e, "Custom evaluator did not read its input");
                }
            }
            child.wait_with_output().await
        };

        match tokio::time::timeout(invocation.budget, run).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code();
                debug!(
                    program = %invocation.program.display(),
                    exit_code = ?exit_code,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Custom evaluator finished"
                );
                ProgramOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    timed_out: false,
                    memory_exceeded: exit_code == Some(OOM_EXIT_CODE),
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Custom evaluator failed");
                ProgramOutput::failed(format!("Custom evaluator failed: {e}"))
            }
            Err(_) => {
                // Dropping the future drops the child, which kills it
                warn!(
                    program = %invocation.program.display(),
                    budget_ms = invocation.budget.as_millis() as u64,
                    "Custom evaluator timed out"
                );
                ProgramOutput {
                    timed_out: true,
                    ..ProgramOutput::failed(format!(
                        "Custom evaluator timed out after {:.1}s",
                        invocation.budget.as_secs_f64()
                    ))
                }
            }
        }
    }
}
