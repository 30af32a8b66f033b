//! Out-of-process test execution
//!
//! Generated code never runs inside the orchestrator. [`PytestRunner`]
//! writes it to a `test_*.py` file and runs the configured program as a
//! child process with a wall-clock limit. The child is killed if the run is
//! abandoned.

use async_trait::async_trait;
use pagepilot_core::config::RunnerConfig;
use pagepilot_core::{PilotError, Result, VerificationReport};
use std::collections::VecDeque;
use std::io::Write;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::report::parse_report;

/// Raw result of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// stdout followed by stderr
    pub output: String,
    /// `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub elapsed_seconds: f64,
}

/// Executes a generated test file
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run `code` as a test file. `Err` means the run could not happen at all.
    async fn run(&self, code: &str) -> Result<RunOutput>;
}

/// Runs generated code with pytest (or another configured program)
#[derive(Debug, Clone)]
pub struct PytestRunner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl PytestRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

#[async_trait]
impl TestRunner for PytestRunner {
    #[instrument(skip(self, code), fields(program = %self.program, code_len = code.len()))]
    async fn run(&self, code: &str) -> Result<RunOutput> {
        let mut file = tempfile::Builder::new()
            .prefix("test_")
            .suffix(".py")
            .tempfile()?;
        file.write_all(code.as_bytes())?;
        file.flush()?;

        debug!("Running {} on {:?}", self.program, file.path());
        let started = Instant::now();

        let child = Command::new(&self.program)
            .arg(file.path())
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PilotError::Runner(format!("Failed to start {}: {}", self.program, e)))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| PilotError::Runner(format!("Failed to collect output: {}", e)))?,
            Err(_) => {
                warn!("Test run exceeded {:?}, child killed", self.timeout);
                return Err(PilotError::Runner(format!(
                    "Test run timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        // The temp file is removed when `file` drops, after the child exits
        drop(file);

        Ok(RunOutput {
            output: combined,
            exit_code: output.status.code(),
            elapsed_seconds: started.elapsed().as_secs_f64(),
        })
    }
}

/// Run once and parse; a run that cannot happen becomes a failed report
pub async fn execute_attempt(runner: &dyn TestRunner, code: &str) -> VerificationReport {
    let started = Instant::now();
    match runner.run(code).await {
        Ok(run) => parse_report(&run.output, run.exit_code, run.elapsed_seconds),
        Err(e) => {
            warn!("Test execution failed: {}", e);
            VerificationReport::execution_error(e, started.elapsed().as_secs_f64())
        }
    }
}

/// Scripted runner for tests
///
/// Replays queued outputs in order and records every code artifact it was
/// asked to run.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    outputs: Arc<Mutex<VecDeque<Result<RunOutput>>>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, output: Result<RunOutput>) {
        if let Ok(mut outputs) = self.outputs.lock() {
            outputs.push_back(output);
        }
    }

    /// Queue a fully passing pytest run
    pub fn push_pass(&self, passed: u32) {
        let mut lines: Vec<String> = (1..=passed)
            .map(|i| format!("test_generated.py::test_case_{} PASSED", i))
            .collect();
        lines.push(format!("===== {} passed in 0.42s =====", passed));
        self.push(Ok(RunOutput {
            output: lines.join("\n"),
            exit_code: Some(0),
            elapsed_seconds: 0.42,
        }));
    }

    /// Queue a pytest run with failures
    pub fn push_fail(&self, passed: u32, failed: u32) {
        let mut lines: Vec<String> = (1..=passed)
            .map(|i| format!("test_generated.py::test_case_{} PASSED", i))
            .collect();
        lines.extend((1..=failed).map(|i| format!("test_generated.py::test_broken_{} FAILED", i)));
        lines.push(format!("===== {} failed, {} passed in 0.91s =====", failed, passed));
        self.push(Ok(RunOutput {
            output: lines.join("\n"),
            exit_code: Some(1),
            elapsed_seconds: 0.91,
        }));
    }

    /// Code artifacts run so far
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn run_count(&self) -> usize {
        self.executed.lock().map(|e| e.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TestRunner for MockRunner {
    async fn run(&self, code: &str) -> Result<RunOutput> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(code.to_string());
        }
        self.outputs
            .lock()
            .map_err(|_| PilotError::Runner("mock runner lock poisoned".to_string()))?
            .pop_front()
            .unwrap_or_else(|| Err(PilotError::Runner("No mock run queued".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_runner_error() {
        let runner = PytestRunner::new(&RunnerConfig {
            program: "pagepilot-no-such-program".to_string(),
            args: vec![],
            timeout_seconds: 5,
        });
        let err = runner.run("def test_x():\n    pass\n").await.unwrap_err();
        assert!(matches!(err, PilotError::Runner(_)));
    }

    #[tokio::test]
    async fn test_execute_attempt_converts_start_failure() {
        let runner = PytestRunner::new(&RunnerConfig {
            program: "pagepilot-no-such-program".to_string(),
            args: vec![],
            timeout_seconds: 5,
        });
        let report = execute_attempt(&runner, "x = 1").await;
        assert!(!report.success);
        assert_eq!(report.errored, 1);
        assert!(report.filtered_log.starts_with("Execution error:"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_file_with_test_prefix() {
        // `ls -1` prints the file path it was given
        let runner = PytestRunner::new(&RunnerConfig {
            program: "ls".to_string(),
            args: vec![],
            timeout_seconds: 5,
        });
        let run = runner.run("print('hi')").await.unwrap();
        assert_eq!(run.exit_code, Some(0));
        let path = run.output.trim();
        let name = std::path::Path::new(path).file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("test_"));
        assert!(name.ends_with(".py"));
        // Removed after the run
        assert!(!std::path::Path::new(path).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_becomes_error() {
        // `sh <file>` runs the file as a script that outlives the limit
        let runner = PytestRunner {
            program: "sh".to_string(),
            args: vec![],
            timeout: Duration::from_millis(200),
        };
        let err = runner.run("sleep 5\n").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_mock_runner_outputs_parse() {
        let runner = MockRunner::new();
        runner.push_fail(2, 1);
        runner.push_pass(3);

        let first = execute_attempt(&runner, "v1").await;
        assert!(!first.success);
        assert_eq!((first.passed, first.failed), (2, 1));

        let second = execute_attempt(&runner, "v2").await;
        assert!(second.success);
        assert_eq!(second.passed, 3);

        assert_eq!(runner.executed(), vec!["v1", "v2"]);
        let exhausted = execute_attempt(&runner, "v3").await;
        assert_eq!(exhausted.errored, 1);
    }
}
