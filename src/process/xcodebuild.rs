//! UI test plan execution through `xcodebuild test`.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{CommandRunner, CommandSpec, ProcessError, ProcessResult, launch};

/// Stdout prefixes worth echoing from an `xcodebuild test` run
const PROGRESS_PREFIXES: &[&str] = &["Test Suite", "Test Case", "t =", "**"];

/// One `xcodebuild test` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPlanRun {
    pub scheme: String,
    pub test_plan: String,
    /// Value for `-destination`, e.g. `platform=iOS Simulator,id=<udid>`
    pub destination: String,
    pub derived_data_dir: PathBuf,
    /// Directory holding the Xcode project
    pub project_dir: PathBuf,
}

/// Wrapper over the `xcodebuild` executable
pub struct Xcodebuild<'a> {
    runner: &'a dyn CommandRunner,
    program: String,
}

impl<'a> Xcodebuild<'a> {
    pub fn new(runner: &'a dyn CommandRunner, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Build the command line for `run`
    pub fn command(&self, run: &TestPlanRun) -> CommandSpec {
        CommandSpec::new(&self.program)
            .arg("test")
            .args(["-scheme", run.scheme.as_str()])
            .args(["-destination", run.destination.as_str()])
            .arg("-derivedDataPath")
            .arg(run.derived_data_dir.to_string_lossy())
            .args(["-testPlan", run.test_plan.as_str()])
            .current_dir(&run.project_dir)
    }

    /// Run the test plan once
    pub fn run_once(&self, run: &TestPlanRun) -> ProcessResult<()> {
        let spec = self.command(run);
        debug!("Running {}", spec);
        let output = launch(self.runner, &spec)?;

        for line in output.stdout.lines().filter(|l| is_progress_line(l)) {
            info!("    {}", line);
        }
        for line in output.stderr.lines().filter(|l| is_error_line(l)) {
            warn!("    {}", line);
        }

        if output.success() {
            Ok(())
        } else {
            Err(ProcessError::Failed {
                command: spec.to_string(),
                exit_code: output.exit_code(),
                stderr: output.stderr,
            })
        }
    }

    /// Run the test plan, re-running it from scratch after a non-zero exit
    ///
    /// Makes at most `attempts` invocations and returns how many were needed.
    /// Failing to launch `xcodebuild` at all is not retried.
    pub fn run_with_retries(&self, run: &TestPlanRun, attempts: u32) -> ProcessResult<u32> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                warn!("Previous test run failed, retrying. Attempt {}/{}", attempt, attempts);
            }
            match self.run_once(run) {
                Ok(()) => return Ok(attempt),
                Err(ProcessError::Failed { command, exit_code, stderr }) => {
                    warn!("Test run failed with code: {}", exit_code);
                    if attempt >= attempts {
                        return Err(ProcessError::Failed { command, exit_code, stderr });
                    }
                }
                Err(other) => return Err(other),
            }
            attempt += 1;
        }
    }
}

fn is_progress_line(line: &str) -> bool {
    PROGRESS_PREFIXES.iter().any(|p| line.starts_with(p))
}

fn is_error_line(line: &str) -> bool {
    line.to_lowercase().contains("error")
}
