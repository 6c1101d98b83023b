//! External tool invocation: `simctl`, `xcodebuild` and the command seam they share.

pub mod command;
pub mod scripted;
pub mod simctl;
pub mod xcodebuild;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use scripted::ScriptedRunner;
pub use simctl::{Simctl, Simulator, SimulatorList, SimulatorState};
pub use xcodebuild::{TestPlanRun, Xcodebuild};

use thiserror::Error;

/// Errors raised while driving external tools
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {exit_code}")]
    Failed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("cannot decode output of `{command}`: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ProcessResult<T> = Result<T, ProcessError>;

/// Run `spec`, mapping a launch failure into [`ProcessError::Launch`]
pub(crate) fn launch(runner: &dyn CommandRunner, spec: &CommandSpec) -> ProcessResult<CommandOutput> {
    runner.run(spec).map_err(|source| ProcessError::Launch {
        command: spec.to_string(),
        source,
    })
}

/// Run `spec` and require a zero exit code
pub(crate) fn run_checked(runner: &dyn CommandRunner, spec: &CommandSpec) -> ProcessResult<CommandOutput> {
    let output = launch(runner, spec)?;
    if output.success() {
        Ok(output)
    } else {
        Err(ProcessError::Failed {
            command: spec.to_string(),
            exit_code: output.exit_code(),
            stderr: output.stderr,
        })
    }
}
