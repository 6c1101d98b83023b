use std::path::PathBuf;
use thiserror::Error;

use crate::config::Config;
use crate::device::{DeviceProfile, Target};
use crate::extract::ExtractError;
use crate::process::ProcessError;

/// Configuration for one harness execution
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory holding the Xcode project (a leading `~` is expanded)
    pub project_dir: PathBuf,

    /// Targets to process, in order
    pub targets: Vec<Target>,

    /// Tool, folder and test plan settings
    pub config: Config,

    /// Stop a target's extraction at its first failing screenshot
    pub fail_fast: bool,
}

impl HarnessConfig {
    pub fn new(project_dir: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            project_dir: project_dir.into(),
            targets: Vec::new(),
            config,
            fail_fast: false,
        }
    }

    pub fn targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Simulator devices among the targets, in target order
    pub fn devices(&self) -> Vec<&'static DeviceProfile> {
        self.targets.iter().filter_map(Target::device).collect()
    }
}

/// Resolve simulator names (plus the Mac when `mac` is set) into targets
pub fn resolve_targets<I, S>(names: I, mac: bool) -> HarnessResult<Vec<Target>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut targets = Vec::new();
    for name in names {
        let target = name.as_ref().parse::<Target>().map_err(|_| HarnessError::UnknownDevice {
            name: name.as_ref().to_string(),
        })?;
        targets.push(target);
    }
    if mac && !targets.contains(&Target::Mac) {
        targets.push(Target::Mac);
    }
    Ok(targets)
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error types for harness operations
#[derive(Error, Debug)]
pub enum HarnessError {
    /// `xcodebuild test` kept failing after every attempt
    #[error("`{command}` failed with exit code {exit_code}")]
    ExternalProcess { command: String, exit_code: i32 },

    #[error("project folder not found: {}", path.display())]
    ProjectNotFound { path: PathBuf },

    #[error("no scheme given; pass --scheme or set MARKETING_SCREENSHOTS_SCHEME")]
    MissingScheme,

    #[error("unknown device '{name}'; run `marketing-screenshots devices` for the supported list")]
    UnknownDevice { name: String },

    #[error("cannot get the simulator identifier of {name}")]
    MissingSimulatorId { name: String },

    #[error("simulator error: {0}")]
    Simulator(#[source] ProcessError),

    /// `xcodebuild` could not be started at all
    #[error("cannot run the test plan: {0}")]
    TestRun(#[source] ProcessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction failed for {target}: {source}")]
    Extraction {
        target: String,
        #[source]
        source: ExtractError,
    },

    #[error("{} screenshot(s) could not be extracted for {target}", failures.len())]
    IncompleteExtraction { target: String, failures: Vec<String> },
}

impl HarnessError {
    pub(crate) fn extraction(target: &Target, source: ExtractError) -> Self {
        HarnessError::Extraction {
            target: target.to_string(),
            source,
        }
    }
}

impl From<ProcessError> for HarnessError {
    /// A test run failure; simulator failures are wrapped explicitly
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Failed { command, exit_code, .. } => HarnessError::ExternalProcess { command, exit_code },
            other => HarnessError::TestRun(other),
        }
    }
}
