//! Types for screenshot run results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::device::Target;
use crate::extract::ExportedScreenshot;

/// Outcome of one target (simulator or Mac)
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    /// Simulator name, or `macOS`
    pub target: String,

    pub screen_description: String,

    /// Result bundle the screenshots came from
    pub result_bundle: Option<PathBuf>,

    /// `xcodebuild test` invocations made (0 for extraction-only runs)
    pub attempts: u32,

    pub screenshots: Vec<ExportedScreenshot>,

    /// Human-readable description of every item that could not be exported
    pub failures: Vec<String>,

    pub success: bool,
}

impl TargetReport {
    pub fn new(target: &Target) -> Self {
        Self {
            target: target.display_name().to_string(),
            screen_description: target.screen_description().to_string(),
            result_bundle: None,
            attempts: 0,
            screenshots: Vec::new(),
            failures: Vec::new(),
            success: false,
        }
    }
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Whether every target completed without failures
    pub success: bool,

    /// Error message if the run stopped early
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Machine the run happened on
    pub host: String,

    pub project_dir: PathBuf,
    pub export_dir: PathBuf,

    /// Targets in the order they were processed
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    pub fn start(project_dir: impl Into<PathBuf>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            success: false,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
            host: host_name(),
            project_dir: project_dir.into(),
            export_dir: export_dir.into(),
            targets: Vec::new(),
        }
    }

    /// Stamp the end time and derive overall success
    pub fn finish(&mut self, error: Option<String>) {
        self.finished_at = Some(Utc::now());
        self.success = error.is_none() && self.targets.iter().all(|t| t.success);
        self.error = error;
    }

    /// Process exit status for the run; the error itself is already part of the report
    pub fn exit_code(&self) -> i32 {
        if self.success { 0 } else { 1 }
    }

    pub fn screenshot_count(&self) -> usize {
        self.targets.iter().map(|t| t.screenshots.len()).sum()
    }

    /// Plain-text summary for the terminal
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let status = if self.success { "completed" } else { "FAILED" };
        let _ = writeln!(
            out,
            "Run {}: {} screenshots from {} target(s)",
            status,
            self.screenshot_count(),
            self.targets.len()
        );

        for target in &self.targets {
            let mark = if target.success { "ok" } else { "failed" };
            let _ = write!(out, "  {} ({}) [{}]", target.target, target.screen_description, mark);
            if target.attempts > 1 {
                let _ = write!(out, " after {} attempts", target.attempts);
            }
            out.push('\n');

            for shot in &target.screenshots {
                match shot.dimensions {
                    Some((w, h)) => {
                        let _ = writeln!(out, "    {} {}x{}: {}", shot.label, w, h, shot.path.display());
                    }
                    None => {
                        let _ = writeln!(out, "    {}: {}", shot.label, shot.path.display());
                    }
                }
            }
            for failure in &target.failures {
                let _ = writeln!(out, "    error: {}", failure);
            }
        }

        if let Some(error) = &self.error {
            let _ = writeln!(out, "Error: {}", error);
        }
        let _ = write!(out, "Screenshots: {}", self.export_dir.display());
        out
    }
}

fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}
