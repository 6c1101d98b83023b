//! Marketing Screenshots - App Store screenshots from Xcode UI test runs.
//!
//! This crate provides:
//! - A device catalog of supported simulators plus the host Mac
//! - Simulator lifecycle and `xcodebuild test` runs with bounded retries
//! - Screenshot extraction from `.xcresult` result bundles
//! - Run reports as text or JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use marketing_screenshots::{Config, HarnessConfig, resolve_targets, run_harness};
//! use marketing_screenshots::process::SystemRunner;
//!
//! let config = HarnessConfig::new("~/Projects/HelloWorld", Config::from_env().scheme("HelloWorld (iOS)"))
//!     .targets(resolve_targets(["iPhone 14 Plus"], true).unwrap());
//! let report = run_harness(&config, &SystemRunner).unwrap();
//! println!("{}", report.summary());
//! ```

pub mod config;
pub mod device;
pub mod extract;
pub mod harness;
pub mod process;
pub mod report;
pub mod workspace;

// Re-export configuration
pub use config::{Config, FolderSettings, ToolSettings};

// Re-export device catalog
pub use device::{DEVICES, DeviceProfile, Target, find_device};

// Re-export extraction entry points
pub use extract::{
    ExportWriter, ExportedScreenshot, ExtractError, ExtractOptions, ExtractResult, Extraction,
    ResultBundle, ResultManifest, XcResultFile, extract_screenshots, locate_result_bundle,
};

// Re-export harness types
pub use harness::{Harness, HarnessConfig, HarnessError, HarnessResult, resolve_targets, run_extraction, run_harness};

// Re-export report types
pub use report::{RunReport, TargetReport};

// Re-export workspace
pub use workspace::Workspace;
