//! Configuration management with environment variable support.
//!
//! Every value has a compiled-in default and can be overridden through an
//! environment variable. Command-line flags (see `main.rs`) take precedence
//! over both.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `MARKETING_SCREENSHOTS_SCHEME` | Xcode scheme to test | (none) |
//! | `MARKETING_SCREENSHOTS_TEST_PLAN` | Test plan producing the screenshots | `Marketing` |
//! | `MARKETING_SCREENSHOTS_RETRIES` | Attempts per `xcodebuild test` run | `5` |
//! | `MARKETING_SCREENSHOTS_EXPORT_DIR` | Export folder name inside the project | `.ExportedScreenshots` |
//! | `MARKETING_SCREENSHOTS_DERIVED_DATA_DIR` | Derived data folder name inside the project | `.DerivedDataMarketing` |
//! | `MARKETING_SCREENSHOTS_XCRUN` | `xcrun` executable | `/usr/bin/xcrun` |
//! | `MARKETING_SCREENSHOTS_XCODEBUILD` | `xcodebuild` executable | `/usr/bin/xcodebuild` |
//! | `MARKETING_SCREENSHOTS_XCRESULTTOOL_LEGACY` | Pass `--legacy` to `xcresulttool` | `true` |
//!
//! # Example
//!
//! ```bash
//! export MARKETING_SCREENSHOTS_SCHEME="HelloWorldSample (iOS)"
//! export MARKETING_SCREENSHOTS_RETRIES=3
//! ```

use std::env;

// ============================================================================
// Default Values
// ============================================================================

/// Default test plan name
pub const DEFAULT_TEST_PLAN: &str = "Marketing";

/// Default number of `xcodebuild test` attempts per target
pub const DEFAULT_TEST_ATTEMPTS: u32 = 5;

/// Default export folder, relative to the project directory
pub const DEFAULT_EXPORT_DIR: &str = ".ExportedScreenshots";

/// Default derived data folder, relative to the project directory
pub const DEFAULT_DERIVED_DATA_DIR: &str = ".DerivedDataMarketing";

/// Default `xcrun` executable
pub const DEFAULT_XCRUN: &str = "/usr/bin/xcrun";

/// Default `xcodebuild` executable
pub const DEFAULT_XCODEBUILD: &str = "/usr/bin/xcodebuild";

/// File suffix of result bundles listed in the log store manifest
pub const RESULT_BUNDLE_SUFFIX: &str = ".xcresult";

/// Activity type tagging the activity that holds a test's attachments
pub const ATTACHMENT_CONTAINER_ACTIVITY: &str = "com.apple.dt.xctest.activity-type.attachmentContainer";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the Xcode scheme
pub const ENV_SCHEME: &str = "MARKETING_SCREENSHOTS_SCHEME";

/// Environment variable for the test plan
pub const ENV_TEST_PLAN: &str = "MARKETING_SCREENSHOTS_TEST_PLAN";

/// Environment variable for the number of test attempts
pub const ENV_RETRIES: &str = "MARKETING_SCREENSHOTS_RETRIES";

/// Environment variable for the export folder name
pub const ENV_EXPORT_DIR: &str = "MARKETING_SCREENSHOTS_EXPORT_DIR";

/// Environment variable for the derived data folder name
pub const ENV_DERIVED_DATA_DIR: &str = "MARKETING_SCREENSHOTS_DERIVED_DATA_DIR";

/// Environment variable for the `xcrun` executable
pub const ENV_XCRUN: &str = "MARKETING_SCREENSHOTS_XCRUN";

/// Environment variable for the `xcodebuild` executable
pub const ENV_XCODEBUILD: &str = "MARKETING_SCREENSHOTS_XCODEBUILD";

/// Environment variable toggling `xcresulttool --legacy`
pub const ENV_XCRESULTTOOL_LEGACY: &str = "MARKETING_SCREENSHOTS_XCRESULTTOOL_LEGACY";

// ============================================================================
// Configuration
// ============================================================================

/// Centralized configuration for a screenshot run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Xcode scheme to test (required for `run`, unused by `extract`)
    pub scheme: Option<String>,
    /// Test plan producing the screenshots
    pub test_plan: String,
    /// How many times `xcodebuild test` is attempted before giving up
    pub test_attempts: u32,
    /// Layout of the project's working folders
    pub folders: FolderSettings,
    /// External tool locations
    pub tools: ToolSettings,
}

/// Working folder names, relative to the project directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSettings {
    pub export_dir: String,
    pub derived_data_dir: String,
}

/// External executables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub xcrun: String,
    pub xcodebuild: String,
    /// Xcode 16 moved the object API of `xcresulttool` behind `--legacy`
    pub xcresulttool_legacy: bool,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            scheme: env::var(ENV_SCHEME).ok().filter(|s| !s.is_empty()),
            test_plan: env::var(ENV_TEST_PLAN).unwrap_or_else(|_| DEFAULT_TEST_PLAN.to_string()),
            test_attempts: parse_attempts(env::var(ENV_RETRIES).ok().as_deref()),
            folders: FolderSettings::from_env(),
            tools: ToolSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            scheme: None,
            test_plan: DEFAULT_TEST_PLAN.to_string(),
            test_attempts: DEFAULT_TEST_ATTEMPTS,
            folders: FolderSettings::defaults(),
            tools: ToolSettings::defaults(),
        }
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn test_plan(mut self, test_plan: impl Into<String>) -> Self {
        self.test_plan = test_plan.into();
        self
    }

    /// Set the number of attempts; zero is clamped to a single attempt
    pub fn test_attempts(mut self, attempts: u32) -> Self {
        self.test_attempts = attempts.max(1);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl FolderSettings {
    pub fn from_env() -> Self {
        Self {
            export_dir: env::var(ENV_EXPORT_DIR).unwrap_or_else(|_| DEFAULT_EXPORT_DIR.to_string()),
            derived_data_dir: env::var(ENV_DERIVED_DATA_DIR)
                .unwrap_or_else(|_| DEFAULT_DERIVED_DATA_DIR.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            export_dir: DEFAULT_EXPORT_DIR.to_string(),
            derived_data_dir: DEFAULT_DERIVED_DATA_DIR.to_string(),
        }
    }
}

impl ToolSettings {
    pub fn from_env() -> Self {
        Self {
            xcrun: env::var(ENV_XCRUN).unwrap_or_else(|_| DEFAULT_XCRUN.to_string()),
            xcodebuild: env::var(ENV_XCODEBUILD).unwrap_or_else(|_| DEFAULT_XCODEBUILD.to_string()),
            xcresulttool_legacy: parse_flag(env::var(ENV_XCRESULTTOOL_LEGACY).ok().as_deref(), true),
        }
    }

    pub fn defaults() -> Self {
        Self {
            xcrun: DEFAULT_XCRUN.to_string(),
            xcodebuild: DEFAULT_XCODEBUILD.to_string(),
            xcresulttool_legacy: true,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse an attempt count, falling back to the default on absent or invalid input
fn parse_attempts(value: Option<&str>) -> u32 {
    value
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_TEST_ATTEMPTS)
}

fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
