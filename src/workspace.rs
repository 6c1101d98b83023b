//! Project working folders.
//!
//! A run works inside the Xcode project directory:
//! - `.DerivedDataMarketing` receives `xcodebuild` output, including `Logs/Test`
//! - `.ExportedScreenshots` receives the renamed screenshots
//!
//! Both names come from [`FolderSettings`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::FolderSettings;
use crate::extract::MANIFEST_FILE_NAME;

/// Resolved working folders of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Directory holding the Xcode project
    pub project_dir: PathBuf,
    /// Where screenshots are exported
    pub export_dir: PathBuf,
    /// `-derivedDataPath` handed to `xcodebuild`
    pub derived_data_dir: PathBuf,
}

impl Workspace {
    pub fn new(project_dir: impl Into<PathBuf>, folders: &FolderSettings) -> Self {
        let project_dir = project_dir.into();
        Self {
            export_dir: project_dir.join(&folders.export_dir),
            derived_data_dir: project_dir.join(&folders.derived_data_dir),
            project_dir,
        }
    }

    /// Resolve `path` (expanding a leading `~`) and require it to be a directory
    pub fn open(path: &str, folders: &FolderSettings) -> io::Result<Self> {
        let project_dir = expand_tilde(path);
        if !project_dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("project folder not found: {}", project_dir.display()),
            ));
        }
        Ok(Self::new(project_dir, folders))
    }

    /// Start from an empty export folder
    ///
    /// Removes any previous export folder, then creates it. Parent
    /// directories are not created.
    pub fn prepare(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.export_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        fs::create_dir(&self.export_dir)
    }

    /// Create the export folder if missing, keeping its contents
    pub fn ensure_export_dir(&self) -> io::Result<()> {
        if self.export_dir.is_dir() {
            return Ok(());
        }
        fs::create_dir(&self.export_dir)
    }

    /// `Logs/Test` inside derived data
    pub fn test_logs_dir(&self) -> PathBuf {
        self.derived_data_dir.join("Logs").join("Test")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.test_logs_dir().join(MANIFEST_FILE_NAME)
    }

    pub fn result_bundle_path(&self, name: &str) -> PathBuf {
        self.test_logs_dir().join(name)
    }
}

/// Expand a leading `~` to the home directory
fn expand_tilde(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(rest.trim_start_matches('/')),
        _ => Path::new(path).to_path_buf(),
    }
}
