//! Reader for `Logs/Test/LogStoreManifest.plist`.
//!
//! The manifest lists every result bundle written into a derived data folder.
//! Its layout is a root dictionary holding a dictionary of log entries, each
//! entry a dictionary whose string values include the bundle file name:
//!
//! ```text
//! dict
//! └── logs: dict
//!     └── <uuid>: dict
//!         ├── fileName: "Test-Marketing-2023.01.10_10-12-31-+0100.xcresult"
//!         └── title: "Test HelloWorldSample (iOS)"
//! ```

use std::io::Cursor;
use std::path::{Path, PathBuf};

use plist::Value;

use super::types::{ExtractError, ExtractResult};
use crate::config::RESULT_BUNDLE_SUFFIX;
use crate::workspace::Workspace;

/// File name of the manifest inside `Logs/Test`
pub const MANIFEST_FILE_NAME: &str = "LogStoreManifest.plist";

/// Decoded manifest: every candidate string, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultManifest {
    pub entries: Vec<String>,
}

impl ResultManifest {
    /// Read and decode the manifest at `path`
    pub fn from_file(path: &Path) -> ExtractResult<Self> {
        let value = Value::from_file(path).map_err(|e| decode_error(path, e.to_string()))?;
        Self::from_value(path, &value)
    }

    /// Decode a manifest held in memory (XML or binary property list)
    pub fn from_bytes(path: &Path, data: &[u8]) -> ExtractResult<Self> {
        let value = Value::from_reader(Cursor::new(data)).map_err(|e| decode_error(path, e.to_string()))?;
        Self::from_value(path, &value)
    }

    fn from_value(path: &Path, value: &Value) -> ExtractResult<Self> {
        let root = value
            .as_dictionary()
            .ok_or_else(|| decode_error(path, "root is not a dictionary".to_string()))?;

        let mut entries = Vec::new();
        for logs in root.values().filter_map(Value::as_dictionary) {
            for entry in logs.values().filter_map(Value::as_dictionary) {
                for field in entry.values() {
                    collect_strings(field, &mut entries);
                }
            }
        }
        Ok(Self { entries })
    }

    /// Lexicographically greatest entry ending in `suffix`
    pub fn latest(&self, suffix: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|name| name.ends_with(suffix))
            .max()
            .map(String::as_str)
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            out.extend(items.iter().filter_map(Value::as_string).map(str::to_string));
        }
        _ => {}
    }
}

fn decode_error(path: &Path, reason: String) -> ExtractError {
    ExtractError::ManifestDecode {
        path: path.to_path_buf(),
        reason,
    }
}

/// Locate the newest result bundle listed in the workspace's test log manifest
pub fn locate_result_bundle(workspace: &Workspace) -> ExtractResult<PathBuf> {
    let manifest_path = workspace.manifest_path();
    let manifest = ResultManifest::from_file(&manifest_path)?;
    let name = manifest
        .latest(RESULT_BUNDLE_SUFFIX)
        .ok_or_else(|| ExtractError::NoResultBundleFound {
            path: manifest_path.clone(),
            suffix: RESULT_BUNDLE_SUFFIX.to_string(),
        })?;
    Ok(workspace.result_bundle_path(name))
}
