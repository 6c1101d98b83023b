use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use image::io::Reader as ImageReader;
use tracing::{info, warn};

use super::types::{ExportedScreenshot, ExtractError, ExtractResult};

/// Turn a test method name into a screenshot label
///
/// `testLoginScreenshot()` becomes `Login`.
pub fn normalize_test_name(name: &str) -> String {
    name.replace("test", "").replace("Screenshot()", "")
}

/// File name of an exported screenshot
pub fn screenshot_file_name(screen: &str, summary: &str, label: &str, target_id: &str) -> String {
    format!("Screenshot - {} - {} - {} - {}.png", screen, summary, label, target_id)
}

/// Writes screenshots into an existing export folder
#[derive(Debug, Clone)]
pub struct ExportWriter {
    export_dir: PathBuf,
}

impl ExportWriter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    /// Write `data` as `file_name`, replacing any previous file of that name
    ///
    /// The export folder is not created here.
    pub fn write(&self, file_name: &str, data: &[u8]) -> ExtractResult<PathBuf> {
        let path = self.export_dir.join(file_name);
        fs::write(&path, data).map_err(|source| ExtractError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Write one test's screenshot and describe the result
    pub fn export(
        &self,
        screen: &str,
        summary: &str,
        test: &str,
        target_id: &str,
        data: &[u8],
    ) -> ExtractResult<ExportedScreenshot> {
        let label = normalize_test_name(test);
        let file_name = screenshot_file_name(screen, summary, &label, target_id);
        let path = self.write(&file_name, data)?;

        let dimensions = image_dimensions(data);
        match dimensions {
            Some((w, h)) => info!("{} ({}x{}) is available here: {}", label, w, h, path.display()),
            None => {
                warn!("{} payload is not a readable image", label);
                info!("{} is available here: {}", label, path.display());
            }
        }

        Ok(ExportedScreenshot {
            summary: summary.to_string(),
            test: test.to_string(),
            label,
            path,
            size: data.len(),
            dimensions,
        })
    }
}

/// Pixel size from the image header, without decoding pixel data
fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
