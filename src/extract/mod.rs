//! Screenshot extraction from Xcode result bundles.
//!
//! The pipeline, run once per target after its test run:
//! 1. [`manifest`] picks the newest `.xcresult` listed in `Logs/Test`
//! 2. [`ResultBundle`] lists the leaf tests of every test plan configuration
//! 3. [`payload`] resolves each test's screenshot attachment bytes
//! 4. [`export`] writes them under a descriptive file name

pub mod bundle;
pub mod export;
pub mod manifest;
pub mod payload;
pub mod types;
pub mod xcresult;

pub use bundle::ResultBundle;
pub use export::{ExportWriter, normalize_test_name, screenshot_file_name};
pub use manifest::{MANIFEST_FILE_NAME, ResultManifest, locate_result_bundle};
pub use payload::{resolve_payload, screenshot_payload_id};
pub use types::{
    ActionRecord, ActionTestSummary, ActivitySummary, Attachment, ExportedScreenshot, ExtractError,
    ExtractResult, Field, InvocationRecord, ItemContext, LeafTest, Reference, TestGroup,
    TestPlanSummary, TestableSummary,
};
pub use xcresult::XcResultFile;

use tracing::{error, info};

use crate::device::Target;

/// How item-level failures affect the rest of a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Stop at the first failing summary or test instead of moving on to its siblings
    pub fail_fast: bool,
}

/// Outcome of one extraction pass
#[derive(Debug, Default)]
pub struct Extraction {
    pub exported: Vec<ExportedScreenshot>,
    /// Item-level failures, in encounter order
    pub failures: Vec<ExtractError>,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Export every screenshot recorded in `bundle` for `target`
///
/// Bundle-level problems (no test plan, unreadable bundle) fail the whole
/// pass before anything is written. Item-level problems are collected in
/// [`Extraction::failures`]; with `fail_fast` the pass stops at the first one.
pub fn extract_screenshots(
    bundle: &dyn ResultBundle,
    target: &Target,
    writer: &ExportWriter,
    options: ExtractOptions,
) -> ExtractResult<Extraction> {
    info!("Extracting and renaming screenshots for {}", target);
    let summaries = bundle.test_plan_summaries()?;
    let mut extraction = Extraction::default();

    for (index, summary) in summaries.iter().enumerate() {
        let Some(summary_name) = summary.name.as_deref() else {
            let context = ItemContext::summary(format!("test plan summary #{}", index + 1));
            record_failure(&mut extraction, ExtractError::missing(context, Field::SummaryName), options)?;
            continue;
        };
        info!("Extraction for the configuration {} in progress", summary_name);

        for (position, test) in summary.screenshot_tests().iter().enumerate() {
            match export_test(bundle, target, writer, summary_name, position, test) {
                Ok(exported) => extraction.exported.push(exported),
                Err(err) if err.is_item_failure() => {
                    record_failure(&mut extraction, err, options)?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(extraction)
}

/// Log and keep an item failure; under fail-fast hand it back as the pass error
fn record_failure(extraction: &mut Extraction, err: ExtractError, options: ExtractOptions) -> ExtractResult<()> {
    error!("{}", err);
    if options.fail_fast {
        return Err(err);
    }
    extraction.failures.push(err);
    Ok(())
}

fn export_test(
    bundle: &dyn ResultBundle,
    target: &Target,
    writer: &ExportWriter,
    summary_name: &str,
    position: usize,
    test: &LeafTest,
) -> ExtractResult<ExportedScreenshot> {
    let Some(test_name) = test.name.as_deref() else {
        let context = ItemContext::test(summary_name, format!("test #{}", position + 1));
        return Err(ExtractError::missing(context, Field::TestName));
    };
    info!("Extraction of {} in progress", normalize_test_name(test_name));

    let context = ItemContext::test(summary_name, test_name);
    let data = resolve_payload(bundle, test, &context)?;
    writer.export(
        target.screen_description(),
        summary_name,
        test_name,
        target.file_id(),
        &data,
    )
}
