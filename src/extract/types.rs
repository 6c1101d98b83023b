// Result bundle records and extraction errors

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Root record of a result bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationRecord {
    /// Actions (build, test, ...) in execution order
    pub actions: Vec<ActionRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRecord {
    /// Reference to the action's test plan run summaries
    pub tests_ref: Option<Reference>,
}

/// Identifier of another object stored in the bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: String,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One configuration run of the test plan (a device/OS combination)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestPlanSummary {
    pub name: Option<String>,
    pub testable_summaries: Vec<TestableSummary>,
}

impl TestPlanSummary {
    /// Leaf tests at `testableSummaries[0].tests[0].subtestGroups[0].subtestGroups[0].subtests`
    ///
    /// Empty when any step of the path is absent.
    pub fn screenshot_tests(&self) -> &[LeafTest] {
        self.testable_summaries
            .first()
            .and_then(|s| s.tests.first())
            .and_then(|bundle| bundle.subtest_groups.first())
            .and_then(|suite| suite.subtest_groups.first())
            .map(|class| class.subtests.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestableSummary {
    pub tests: Vec<TestGroup>,
}

/// A node of the test hierarchy (test bundle, suite or class)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestGroup {
    pub name: Option<String>,
    pub subtest_groups: Vec<TestGroup>,
    pub subtests: Vec<LeafTest>,
}

/// An executed test method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafTest {
    pub name: Option<String>,
    /// Reference to the test's detailed activity log
    pub summary_ref: Option<Reference>,
}

impl LeafTest {
    pub fn new(name: impl Into<String>, summary_id: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            summary_ref: Some(Reference::new(summary_id)),
        }
    }
}

/// Detailed activity log of one test
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTestSummary {
    pub activity_summaries: Vec<ActivitySummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySummary {
    pub activity_type: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    pub name: Option<String>,
    pub payload_ref: Option<Reference>,
}

/// A screenshot written to the export folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedScreenshot {
    /// Test plan configuration the screenshot belongs to
    pub summary: String,
    /// Raw test method name
    pub test: String,
    /// Normalized label used in the file name
    pub label: String,
    pub path: PathBuf,
    /// Payload size in bytes
    pub size: usize,
    /// Pixel dimensions, when the payload is a decodable image
    pub dimensions: Option<(u32, u32)>,
}

// ============================================================================
// Errors
// ============================================================================

/// Required field that was absent from the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SummaryName,
    TestName,
    SummaryRef,
    TestSummary,
    AttachmentContainer,
    PayloadRef,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Field::SummaryName => "summary name",
            Field::TestName => "test name",
            Field::SummaryRef => "summary id",
            Field::TestSummary => "test activity summary",
            Field::AttachmentContainer => "attachment container activity",
            Field::PayloadRef => "payload id",
        };
        f.write_str(text)
    }
}

/// Where in the bundle an item-level failure happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemContext {
    /// Configuration name, or its position when unnamed
    pub summary: String,
    /// Test name, or its position when unnamed; `None` for summary-level failures
    pub test: Option<String>,
}

impl ItemContext {
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            test: None,
        }
    }

    pub fn test(summary: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            test: Some(test.into()),
        }
    }
}

impl fmt::Display for ItemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.test {
            Some(test) => write!(f, "{} for {}", self.summary, test),
            None => f.write_str(&self.summary),
        }
    }
}

/// Result type for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Error types for extraction operations
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot decode result manifest {}: {reason}", path.display())]
    ManifestDecode { path: PathBuf, reason: String },

    #[error("no result bundle ending in {suffix} listed in {}", path.display())]
    NoResultBundleFound { path: PathBuf, suffix: String },

    #[error("no test plan found in {}", path.display())]
    NoTestPlanFound { path: PathBuf },

    #[error("cannot get {field} from {context}")]
    MissingField { context: ItemContext, field: Field },

    #[error("cannot get data from the screenshot of {context}")]
    PayloadFetch { context: ItemContext },

    #[error("cannot write screenshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("result bundle query `{command}` failed: {reason}")]
    BundleQuery { command: String, reason: String },
}

impl ExtractError {
    /// Whether the error concerns a single summary or test rather than the whole bundle
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            ExtractError::MissingField { .. } | ExtractError::PayloadFetch { .. } | ExtractError::Write { .. }
        )
    }

    pub fn missing(context: ItemContext, field: Field) -> Self {
        ExtractError::MissingField { context, field }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(subtest_groups: Vec<TestGroup>, subtests: Vec<LeafTest>) -> TestGroup {
        TestGroup {
            name: None,
            subtest_groups,
            subtests,
        }
    }

    fn summary_with(tests: Vec<TestGroup>) -> TestPlanSummary {
        TestPlanSummary {
            name: Some("iPhone 14".to_string()),
            testable_summaries: vec![TestableSummary { tests }],
        }
    }

    #[test]
    fn test_screenshot_tests_follows_first_groups() {
        let leaves = vec![
            LeafTest::new("testMainScreenshot()", "0~a"),
            LeafTest::new("testDetailScreenshot()", "0~b"),
        ];
        let class = group(vec![], leaves.clone());
        let ignored = group(vec![], vec![LeafTest::new("testOther()", "0~z")]);
        let suite = group(vec![class, ignored], vec![]);
        let summary = summary_with(vec![group(vec![suite], vec![])]);

        assert_eq!(summary.screenshot_tests(), leaves.as_slice());
    }

    #[test]
    fn test_screenshot_tests_empty_when_path_absent() {
        assert!(TestPlanSummary::default().screenshot_tests().is_empty());
        assert!(summary_with(vec![]).screenshot_tests().is_empty());
        // Leaves one level too shallow are not reached
        let shallow = group(vec![group(vec![], vec![LeafTest::new("testA()", "1")])], vec![]);
        assert!(summary_with(vec![shallow]).screenshot_tests().is_empty());
    }

    #[test]
    fn test_error_messages_name_the_item() {
        let err = ExtractError::missing(
            ItemContext::test("iPhone 14", "testMainScreenshot()"),
            Field::PayloadRef,
        );
        assert_eq!(err.to_string(), "cannot get payload id from iPhone 14 for testMainScreenshot()");
        assert!(err.is_item_failure());

        let err = ExtractError::NoTestPlanFound {
            path: PathBuf::from("Logs/Test/Run1.xcresult"),
        };
        assert_eq!(err.to_string(), "no test plan found in Logs/Test/Run1.xcresult");
        assert!(!err.is_item_failure());
    }
}
