//! Result bundle access through `xcrun xcresulttool`.
//!
//! `xcresulttool get --format json` prints objects in a self-describing form:
//! every object carries a `_type`, scalars are wrapped as `{"_value": "..."}`
//! and arrays as `{"_values": [...]}`. The raw serde types below mirror that
//! form and are converted into the plain records of [`super::types`].

use once_cell::unsync::OnceCell;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::bundle::ResultBundle;
use super::types::{
    ActionRecord, ActionTestSummary, ActivitySummary, Attachment, ExtractError, ExtractResult,
    InvocationRecord, LeafTest, Reference, TestGroup, TestPlanSummary, TestableSummary,
};
use crate::process::{CommandRunner, CommandSpec};

const GROUP_TYPE: &str = "ActionTestSummaryGroup";
const METADATA_TYPE: &str = "ActionTestMetadata";

/// A result bundle on disk, queried lazily through `xcresulttool`
pub struct XcResultFile<'a> {
    path: PathBuf,
    runner: &'a dyn CommandRunner,
    xcrun: String,
    /// Pass `--legacy` (required by Xcode 16 and later for the object API)
    legacy: bool,
    invocation: OnceCell<Option<InvocationRecord>>,
}

impl<'a> XcResultFile<'a> {
    pub fn new(path: impl Into<PathBuf>, runner: &'a dyn CommandRunner, xcrun: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            runner,
            xcrun: xcrun.into(),
            legacy: true,
            invocation: OnceCell::new(),
        }
    }

    pub fn legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    fn tool_command(&self, verb: &str) -> CommandSpec {
        let spec = CommandSpec::new(&self.xcrun).args(["xcresulttool", verb]);
        if self.legacy { spec.arg("--legacy") } else { spec }
    }

    fn get_command(&self, id: Option<&str>) -> CommandSpec {
        let spec = self
            .tool_command("get")
            .args(["--format", "json", "--path"])
            .arg(self.path.to_string_lossy());
        match id {
            Some(id) => spec.args(["--id", id]),
            None => spec,
        }
    }

    /// Fetch and decode one object; `Ok(None)` when the tool cannot find an `--id`
    ///
    /// A failed root query means the bundle itself is unreadable and is an error.
    fn get_object<T: DeserializeOwned>(&self, id: Option<&str>) -> ExtractResult<Option<T>> {
        let spec = self.get_command(id);
        debug!("Querying {}", spec);
        let output = self.runner.run(&spec).map_err(|e| query_error(&spec, e.to_string()))?;
        if !output.success() {
            let Some(id) = id else {
                return Err(query_error(
                    &spec,
                    format!("exit code {}: {}", output.exit_code(), output.stderr.trim()),
                ));
            };
            warn!(
                "xcresulttool could not read {} (exit code {}): {}",
                id,
                output.exit_code(),
                output.stderr.trim()
            );
            return Ok(None);
        }
        serde_json::from_str(&output.stdout)
            .map(Some)
            .map_err(|e| query_error(&spec, e.to_string()))
    }
}

impl ResultBundle for XcResultFile<'_> {
    fn path(&self) -> &Path {
        &self.path
    }

    fn invocation_record(&self) -> ExtractResult<Option<InvocationRecord>> {
        if let Some(record) = self.invocation.get() {
            return Ok(record.clone());
        }
        let record = self
            .get_object::<RawInvocationRecord>(None)?
            .map(InvocationRecord::from);
        Ok(self.invocation.get_or_init(|| record).clone())
    }

    fn test_plan_run_summaries(&self, id: &str) -> ExtractResult<Option<Vec<TestPlanSummary>>> {
        Ok(self
            .get_object::<RawPlanRunSummaries>(Some(id))?
            .map(|raw| values(raw.summaries).into_iter().map(TestPlanSummary::from).collect()))
    }

    fn action_test_summary(&self, id: &str) -> ExtractResult<Option<ActionTestSummary>> {
        Ok(self
            .get_object::<RawActionTestSummary>(Some(id))?
            .map(ActionTestSummary::from))
    }

    fn payload(&self, id: &str) -> ExtractResult<Option<Vec<u8>>> {
        let scratch = tempfile::tempdir().map_err(|e| ExtractError::BundleQuery {
            command: "xcresulttool export".to_string(),
            reason: format!("cannot create scratch directory: {}", e),
        })?;
        let output_path = scratch.path().join("payload");

        let spec = self
            .tool_command("export")
            .args(["--type", "file", "--path"])
            .arg(self.path.to_string_lossy())
            .args(["--id", id, "--output-path"])
            .arg(output_path.to_string_lossy());
        debug!("Exporting payload {}", id);

        let output = self.runner.run(&spec).map_err(|e| query_error(&spec, e.to_string()))?;
        if !output.success() {
            warn!(
                "xcresulttool could not export payload {} (exit code {}): {}",
                id,
                output.exit_code(),
                output.stderr.trim()
            );
            return Ok(None);
        }

        match fs::read(&output_path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(query_error(&spec, e.to_string())),
        }
    }
}

fn query_error(spec: &CommandSpec, reason: String) -> ExtractError {
    ExtractError::BundleQuery {
        command: spec.to_string(),
        reason,
    }
}

// ============================================================================
// Raw JSON form
// ============================================================================

#[derive(Deserialize)]
struct XcValue<T> {
    #[serde(rename = "_value")]
    value: T,
}

#[derive(Deserialize)]
struct XcArray<T> {
    #[serde(rename = "_values", default = "Vec::new")]
    values: Vec<T>,
}

#[derive(Deserialize)]
struct RawType {
    #[serde(rename = "_name")]
    name: String,
}

#[derive(Deserialize)]
struct RawReference {
    id: XcValue<String>,
}

#[derive(Deserialize)]
struct RawInvocationRecord {
    actions: Option<XcArray<RawActionRecord>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActionRecord {
    action_result: Option<RawActionResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActionResult {
    tests_ref: Option<RawReference>,
}

#[derive(Deserialize)]
struct RawPlanRunSummaries {
    summaries: Option<XcArray<RawPlanRunSummary>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlanRunSummary {
    name: Option<XcValue<String>>,
    testable_summaries: Option<XcArray<RawTestableSummary>>,
}

#[derive(Deserialize)]
struct RawTestableSummary {
    tests: Option<XcArray<RawTestNode>>,
}

/// Either a group (`ActionTestSummaryGroup`) or a test (`ActionTestMetadata`)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTestNode {
    #[serde(rename = "_type")]
    kind: Option<RawType>,
    name: Option<XcValue<String>>,
    summary_ref: Option<RawReference>,
    subtests: Option<XcArray<RawTestNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActionTestSummary {
    activity_summaries: Option<XcArray<RawActivity>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActivity {
    activity_type: Option<XcValue<String>>,
    attachments: Option<XcArray<RawAttachment>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttachment {
    name: Option<XcValue<String>>,
    payload_ref: Option<RawReference>,
}

fn values<T>(array: Option<XcArray<T>>) -> Vec<T> {
    array.map(|a| a.values).unwrap_or_default()
}

fn string(value: Option<XcValue<String>>) -> Option<String> {
    value.map(|v| v.value)
}

impl From<RawReference> for Reference {
    fn from(raw: RawReference) -> Self {
        Reference { id: raw.id.value }
    }
}

impl From<RawInvocationRecord> for InvocationRecord {
    fn from(raw: RawInvocationRecord) -> Self {
        InvocationRecord {
            actions: values(raw.actions)
                .into_iter()
                .map(|action| ActionRecord {
                    tests_ref: action
                        .action_result
                        .and_then(|result| result.tests_ref)
                        .map(Reference::from),
                })
                .collect(),
        }
    }
}

impl From<RawPlanRunSummary> for TestPlanSummary {
    fn from(raw: RawPlanRunSummary) -> Self {
        TestPlanSummary {
            name: string(raw.name),
            testable_summaries: values(raw.testable_summaries)
                .into_iter()
                .map(|testable| TestableSummary {
                    tests: values(testable.tests)
                        .into_iter()
                        .filter(RawTestNode::is_group)
                        .map(TestGroup::from)
                        .collect(),
                })
                .collect(),
        }
    }
}

impl RawTestNode {
    fn type_name(&self) -> &str {
        self.kind.as_ref().map(|k| k.name.as_str()).unwrap_or_default()
    }

    fn is_group(&self) -> bool {
        self.type_name() == GROUP_TYPE
    }

    fn is_test(&self) -> bool {
        self.type_name() == METADATA_TYPE
    }
}

impl From<RawTestNode> for TestGroup {
    fn from(raw: RawTestNode) -> Self {
        let mut group = TestGroup {
            name: string(raw.name),
            subtest_groups: Vec::new(),
            subtests: Vec::new(),
        };
        for child in values(raw.subtests) {
            if child.is_group() {
                group.subtest_groups.push(TestGroup::from(child));
            } else if child.is_test() {
                group.subtests.push(LeafTest {
                    name: string(child.name),
                    summary_ref: child.summary_ref.map(Reference::from),
                });
            }
        }
        group
    }
}

impl From<RawActionTestSummary> for ActionTestSummary {
    fn from(raw: RawActionTestSummary) -> Self {
        ActionTestSummary {
            activity_summaries: values(raw.activity_summaries)
                .into_iter()
                .map(|activity| ActivitySummary {
                    activity_type: string(activity.activity_type).unwrap_or_default(),
                    attachments: values(activity.attachments)
                        .into_iter()
                        .map(|attachment| Attachment {
                            name: string(attachment.name),
                            payload_ref: attachment.payload_ref.map(Reference::from),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
