//! End-to-end harness runs against scripted `simctl`, `xcodebuild` and `xcresulttool`

use std::cell::Cell;
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use image::{ImageOutputFormat, RgbImage};
use marketing_screenshots::process::{CommandOutput, CommandSpec, ScriptedRunner};
use marketing_screenshots::{
    Config, Harness, HarnessConfig, HarnessError, Target, Workspace, resolve_targets, run_extraction,
    run_harness,
};
use pretty_assertions::assert_eq;

const UDID: &str = "5E1C7A2B-0000-4000-8000-000000000001";

const INVOCATION_JSON: &str = r#"{
  "_type": {"_name": "ActionsInvocationRecord"},
  "actions": {"_values": [{
    "_type": {"_name": "ActionRecord"},
    "actionResult": {
      "_type": {"_name": "ActionResult"},
      "testsRef": {"_type": {"_name": "Reference"}, "id": {"_value": "0~plan"}}
    }
  }]}
}"#;

const SUMMARIES_JSON: &str = r#"{
  "_type": {"_name": "ActionTestPlanRunSummaries"},
  "summaries": {"_values": [{
    "_type": {"_name": "ActionTestPlanRunSummary"},
    "name": {"_value": "iPhone 14"},
    "testableSummaries": {"_values": [{
      "tests": {"_values": [{
        "_type": {"_name": "ActionTestSummaryGroup"},
        "subtests": {"_values": [{
          "_type": {"_name": "ActionTestSummaryGroup"},
          "subtests": {"_values": [{
            "_type": {"_name": "ActionTestSummaryGroup"},
            "subtests": {"_values": [{
              "_type": {"_name": "ActionTestMetadata"},
              "name": {"_value": "testMainScreenshot()"},
              "summaryRef": {"id": {"_value": "0~main"}}
            }]}
          }]}
        }]}
      }]}
    }]}
  }]}
}"#;

const TEST_SUMMARY_JSON: &str = r#"{
  "_type": {"_name": "ActionTestSummary"},
  "activitySummaries": {"_values": [{
    "activityType": {"_value": "com.apple.dt.xctest.activity-type.attachmentContainer"},
    "attachments": {"_values": [{
      "name": {"_value": "Screenshot"},
      "payloadRef": {"id": {"_value": "0~payload"}}
    }]}
  }]}
}"#;

const MANIFEST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>logs</key>
    <dict>
        <key>AAAA</key>
        <dict>
            <key>fileName</key>
            <string>Run1.xcresult</string>
        </dict>
    </dict>
</dict>
</plist>"#;

/// Scripted tool behaviour
struct World {
    /// `xcodebuild` failures before the first success
    test_failures: Cell<u32>,
    /// Whether `simctl list` reports the iPhone 14 Plus simulator
    simulator_exists: Cell<bool>,
}

impl World {
    fn runner(test_failures: u32, simulator_exists: bool) -> ScriptedRunner {
        let world = World {
            test_failures: Cell::new(test_failures),
            simulator_exists: Cell::new(simulator_exists),
        };
        ScriptedRunner::new(move |spec| world.respond(spec))
    }

    fn respond(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        if spec.program == "xcodebuild" {
            return self.xcodebuild(spec);
        }
        match spec.args[0].as_str() {
            "simctl" => Ok(self.simctl(spec)),
            "xcresulttool" => xcresulttool(spec),
            other => panic!("unexpected tool {other}"),
        }
    }

    fn xcodebuild(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        let remaining = self.test_failures.get();
        if remaining > 0 {
            self.test_failures.set(remaining - 1);
            return Ok(CommandOutput::failed(65, "xcodebuild: error: Testing failed"));
        }
        let logs = Path::new(spec.flag_value("-derivedDataPath").unwrap()).join("Logs/Test");
        fs::create_dir_all(&logs)?;
        fs::write(logs.join("LogStoreManifest.plist"), MANIFEST_XML)?;
        Ok(CommandOutput::ok("Test Suite 'All tests' passed\n** TEST SUCCEEDED **"))
    }

    fn simctl(&self, spec: &CommandSpec) -> CommandOutput {
        match spec.args[1].as_str() {
            "list" if self.simulator_exists.get() => CommandOutput::ok(format!(
                r#"{{"devices": {{"com.apple.CoreSimulator.SimRuntime.iOS-17-0": [{{
                    "udid": "{UDID}",
                    "isAvailable": true,
                    "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-14-Plus",
                    "state": "Booted",
                    "name": "iPhone 14 Plus"
                }}]}}}}"#
            )),
            "list" => CommandOutput::ok(r#"{"devices": {}}"#),
            "create" => {
                self.simulator_exists.set(true);
                CommandOutput::ok(format!("{UDID}\n"))
            }
            _ => CommandOutput::ok(""),
        }
    }
}

fn xcresulttool(spec: &CommandSpec) -> io::Result<CommandOutput> {
    if spec.args[1] == "export" {
        fs::write(spec.flag_value("--output-path").unwrap(), png(3, 2))?;
        return Ok(CommandOutput::ok(""));
    }
    let body = match spec.flag_value("--id") {
        None => INVOCATION_JSON,
        Some("0~plan") => SUMMARIES_JSON,
        Some("0~main") => TEST_SUMMARY_JSON,
        Some(_) => return Ok(CommandOutput::failed(1, "Error: object not found")),
    };
    Ok(CommandOutput::ok(body))
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut out, ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

fn harness_config(project: &Path, targets: Vec<Target>) -> HarnessConfig {
    let mut config = Config::defaults().scheme("HelloWorldSample (iOS)");
    config.tools.xcrun = "xcrun".to_string();
    config.tools.xcodebuild = "xcodebuild".to_string();
    HarnessConfig::new(project, config).targets(targets)
}

fn simctl_verbs(runner: &ScriptedRunner) -> Vec<String> {
    runner
        .calls_with_args(&["simctl"])
        .into_iter()
        .map(|c| c.args[1].clone())
        .collect()
}

fn xcodebuild_calls(runner: &ScriptedRunner) -> Vec<CommandSpec> {
    runner.calls().into_iter().filter(|c| c.program == "xcodebuild").collect()
}

#[test]
fn test_full_run_on_simulator() {
    let project = tempfile::tempdir().unwrap();
    let runner = World::runner(0, true);
    let config = harness_config(project.path(), resolve_targets(["iPhone 14 Plus"], false).unwrap());

    let report = run_harness(&config, &runner).unwrap();

    assert!(report.success, "{}", report.summary());
    assert_eq!(report.targets.len(), 1);
    let target = &report.targets[0];
    assert_eq!(target.attempts, 1);
    assert_eq!(target.screenshots.len(), 1);
    assert_eq!(target.screenshots[0].dimensions, Some((3, 2)));

    let ws = Workspace::new(project.path(), &config.config.folders);
    assert_eq!(target.result_bundle, Some(ws.test_logs_dir().join("Run1.xcresult")));
    let exported = ws
        .export_dir
        .join("Screenshot - 6.5 inch - iPhone 14 - Main - iPhone14Plus.png");
    assert_eq!(fs::read(exported).unwrap(), png(3, 2));

    // Booted simulator is shut down before the run, then booted and shut down again
    assert_eq!(simctl_verbs(&runner), vec!["list", "shutdown", "boot", "shutdown"]);

    let test_run = &xcodebuild_calls(&runner)[0];
    assert_eq!(
        test_run.flag_value("-destination"),
        Some(format!("platform=iOS Simulator,id={}", UDID).as_str())
    );
    assert_eq!(test_run.flag_value("-testPlan"), Some("Marketing"));
    assert_eq!(test_run.current_dir.as_deref(), Some(project.path()));
}

#[test]
fn test_missing_simulator_is_created() {
    let project = tempfile::tempdir().unwrap();
    let runner = World::runner(0, false);
    let config = harness_config(project.path(), resolve_targets(["iPhone 14 Plus"], false).unwrap());

    let report = run_harness(&config, &runner).unwrap();

    assert!(report.success, "{}", report.summary());
    assert_eq!(simctl_verbs(&runner), vec!["list", "create", "list", "boot", "shutdown"]);
    let create = &runner.calls_with_args(&["simctl", "create"])[0];
    assert_eq!(
        create.args[2..],
        ["iPhone 14 Plus", "com.apple.CoreSimulator.SimDeviceType.iPhone-14-Plus"]
    );
}

#[test]
fn test_run_retried_until_success() {
    let project = tempfile::tempdir().unwrap();
    let runner = World::runner(2, true);
    let config = harness_config(project.path(), vec![Target::Mac]);

    let report = run_harness(&config, &runner).unwrap();

    assert!(report.success, "{}", report.summary());
    assert_eq!(report.targets[0].attempts, 3);
    assert_eq!(xcodebuild_calls(&runner).len(), 3);
    // Mac-only runs never touch simulators
    assert!(simctl_verbs(&runner).is_empty());
    assert!(
        project
            .path()
            .join(".ExportedScreenshots/Screenshot - Mac - iPhone 14 - Main - macOS.png")
            .exists()
    );
}

#[test]
fn test_exhausted_retries_stop_the_run() {
    let project = tempfile::tempdir().unwrap();
    let runner = World::runner(u32::MAX, true);
    let config = harness_config(
        project.path(),
        resolve_targets(["iPhone 14 Plus"], true).unwrap(),
    );

    let harness = Harness::new(&config, &runner).unwrap();
    let mut report = harness.report();
    let err = harness.run(&mut report).unwrap_err();

    assert!(matches!(err, HarnessError::ExternalProcess { exit_code: 65, .. }));
    assert_eq!(xcodebuild_calls(&runner).len(), 5);
    // The failing simulator is still shut down, and the Mac target never starts
    assert_eq!(simctl_verbs(&runner).last().map(String::as_str), Some("shutdown"));
    assert_eq!(report.targets.len(), 1);
    assert!(!report.targets[0].success);
    assert!(runner.calls_with_args(&["xcresulttool"]).is_empty());
}

#[test]
fn test_failed_run_recorded_in_report() {
    let project = tempfile::tempdir().unwrap();
    let runner = World::runner(u32::MAX, true);
    let mut config = harness_config(project.path(), vec![Target::Mac]);
    config.config = config.config.clone().test_attempts(2);

    let report = run_harness(&config, &runner).unwrap();

    assert!(!report.success);
    assert_eq!(report.targets[0].attempts, 2);
    let error = report.error.unwrap();
    assert!(error.contains("exit code 65"), "{error}");
}

#[test]
fn test_missing_project_folder() {
    let project = tempfile::tempdir().unwrap();
    let runner = World::runner(0, true);
    let config = harness_config(&project.path().join("missing"), vec![Target::Mac]);

    let err = run_harness(&config, &runner).err().unwrap();
    assert!(matches!(err, HarnessError::ProjectNotFound { .. }));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_extraction_only_keeps_previous_exports() {
    let project = tempfile::tempdir().unwrap();
    let runner = World::runner(0, true);
    let config = harness_config(project.path(), vec![Target::Mac]);

    let ws = Workspace::new(project.path(), &config.config.folders);
    fs::create_dir_all(ws.test_logs_dir()).unwrap();
    fs::write(ws.manifest_path(), MANIFEST_XML).unwrap();
    fs::create_dir(&ws.export_dir).unwrap();
    fs::write(ws.export_dir.join("earlier.png"), b"png").unwrap();

    let report = run_extraction(&config, &runner).unwrap();

    assert!(report.success, "{}", report.summary());
    assert_eq!(report.targets[0].attempts, 0);
    assert!(xcodebuild_calls(&runner).is_empty());
    assert!(ws.export_dir.join("earlier.png").exists());
    assert!(ws.export_dir.join("Screenshot - Mac - iPhone 14 - Main - macOS.png").exists());
}
