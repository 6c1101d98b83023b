use tracing::{info, warn};

use crate::device::Target;
use crate::extract::{
    ExportWriter, ExtractOptions, XcResultFile, extract_screenshots, locate_result_bundle,
};
use crate::harness::types::{HarnessConfig, HarnessError, HarnessResult};
use crate::process::{CommandRunner, Simctl, SimulatorList, TestPlanRun, Xcodebuild};
use crate::report::{RunReport, TargetReport};
use crate::workspace::Workspace;

/// Drives simulators, test runs and extraction for every configured target
pub struct Harness<'a> {
    config: &'a HarnessConfig,
    runner: &'a dyn CommandRunner,
    workspace: Workspace,
}

impl<'a> Harness<'a> {
    /// Resolve the project folder; fails if it does not exist
    pub fn new(config: &'a HarnessConfig, runner: &'a dyn CommandRunner) -> HarnessResult<Self> {
        let workspace = Workspace::open(&config.project_dir.to_string_lossy(), &config.config.folders)
            .map_err(|_| HarnessError::ProjectNotFound {
                path: config.project_dir.clone(),
            })?;
        Ok(Self {
            config,
            runner,
            workspace,
        })
    }

    /// Empty report for this project
    pub fn report(&self) -> RunReport {
        RunReport::start(&self.workspace.project_dir, &self.workspace.export_dir)
    }

    fn simctl(&self) -> Simctl<'a> {
        Simctl::new(self.runner, &self.config.config.tools.xcrun)
    }

    /// Full run: clear exports, check simulators, then test and extract each target
    ///
    /// Targets are processed in order; the first failing target stops the run.
    /// Every target attempted is recorded in `report`, failed or not.
    pub fn run(&self, report: &mut RunReport) -> HarnessResult<()> {
        let scheme = self
            .config
            .config
            .scheme
            .as_deref()
            .ok_or(HarnessError::MissingScheme)?;

        info!("Preparing export folder {}", self.workspace.export_dir.display());
        self.workspace.prepare()?;

        let devices = self.config.devices();
        let simulators = if devices.is_empty() {
            SimulatorList::default()
        } else {
            self.simctl().prepare_devices(&devices).map_err(HarnessError::Simulator)?
        };

        for target in &self.config.targets {
            let mut target_report = TargetReport::new(target);
            let outcome = self.run_target(target, scheme, &simulators, &mut target_report);
            target_report.success = outcome.is_ok();
            report.targets.push(target_report);
            outcome?;
        }

        info!("Screenshots exported to {}", self.workspace.export_dir.display());
        Ok(())
    }

    /// Extraction only, from the newest result bundle already in derived data
    ///
    /// The export folder is created if needed and existing files are kept.
    pub fn extract(&self, report: &mut RunReport) -> HarnessResult<()> {
        self.workspace.ensure_export_dir()?;
        for target in &self.config.targets {
            let mut target_report = TargetReport::new(target);
            let outcome = self.extract_target(target, &mut target_report);
            target_report.success = outcome.is_ok();
            report.targets.push(target_report);
            outcome?;
        }
        Ok(())
    }

    fn run_target(
        &self,
        target: &Target,
        scheme: &str,
        simulators: &SimulatorList,
        report: &mut TargetReport,
    ) -> HarnessResult<()> {
        let destination = match target {
            Target::Simulator(device) => {
                let udid = simulators
                    .simulator(device.device_type)
                    .map(|s| s.udid.as_str())
                    .filter(|udid| !udid.is_empty())
                    .ok_or_else(|| HarnessError::MissingSimulatorId {
                        name: device.simulator_name.to_string(),
                    })?;
                info!("Booting {}", device.simulator_name);
                self.simctl()
                    .boot(device.simulator_name)
                    .map_err(HarnessError::Simulator)?;
                format!("platform=iOS Simulator,id={}", udid)
            }
            Target::Mac => "platform=macOS".to_string(),
        };

        let outcome = self
            .test_target(target, scheme, destination, report)
            .and_then(|()| self.extract_target(target, report));

        if let Some(device) = target.device() {
            info!("Shutting down {}", device.simulator_name);
            if let Err(err) = self.simctl().shutdown(device.simulator_name) {
                if outcome.is_ok() {
                    return Err(HarnessError::Simulator(err));
                }
                warn!("Could not shut down {}: {}", device.simulator_name, err);
            }
        }
        outcome
    }

    fn test_target(
        &self,
        target: &Target,
        scheme: &str,
        destination: String,
        report: &mut TargetReport,
    ) -> HarnessResult<()> {
        let settings = &self.config.config;
        let run = TestPlanRun {
            scheme: scheme.to_string(),
            test_plan: settings.test_plan.clone(),
            destination,
            derived_data_dir: self.workspace.derived_data_dir.clone(),
            project_dir: self.workspace.project_dir.clone(),
        };
        info!("Running test plan {} on {}", run.test_plan, target);

        let xcodebuild = Xcodebuild::new(self.runner, &settings.tools.xcodebuild);
        match xcodebuild.run_with_retries(&run, settings.test_attempts) {
            Ok(attempts) => {
                report.attempts = attempts;
                Ok(())
            }
            Err(err) => {
                report.attempts = settings.test_attempts.max(1);
                Err(err.into())
            }
        }
    }

    fn extract_target(&self, target: &Target, report: &mut TargetReport) -> HarnessResult<()> {
        let bundle_path =
            locate_result_bundle(&self.workspace).map_err(|e| HarnessError::extraction(target, e))?;
        info!("Reading result bundle {}", bundle_path.display());
        report.result_bundle = Some(bundle_path.clone());

        let tools = &self.config.config.tools;
        let bundle = XcResultFile::new(bundle_path, self.runner, &tools.xcrun).legacy(tools.xcresulttool_legacy);
        let writer = ExportWriter::new(&self.workspace.export_dir);
        let options = ExtractOptions {
            fail_fast: self.config.fail_fast,
        };

        let extraction = extract_screenshots(&bundle, target, &writer, options)
            .map_err(|e| HarnessError::extraction(target, e))?;

        report.screenshots = extraction.exported;
        report.failures = extraction.failures.iter().map(ToString::to_string).collect();
        if report.failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::IncompleteExtraction {
                target: target.to_string(),
                failures: report.failures.clone(),
            })
        }
    }
}

/// Test and extract every target, returning the report of the run
///
/// Errors raised before any target starts (missing project folder) are
/// returned directly; later ones end the run and are recorded in the report.
pub fn run_harness(config: &HarnessConfig, runner: &dyn CommandRunner) -> HarnessResult<RunReport> {
    let harness = Harness::new(config, runner)?;
    let mut report = harness.report();
    let outcome = harness.run(&mut report);
    report.finish(outcome.err().map(|e| e.to_string()));
    Ok(report)
}

/// Extract every target from existing derived data, returning the report
pub fn run_extraction(config: &HarnessConfig, runner: &dyn CommandRunner) -> HarnessResult<RunReport> {
    let harness = Harness::new(config, runner)?;
    let mut report = harness.report();
    let outcome = harness.extract(&mut report);
    report.finish(outcome.err().map(|e| e.to_string()));
    Ok(report)
}
