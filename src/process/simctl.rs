//! Simulator lifecycle through `xcrun simctl`.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{CommandRunner, CommandSpec, ProcessError, ProcessResult, launch, run_checked};
use crate::device::DeviceProfile;

/// Output of `simctl list -j devices available`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulatorList {
    /// Simulators grouped by runtime identifier
    #[serde(default)]
    pub devices: BTreeMap<String, Vec<Simulator>>,
}

impl SimulatorList {
    /// First simulator of the given device type, across all runtimes
    pub fn simulator(&self, device_type: &str) -> Option<&Simulator> {
        self.devices
            .values()
            .flatten()
            .find(|s| s.device_type_identifier.as_deref() == Some(device_type))
    }
}

/// One simulator entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulator {
    pub name: String,
    pub udid: String,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub device_type_identifier: Option<String>,
    pub state: SimulatorState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SimulatorState {
    Booted,
    Shutdown,
    #[serde(other)]
    Other,
}

impl SimulatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulatorState::Booted => "Booted",
            SimulatorState::Shutdown => "Shutdown",
            SimulatorState::Other => "Unknown",
        }
    }
}

/// `simctl` stderr when the device is already in the requested state
const ALREADY_BOOTED: &str = "current state: Booted";
const ALREADY_SHUTDOWN: &str = "current state: Shutdown";

/// Wrapper over `xcrun simctl`
pub struct Simctl<'a> {
    runner: &'a dyn CommandRunner,
    xcrun: String,
}

impl<'a> Simctl<'a> {
    pub fn new(runner: &'a dyn CommandRunner, xcrun: impl Into<String>) -> Self {
        Self {
            runner,
            xcrun: xcrun.into(),
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.xcrun).arg("simctl")
    }

    /// List available simulators
    pub fn list_available(&self) -> ProcessResult<SimulatorList> {
        let spec = self.command().args(["list", "-j", "devices", "available"]);
        let output = run_checked(self.runner, &spec)?;
        serde_json::from_str(&output.stdout).map_err(|source| ProcessError::Decode {
            command: spec.to_string(),
            source,
        })
    }

    /// Create a simulator for `device`, returning the new UDID
    pub fn create(&self, device: &DeviceProfile) -> ProcessResult<String> {
        let spec = self
            .command()
            .args(["create", device.simulator_name, device.device_type]);
        let output = run_checked(self.runner, &spec)?;
        Ok(output.stdout.trim().to_string())
    }

    pub fn boot(&self, name: &str) -> ProcessResult<()> {
        self.transition("boot", name, ALREADY_BOOTED)
    }

    pub fn shutdown(&self, name: &str) -> ProcessResult<()> {
        self.transition("shutdown", name, ALREADY_SHUTDOWN)
    }

    fn transition(&self, verb: &str, name: &str, already: &str) -> ProcessResult<()> {
        let spec = self.command().args([verb, name]);
        let output = launch(self.runner, &spec)?;
        if output.success() {
            return Ok(());
        }
        if output.stderr.contains(already) {
            debug!("{} is already in the requested state", name);
            return Ok(());
        }
        Err(ProcessError::Failed {
            command: spec.to_string(),
            exit_code: output.exit_code(),
            stderr: output.stderr,
        })
    }

    /// Make sure every device has a shut-down simulator, creating missing ones
    ///
    /// Returns the simulator list as it stands after any creation.
    pub fn prepare_devices(&self, devices: &[&DeviceProfile]) -> ProcessResult<SimulatorList> {
        let names: Vec<&str> = devices.iter().map(|d| d.simulator_name).collect();
        info!("Checking local simulators for: {}", names.join(", "));

        let simulators = self.list_available()?;
        let mut created = false;

        for device in devices {
            match simulators.simulator(device.device_type) {
                Some(simulator) => {
                    let availability = if simulator.is_available { "Available" } else { "Unavailable" };
                    info!(
                        "{} simulator is available. Device state: {}, availability: {}",
                        device.simulator_name,
                        simulator.state.as_str(),
                        availability
                    );
                    if simulator.state != SimulatorState::Shutdown {
                        info!("Shutting down the device: {}", device.simulator_name);
                        self.shutdown(device.simulator_name)?;
                    }
                }
                None => {
                    warn!("{} simulator is not available. Creating it...", device.simulator_name);
                    let udid = self.create(device)?;
                    info!("Created {} ({})", device.simulator_name, udid);
                    created = true;
                }
            }
        }

        if created { self.list_available() } else { Ok(simulators) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::find_device;
    use crate::process::{CommandOutput, ScriptedRunner};

    const LIST_JSON: &str = r#"{
      "devices": {
        "com.apple.CoreSimulator.SimRuntime.iOS-16-2": [
          {
            "dataPath": "/tmp/data",
            "logPath": "/tmp/log",
            "udid": "A1B2C3D4-0000-0000-0000-000000000001",
            "isAvailable": true,
            "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-14-Plus",
            "state": "Booted",
            "name": "iPhone 14 Plus"
          },
          {
            "udid": "A1B2C3D4-0000-0000-0000-000000000002",
            "isAvailable": true,
            "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-14",
            "state": "Shutdown",
            "name": "iPhone 14"
          },
          {
            "udid": "A1B2C3D4-0000-0000-0000-000000000003",
            "isAvailable": false,
            "state": "Creating",
            "name": "Legacy"
          }
        ]
      }
    }"#;

    #[test]
    fn test_decode_simulator_list() {
        let list: SimulatorList = serde_json::from_str(LIST_JSON).unwrap();
        let plus = list
            .simulator("com.apple.CoreSimulator.SimDeviceType.iPhone-14-Plus")
            .unwrap();
        assert_eq!(plus.udid, "A1B2C3D4-0000-0000-0000-000000000001");
        assert_eq!(plus.state, SimulatorState::Booted);
        assert!(list.simulator("com.apple.CoreSimulator.SimDeviceType.iPhone-14").is_some());
        assert!(list.simulator("com.apple.CoreSimulator.SimDeviceType.iPhone-8-Plus").is_none());

        let legacy = &list.devices["com.apple.CoreSimulator.SimRuntime.iOS-16-2"][2];
        assert_eq!(legacy.state, SimulatorState::Other);
        assert!(legacy.device_type_identifier.is_none());
    }

    #[test]
    fn test_prepare_devices_shuts_down_and_creates() {
        let runner = ScriptedRunner::new(|spec| match spec.args[1].as_str() {
            "list" => Ok(CommandOutput::ok(LIST_JSON)),
            "create" => Ok(CommandOutput::ok("NEW-UDID\n")),
            _ => Ok(CommandOutput::ok("")),
        });
        let simctl = Simctl::new(&runner, "xcrun");
        let devices = [
            find_device("iPhone 14 Plus").unwrap(),
            find_device("iPhone 14").unwrap(),
            find_device("iPhone 8 Plus").unwrap(),
        ];

        simctl.prepare_devices(&devices).unwrap();

        let shutdowns = runner.calls_with_args(&["simctl", "shutdown"]);
        assert_eq!(shutdowns.len(), 1);
        assert_eq!(shutdowns[0].args[2], "iPhone 14 Plus");

        let creates = runner.calls_with_args(&["simctl", "create"]);
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].args[2], "iPhone 8 Plus");
        assert_eq!(creates[0].args[3], "com.apple.CoreSimulator.SimDeviceType.iPhone-8-Plus");

        // Listed again after creating a simulator
        assert_eq!(runner.calls_with_args(&["simctl", "list"]).len(), 2);
    }

    #[test]
    fn test_boot_tolerates_already_booted() {
        let runner = ScriptedRunner::new(|_| {
            Ok(CommandOutput::failed(
                149,
                "Unable to boot device in current state: Booted",
            ))
        });
        let simctl = Simctl::new(&runner, "xcrun");
        assert!(simctl.boot("iPhone 14 Plus").is_ok());
        assert!(simctl.shutdown("iPhone 14 Plus").is_err());
    }

    #[test]
    fn test_list_available_decode_error() {
        let runner = ScriptedRunner::new(|_| Ok(CommandOutput::ok("not json")));
        let simctl = Simctl::new(&runner, "xcrun");
        let err = simctl.list_available().unwrap_err();
        assert!(matches!(err, ProcessError::Decode { .. }));
    }
}
