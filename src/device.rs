//! Supported screenshot targets.
//!
//! Simulators are described by a static catalog so supporting a new device is
//! a matter of adding a row. Screen sizes follow the App Store Connect
//! screenshot specifications.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One simulator device known to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    /// Short identifier used in exported file names
    pub key: &'static str,
    /// CoreSimulator device type identifier
    pub device_type: &'static str,
    /// Name given to the simulator by `simctl create`
    pub simulator_name: &'static str,
    /// App Store screen size label
    pub screen_description: &'static str,
}

/// Every device the tool knows how to create and capture
pub static DEVICES: &[DeviceProfile] = &[
    DeviceProfile {
        key: "iPhone14Plus",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPhone-14-Plus",
        simulator_name: "iPhone 14 Plus",
        screen_description: "6.5 inch",
    },
    DeviceProfile {
        key: "iPhone14ProMax",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPhone-14-Pro-Max",
        simulator_name: "iPhone 14 Pro Max",
        screen_description: "6.7 inch",
    },
    DeviceProfile {
        key: "iPhone14Pro",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPhone-14-Pro",
        simulator_name: "iPhone 14 Pro",
        screen_description: "6.1 inch",
    },
    DeviceProfile {
        key: "iPhone14",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPhone-14",
        simulator_name: "iPhone 14",
        screen_description: "5.8 inch",
    },
    DeviceProfile {
        key: "iPhone8Plus",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPhone-8-Plus",
        simulator_name: "iPhone 8 Plus",
        screen_description: "5.5 inch",
    },
    DeviceProfile {
        key: "iPhoneSE_3rd_Generation",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPhone-SE--3rd-generation-",
        simulator_name: "iPhone SE (3rd generation)",
        screen_description: "4.7 inch",
    },
    DeviceProfile {
        key: "iPadPro_129_6th_Generation",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPad-Pro--12-9-inch---6th-generation-",
        simulator_name: "iPad Pro (12.9-inch) (6th generation)",
        screen_description: "12.9 inch borderless",
    },
    DeviceProfile {
        key: "iPadPro_129_2nd_Generation",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPad-Pro--12-9-inch---2nd-generation-",
        simulator_name: "iPad Pro (12.9-inch) (2nd generation)",
        screen_description: "12.9 inch",
    },
    DeviceProfile {
        key: "iPadPro_110_4th_Generation",
        device_type: "com.apple.CoreSimulator.SimDeviceType.iPad-Pro--11-inch---4th-generation-",
        simulator_name: "iPad Pro (11-inch) (4th generation)",
        screen_description: "11 inch",
    },
];

/// Look up a device by simulator name or short key
pub fn find_device(name: &str) -> Option<&'static DeviceProfile> {
    DEVICES
        .iter()
        .find(|d| d.simulator_name == name || d.key == name)
}

/// Names selecting the host Mac as a target
const MAC_NAMES: &[&str] = &["mac", "macos", "macOS"];

/// A device simulator or the host Mac
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Simulator(&'static DeviceProfile),
    Mac,
}

impl Target {
    /// Human-readable name used in progress output
    pub fn display_name(&self) -> &'static str {
        match self {
            Target::Simulator(device) => device.simulator_name,
            Target::Mac => "macOS",
        }
    }

    pub fn screen_description(&self) -> &'static str {
        match self {
            Target::Simulator(device) => device.screen_description,
            Target::Mac => "Mac",
        }
    }

    /// Identifier placed at the end of exported file names
    pub fn file_id(&self) -> &'static str {
        match self {
            Target::Simulator(device) => device.key,
            Target::Mac => "macOS",
        }
    }

    pub fn device(&self) -> Option<&'static DeviceProfile> {
        match self {
            Target::Simulator(device) => Some(device),
            Target::Mac => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if MAC_NAMES.contains(&s) {
            return Ok(Target::Mac);
        }
        find_device(s).map(Target::Simulator).ok_or_else(|| {
            let known: Vec<&str> = DEVICES.iter().map(|d| d.simulator_name).collect();
            format!("Unknown device '{}'. Choose among: {}", s, known.join(", "))
        })
    }
}
