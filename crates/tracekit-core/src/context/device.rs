//! Device hardware and state context
//!
//! Probed through `sysinfo` using public facts only. Fields the current
//! platform cannot answer (screen geometry, battery, network reachability)
//! carry documented sentinel values so the snapshot schema never changes
//! shape. Probe failures degrade to sentinels as well; capture has no error
//! path.

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

/// Battery charging state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryState {
    Unknown,
    Unplugged,
    Charging,
    Full,
}

/// Network connection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Unknown,
    Wifi,
    Cellular,
    Offline,
}

// ----------------------------------------------------------------------------
// Device Context
// ----------------------------------------------------------------------------

/// Device hardware and state context attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceContext {
    /// Device or OS distribution name, or "unknown".
    pub model: String,
    /// Operating system version, or "unknown".
    pub os_version: String,
    /// Screen width in points (0 = unavailable).
    pub screen_width: f64,
    /// Screen height in points (0 = unavailable).
    pub screen_height: f64,
    /// Screen scale factor (1.0 = unavailable).
    pub screen_scale: f64,
    /// Battery level 0.0–1.0, or -1 if unavailable.
    pub battery_level: f64,
    /// Battery charging state.
    pub battery_state: BatteryState,
    /// Network connection type.
    pub network_type: NetworkType,
    /// Whether a low-power mode is active.
    pub is_low_power_mode: bool,
    /// Available disk space in bytes, or -1 if unavailable.
    pub available_disk_space: i64,
    /// Total physical memory in bytes (0 = unavailable).
    pub total_memory: u64,
}

impl DeviceContext {
    /// Capture the current device context.
    pub fn capture() -> DeviceContext {
        let mut system = System::new();
        system.refresh_memory();

        DeviceContext {
            model: System::name().unwrap_or_else(|| "unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
            // No portable display probe; the schema keeps the fields with
            // sentinel values.
            screen_width: 0.0,
            screen_height: 0.0,
            screen_scale: 1.0,
            battery_level: -1.0,
            battery_state: BatteryState::Unknown,
            network_type: NetworkType::Unknown,
            is_low_power_mode: false,
            available_disk_space: available_disk_space(),
            total_memory: system.total_memory(),
        }
    }

    /// Sentinel context used when device capture is disabled.
    pub fn empty() -> DeviceContext {
        DeviceContext {
            model: "unknown".to_string(),
            os_version: "unknown".to_string(),
            screen_width: 0.0,
            screen_height: 0.0,
            screen_scale: 1.0,
            battery_level: -1.0,
            battery_state: BatteryState::Unknown,
            network_type: NetworkType::Unknown,
            is_low_power_mode: false,
            available_disk_space: -1,
            total_memory: 0,
        }
    }
}

/// Available space on the root filesystem, falling back to the largest
/// mounted disk, or -1 when no disk is visible.
fn available_disk_space() -> i64 {
    let disks = Disks::new_with_refreshed_list();

    let root = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == std::path::Path::new("/"));

    let chosen = root.or_else(|| {
        disks
            .list()
            .iter()
            .max_by_key(|disk| disk.available_space())
    });

    match chosen {
        Some(disk) => disk.available_space() as i64,
        None => -1,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_never_fails_and_keeps_schema() {
        let ctx = DeviceContext::capture();
        assert!(!ctx.model.is_empty());
        assert!(!ctx.os_version.is_empty());
        // Sentinels on fields this platform cannot answer
        assert_eq!(ctx.battery_level, -1.0);
        assert_eq!(ctx.battery_state, BatteryState::Unknown);
        assert!(ctx.available_disk_space >= -1);
    }

    #[test]
    fn test_empty_sentinel_shape() {
        let ctx = DeviceContext::empty();
        assert_eq!(ctx.model, "unknown");
        assert_eq!(ctx.total_memory, 0);
        assert_eq!(ctx.available_disk_space, -1);
        assert_eq!(ctx.screen_scale, 1.0);
    }

    #[test]
    fn test_wire_format_is_snake_case() {
        let json = serde_json::to_value(DeviceContext::empty()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("os_version"));
        assert!(obj.contains_key("battery_level"));
        assert!(obj.contains_key("available_disk_space"));
        assert_eq!(obj["battery_state"], "unknown");
        assert_eq!(obj["network_type"], "unknown");
    }
}
