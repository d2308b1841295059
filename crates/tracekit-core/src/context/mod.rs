//! Context providers and the snapshot assembler
//!
//! One immutable [`ContextSnapshot`] is assembled per event from the
//! time/geo/device providers plus the user store and session tracker.
//! Capture never fails: disabled providers and failing platform queries both
//! yield documented sentinel values, keeping the downstream schema fixed.

pub mod device;
pub mod geo;
pub mod time;

pub use device::{BatteryState, DeviceContext, NetworkType};
pub use geo::GeoContext;
pub use time::{DayPeriod, TimeContext};

// Session and user contexts live next to their owning state machines.
pub use crate::session::SessionContext;
pub use crate::user::UserContext;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TracekitConfig;
use crate::session::SessionTracker;
use crate::store::StateStore;
use crate::types::{TimeSource, SDK_VERSION};
use crate::user::UserStore;

// ----------------------------------------------------------------------------
// Context Snapshot
// ----------------------------------------------------------------------------

/// Complete context snapshot for one event. Built fresh per event and never
/// mutated afterwards; owned solely by the event it is embedded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Time-of-day context.
    pub time: TimeContext,
    /// Geographic and locale context.
    pub geo: GeoContext,
    /// Device hardware and state context.
    pub device: DeviceContext,
    /// User context.
    pub user: UserContext,
    /// Session context.
    pub session: SessionContext,
    /// SDK version that captured this snapshot.
    pub sdk_version: String,
    /// Instant the snapshot was captured.
    pub captured_at: DateTime<Utc>,
}

impl ContextSnapshot {
    /// Assemble a snapshot from the providers and current state.
    ///
    /// Each sub-context is independently toggleable; a disabled one
    /// contributes its `empty()` sentinel instead of being omitted.
    pub fn capture<S: StateStore, T: TimeSource>(
        config: &TracekitConfig,
        user: &UserStore<S, T>,
        session: &SessionTracker<T>,
        time_source: &T,
    ) -> ContextSnapshot {
        let time = if config.enable_time {
            TimeContext::capture()
        } else {
            TimeContext::empty()
        };

        let geo = if config.enable_geo {
            GeoContext::capture()
        } else {
            GeoContext::empty()
        };

        let device = if config.enable_device {
            DeviceContext::capture()
        } else {
            DeviceContext::empty()
        };

        ContextSnapshot {
            time,
            geo,
            device,
            user: user.snapshot(),
            session: session.capture(),
            sdk_version: SDK_VERSION.to_string(),
            captured_at: time_source.now(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStateStore;
    use crate::types::ManualTimeSource;
    use std::sync::Arc;

    fn snapshot_with(config: &TracekitConfig) -> ContextSnapshot {
        let clock = ManualTimeSource::default();
        let store = Arc::new(MemoryStateStore::new());
        let user = UserStore::new(store, clock.clone());
        let session = SessionTracker::new(clock.clone());
        ContextSnapshot::capture(config, &user, &session, &clock)
    }

    #[test]
    fn test_disabled_providers_yield_sentinels() {
        let config = TracekitConfig {
            enable_time: false,
            enable_geo: false,
            enable_device: false,
            ..TracekitConfig::default()
        };

        let snapshot = snapshot_with(&config);
        assert_eq!(snapshot.time, TimeContext::empty());
        assert_eq!(snapshot.geo, GeoContext::empty());
        assert_eq!(snapshot.device, DeviceContext::empty());
        assert_eq!(snapshot.sdk_version, SDK_VERSION);
    }

    #[test]
    fn test_enabled_capture_fills_live_fields() {
        let snapshot = snapshot_with(&TracekitConfig::default());
        assert!(snapshot.time.hour <= 23);
        assert!((1..=7).contains(&snapshot.time.day_of_week));
        assert!(!snapshot.device.model.is_empty());
    }

    #[test]
    fn test_wire_format_is_snake_case() {
        let snapshot = snapshot_with(&TracekitConfig::default());
        let json = serde_json::to_value(&snapshot).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("sdk_version"));
        assert!(obj.contains_key("captured_at"));
        assert!(obj["session"].as_object().unwrap().contains_key("entry_screen"));
        assert!(obj["user"]
            .as_object()
            .unwrap()
            .contains_key("days_since_install"));
    }
}
