//! Time-of-day context
//!
//! Captured from the device-local clock. `DayPeriod` is a pure function of
//! the hour so the same hour always buckets the same way.

use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Day Period
// ----------------------------------------------------------------------------

/// Coarse period of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    /// 5–11
    Morning,
    /// 12–16
    Afternoon,
    /// 17–20
    Evening,
    /// 21–4
    Night,
}

impl DayPeriod {
    /// Bucket an hour (0–23) into its day period.
    pub fn from_hour(hour: u8) -> DayPeriod {
        match hour {
            5..=11 => DayPeriod::Morning,
            12..=16 => DayPeriod::Afternoon,
            17..=20 => DayPeriod::Evening,
            _ => DayPeriod::Night,
        }
    }
}

// ----------------------------------------------------------------------------
// Time Context
// ----------------------------------------------------------------------------

/// Time-of-day context attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeContext {
    /// Hour of the day in 24-hour format (0–23).
    pub hour: u8,
    /// Day of the week (1 = Monday .. 7 = Sunday).
    pub day_of_week: u8,
    /// Whether this is a Saturday or Sunday.
    pub is_weekend: bool,
    /// Timezone identifier, best effort (`TZ` environment variable, falling
    /// back to the UTC offset of the local clock).
    pub timezone: String,
    /// Local time in `HH:mm` format.
    pub local_time: String,
    /// Period of the day, derived from `hour`.
    pub day_period: DayPeriod,
}

impl TimeContext {
    /// Capture the time context from the local clock.
    pub fn capture() -> TimeContext {
        Self::capture_at(Local::now())
    }

    /// Build the time context for a specific local instant.
    pub fn capture_at(now: DateTime<Local>) -> TimeContext {
        let hour = now.hour() as u8;
        let day_of_week = now.weekday().number_from_monday() as u8;

        TimeContext {
            hour,
            day_of_week,
            is_weekend: day_of_week >= 6,
            timezone: local_timezone_name(&now),
            local_time: now.format("%H:%M").to_string(),
            day_period: DayPeriod::from_hour(hour),
        }
    }

    /// Sentinel context used when time capture is disabled.
    pub fn empty() -> TimeContext {
        TimeContext {
            hour: 0,
            day_of_week: 1,
            is_weekend: false,
            timezone: "unknown".to_string(),
            local_time: "00:00".to_string(),
            day_period: DayPeriod::Night,
        }
    }
}

/// Best-effort timezone identifier. There is no portable IANA name lookup
/// without extra platform plumbing, so `TZ` wins when set and the numeric UTC
/// offset is the fallback.
fn local_timezone_name(now: &DateTime<Local>) -> String {
    match std::env::var("TZ") {
        Ok(tz) if !tz.is_empty() => tz,
        _ => now.offset().to_string(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
