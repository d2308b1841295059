//! Tracekit configuration
//!
//! All knobs for the pipeline in one place, with documented defaults and a
//! `validate()` pass run once at construction.

use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Default collector endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.tracekit.dev/v1";

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the tracekit pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracekitConfig {
    /// API key for authentication. An empty key disables delivery: tracking
    /// calls are accepted but become no-ops.
    pub api_key: String,
    /// Base URL of the collector API.
    pub base_url: String,
    /// Seconds between periodic batch uploads.
    pub upload_interval_secs: u64,
    /// Queue length that forces an upload.
    pub max_batch_size: usize,
    /// Queue length cap; the oldest events are evicted beyond this.
    pub max_queued_events: usize,
    /// Emit diagnostic logging for accepted-but-dropped work.
    pub debug_mode: bool,
    /// Collect geo context (sentinel values when disabled).
    pub enable_geo: bool,
    /// Collect device context (sentinel values when disabled).
    pub enable_device: bool,
    /// Collect time context (sentinel values when disabled).
    pub enable_time: bool,
    /// Start a session automatically on construction. Foreground and
    /// background transitions always manage the session regardless.
    pub enable_auto_session: bool,
}

impl Default for TracekitConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_interval_secs: 30,
            max_batch_size: 20,
            max_queued_events: 1000,
            debug_mode: false,
            enable_geo: true,
            enable_device: true,
            enable_time: true,
            enable_auto_session: true,
        }
    }
}

impl TracekitConfig {
    /// Create a configuration with the given API key and all defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Configuration for tests: short intervals, tiny batches, debug logging.
    pub fn testing() -> Self {
        Self {
            api_key: "tk_test_key".to_string(),
            upload_interval_secs: 1,
            max_batch_size: 5,
            debug_mode: true,
            ..Self::default()
        }
    }

    /// Interval between periodic uploads.
    pub fn upload_interval(&self) -> Duration {
        Duration::from_secs(self.upload_interval_secs)
    }

    /// Whether delivery is possible. An empty API key leaves the tracker in
    /// accepted-but-no-op mode rather than failing construction.
    pub fn delivery_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Validate structural invariants of the configuration.
    pub fn validate(&self) -> core::result::Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }
        if self.upload_interval_secs == 0 {
            return Err("upload_interval_secs must be at least 1".to_string());
        }
        if self.max_batch_size == 0 {
            return Err("max_batch_size must be at least 1".to_string());
        }
        if self.max_queued_events < self.max_batch_size {
            return Err("max_queued_events must be at least max_batch_size".to_string());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TracekitConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.upload_interval_secs, 30);
        assert_eq!(config.max_batch_size, 20);
        assert!(config.enable_geo && config.enable_device && config.enable_time);
        assert!(config.enable_auto_session);
        assert!(!config.debug_mode);
        assert!(!config.delivery_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_degenerate_values() {
        let mut config = TracekitConfig::new("tk_live_abc");
        assert!(config.validate().is_ok());
        assert!(config.delivery_enabled());

        config.max_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = TracekitConfig::new("tk_live_abc");
        config.upload_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = TracekitConfig::new("tk_live_abc");
        config.max_queued_events = config.max_batch_size - 1;
        assert!(config.validate().is_err());

        let mut config = TracekitConfig::new("tk_live_abc");
        config.base_url.clear();
        assert!(config.validate().is_err());
    }
}
