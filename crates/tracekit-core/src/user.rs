//! User state store
//!
//! Durable identity, segment, custom properties, and session counters.
//! Mutated only from the tracker task; every mutation is followed by a
//! persist of the whole state blob. A missing or corrupt blob yields fresh
//! default state rather than a startup failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::StorageError;
use crate::properties::Properties;
use crate::store::{StateStore, USER_STATE_KEY};
use crate::types::TimeSource;

// ----------------------------------------------------------------------------
// User Context
// ----------------------------------------------------------------------------

/// User context attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Identifier set by the host application, if any.
    pub user_id: Option<String>,
    /// Segment label (e.g. "free", "paid"), if any.
    pub segment: Option<String>,
    /// Number of sessions this user has had.
    pub session_count: u32,
    /// Whole days since the first launch was recorded.
    pub days_since_install: i64,
    /// Custom user properties, stringified canonically.
    pub custom_properties: BTreeMap<String, String>,
}

// ----------------------------------------------------------------------------
// Persisted State
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserState {
    user_id: Option<String>,
    segment: Option<String>,
    session_count: u32,
    installed_at: Option<DateTime<Utc>>,
    custom_properties: BTreeMap<String, String>,
}

// ----------------------------------------------------------------------------
// User Store
// ----------------------------------------------------------------------------

/// Durable user state, cached in memory and written through on mutation.
pub struct UserStore<S: StateStore, T: TimeSource> {
    store: Arc<S>,
    state: UserState,
    time_source: T,
}

impl<S: StateStore, T: TimeSource> UserStore<S, T> {
    /// Load user state from the store, recording the install timestamp on
    /// first ever access (set-if-absent: never overwritten afterwards).
    pub fn new(store: Arc<S>, time_source: T) -> Self {
        let mut state = match store.get(USER_STATE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!(%error, "persisted user state is corrupt, starting fresh");
                UserState::default()
            }),
            Ok(None) => UserState::default(),
            Err(error) => {
                warn!(%error, "user state unavailable, starting fresh");
                UserState::default()
            }
        };

        let mut user = if state.installed_at.is_none() {
            state.installed_at = Some(time_source.now());
            let user = Self {
                store,
                state,
                time_source,
            };
            if let Err(error) = user.persist() {
                warn!(%error, "failed to record install timestamp");
            }
            user
        } else {
            Self {
                store,
                state,
                time_source,
            }
        };

        // Normalize pre-install clocks: a restored timestamp in the future
        // would yield negative install ages.
        if let Some(installed_at) = user.state.installed_at {
            if installed_at > user.time_source.now() {
                user.state.installed_at = Some(user.time_source.now());
            }
        }

        user
    }

    /// Set the user identifier.
    pub fn set_user_id(&mut self, user_id: impl Into<String>) -> Result<(), StorageError> {
        self.state.user_id = Some(user_id.into());
        self.persist()
    }

    /// Set the user segment.
    pub fn set_segment(&mut self, segment: impl Into<String>) -> Result<(), StorageError> {
        self.state.segment = Some(segment.into());
        self.persist()
    }

    /// Merge custom properties, last write wins per key. Values without a
    /// canonical string form (arrays, maps) are dropped silently.
    pub fn merge_properties(&mut self, properties: Properties) -> Result<(), StorageError> {
        for (key, value) in properties {
            if let Some(string_value) = value.as_property_string() {
                self.state.custom_properties.insert(key, string_value);
            }
        }
        self.persist()
    }

    /// Increment the durable session counter.
    pub fn increment_session_count(&mut self) -> Result<(), StorageError> {
        self.state.session_count += 1;
        self.persist()
    }

    /// Read-only snapshot of the user state.
    pub fn snapshot(&self) -> UserContext {
        let days_since_install = self
            .state
            .installed_at
            .map(|installed_at| (self.time_source.now() - installed_at).num_days().max(0))
            .unwrap_or(0);

        UserContext {
            user_id: self.state.user_id.clone(),
            segment: self.state.segment.clone(),
            session_count: self.state.session_count,
            days_since_install,
            custom_properties: self.state.custom_properties.clone(),
        }
    }

    fn persist(&self) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&self.state)?;
        self.store.put(USER_STATE_KEY, &raw)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::PropertyValue;
    use crate::store::MemoryStateStore;
    use crate::types::ManualTimeSource;
    use chrono::Duration;

    #[test]
    fn test_install_timestamp_recorded_once() {
        let store = Arc::new(MemoryStateStore::new());
        let clock = ManualTimeSource::default();

        let user = UserStore::new(Arc::clone(&store), clock.clone());
        assert_eq!(user.snapshot().days_since_install, 0);
        drop(user);

        clock.advance(Duration::days(3));
        let user = UserStore::new(Arc::clone(&store), clock.clone());
        assert_eq!(user.snapshot().days_since_install, 3);

        // A second restart later still measures from the original install
        clock.advance(Duration::days(4));
        let user = UserStore::new(store, clock);
        assert_eq!(user.snapshot().days_since_install, 7);
    }

    #[test]
    fn test_state_survives_restart() {
        let store = Arc::new(MemoryStateStore::new());
        let clock = ManualTimeSource::default();

        let mut user = UserStore::new(Arc::clone(&store), clock.clone());
        user.set_user_id("user_123").unwrap();
        user.set_segment("paid").unwrap();
        user.increment_session_count().unwrap();
        user.increment_session_count().unwrap();

        let user = UserStore::new(store, clock);
        let ctx = user.snapshot();
        assert_eq!(ctx.user_id.as_deref(), Some("user_123"));
        assert_eq!(ctx.segment.as_deref(), Some("paid"));
        assert_eq!(ctx.session_count, 2);
    }

    #[test]
    fn test_merge_properties_last_write_wins() {
        let store = Arc::new(MemoryStateStore::new());
        let mut user = UserStore::new(store, ManualTimeSource::default());

        let mut first = Properties::new();
        first.insert("plan".into(), PropertyValue::from("free"));
        first.insert("seats".into(), PropertyValue::from(1));
        user.merge_properties(first).unwrap();

        let mut second = Properties::new();
        second.insert("plan".into(), PropertyValue::from("premium"));
        second.insert("nested".into(), PropertyValue::from(vec![1, 2]));
        user.merge_properties(second).unwrap();

        let ctx = user.snapshot();
        assert_eq!(ctx.custom_properties.get("plan").unwrap(), "premium");
        assert_eq!(ctx.custom_properties.get("seats").unwrap(), "1");
        // Unconvertible values are dropped silently
        assert!(!ctx.custom_properties.contains_key("nested"));
    }

    #[test]
    fn test_corrupt_state_starts_fresh() {
        let store = Arc::new(MemoryStateStore::new());
        store.put(USER_STATE_KEY, "{not json").unwrap();

        let user = UserStore::new(store, ManualTimeSource::default());
        let ctx = user.snapshot();
        assert_eq!(ctx.user_id, None);
        assert_eq!(ctx.session_count, 0);
    }
}
