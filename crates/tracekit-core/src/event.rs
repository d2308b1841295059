//! Tracked events and the upload payload
//!
//! A [`ContextEvent`] is immutable once created: it is queued, persisted, and
//! eventually deleted as a unit, never partially updated. [`EventBatch`] is
//! the exact wire shape POSTed to the collector's events endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ContextSnapshot;
use crate::properties::Properties;

// ----------------------------------------------------------------------------
// Context Event
// ----------------------------------------------------------------------------

/// A tracked event with its full context snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEvent {
    /// Unique event identifier.
    pub id: String,
    /// Event name (e.g. "paywall_viewed").
    pub name: String,
    /// Custom properties provided by the caller.
    pub properties: Properties,
    /// Context captured at track time.
    pub context: ContextSnapshot,
    /// Instant the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl ContextEvent {
    /// Create a new event with a fresh identifier.
    pub fn new(
        name: impl Into<String>,
        properties: Properties,
        context: ContextSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            properties,
            context,
            timestamp,
        }
    }
}

// ----------------------------------------------------------------------------
// Upload Payload
// ----------------------------------------------------------------------------

/// Wire payload for one batch upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
    /// API key authenticating the batch.
    pub api_key: String,
    /// Ordered queue contents included in this delivery attempt.
    pub events: Vec<ContextEvent>,
    /// SDK version that produced the batch.
    pub sdk_version: String,
    /// Instant the upload was assembled.
    pub uploaded_at: DateTime<Utc>,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
