//! Session tracking
//!
//! A two-state machine (Inactive / Active) owned by the event tracker task.
//! All mutators run on that single task, so the tracker itself needs no
//! internal locking; concurrent callers go through the tracker's command
//! channel and can never observe a torn update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TimeSource;

// ----------------------------------------------------------------------------
// Session Context
// ----------------------------------------------------------------------------

/// Session context attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Unique session identifier, regenerated on each session start.
    pub session_id: String,
    /// Seconds elapsed since the session started.
    pub duration: f64,
    /// Number of screens viewed this session.
    pub screen_view_count: u32,
    /// Number of events tracked this session.
    pub event_count: u32,
    /// First screen name seen this session, sticky once set.
    pub entry_screen: Option<String>,
}

// ----------------------------------------------------------------------------
// Session Tracker
// ----------------------------------------------------------------------------

/// In-memory session state machine.
#[derive(Debug)]
pub struct SessionTracker<T: TimeSource> {
    session_id: String,
    started_at: DateTime<Utc>,
    screen_view_count: u32,
    event_count: u32,
    entry_screen: Option<String>,
    active: bool,
    time_source: T,
}

impl<T: TimeSource> SessionTracker<T> {
    /// Create an inactive tracker. A session begins on the first tracked
    /// activity or an explicit [`start`](Self::start).
    pub fn new(time_source: T) -> Self {
        let started_at = time_source.now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            started_at,
            screen_view_count: 0,
            event_count: 0,
            entry_screen: None,
            active: false,
            time_source,
        }
    }

    /// Start a new session, resetting identity, start time, counters, and
    /// entry screen.
    pub fn start(&mut self) {
        self.session_id = Uuid::new_v4().to_string();
        self.started_at = self.time_source.now();
        self.screen_view_count = 0;
        self.event_count = 0;
        self.entry_screen = None;
        self.active = true;
    }

    /// End the current session. No-op when already inactive.
    pub fn end(&mut self) {
        self.active = false;
    }

    /// Record a screen view, implicitly starting a session when inactive.
    /// The first screen name seen becomes the sticky entry screen.
    pub fn track_screen_view(&mut self, screen_name: &str) {
        if !self.active {
            self.start();
        }

        self.screen_view_count += 1;
        if self.entry_screen.is_none() {
            self.entry_screen = Some(screen_name.to_string());
        }
    }

    /// Record a tracked event, implicitly starting a session when inactive.
    pub fn increment_event_count(&mut self) {
        if !self.active {
            self.start();
        }
        self.event_count += 1;
    }

    /// Read-only snapshot of the session state.
    pub fn capture(&self) -> SessionContext {
        let elapsed = self.time_source.now() - self.started_at;
        let duration = (elapsed.num_milliseconds().max(0) as f64) / 1000.0;

        SessionContext {
            session_id: self.session_id.clone(),
            duration,
            screen_view_count: self.screen_view_count,
            event_count: self.event_count,
            entry_screen: self.entry_screen.clone(),
        }
    }

    /// Current session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether a session is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
