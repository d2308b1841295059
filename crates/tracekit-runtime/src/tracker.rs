//! Event tracker task
//!
//! Single owner of the event queue, session tracker, and user store. All
//! mutation flows through the [`Command`] channel, so no locks guard the
//! pipeline state. Uploads run on a spawned task and report back through an
//! internal channel; a single-flight flag ensures at most one batch is in
//! flight at a time. The queue is only drained after the collector confirms
//! delivery, which keeps the pipeline at-least-once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use tracekit_core::{
    ContextEvent, ContextSnapshot, EventQueue, Properties, PropertyValue, SessionTracker,
    StateStore, TimeSource, TracekitConfig, UserStore, QUEUE_KEY,
};

use crate::client::Collector;

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// Application lifecycle transitions forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// App became active.
    Foreground,
    /// App moved to the background.
    Background,
    /// App is about to exit.
    Terminate,
}

/// Commands accepted by the tracker task.
#[derive(Debug)]
pub enum Command {
    Track {
        name: String,
        properties: Properties,
    },
    TrackScreen {
        name: String,
    },
    Identify {
        user_id: String,
    },
    SetSegment {
        segment: String,
    },
    SetUserProperties {
        properties: Properties,
    },
    Flush,
    Lifecycle(LifecycleEvent),
    QueueSnapshot {
        reply: oneshot::Sender<Vec<ContextEvent>>,
    },
    CurrentContext {
        reply: oneshot::Sender<ContextSnapshot>,
    },
    Shutdown,
}

/// Result of one spawned upload, reported back to the tracker loop.
#[derive(Debug)]
enum UploadOutcome {
    Delivered { ids: Vec<String> },
    Failed { error: tracekit_core::ApiError },
}

// ----------------------------------------------------------------------------
// Event Tracker
// ----------------------------------------------------------------------------

/// The tracker task state. Constructed once, then consumed by [`run`].
///
/// [`run`]: EventTracker::run
pub struct EventTracker<C, S, T>
where
    C: Collector + 'static,
    S: StateStore + 'static,
    T: TimeSource + Clone,
{
    config: TracekitConfig,
    collector: Arc<C>,
    store: Arc<S>,
    time_source: T,
    queue: EventQueue,
    session: SessionTracker<T>,
    user: UserStore<S, T>,
    /// Last-seen instant per screen name, for view duration.
    screen_views: HashMap<String, DateTime<Utc>>,
    command_rx: mpsc::Receiver<Command>,
    upload_tx: mpsc::Sender<UploadOutcome>,
    upload_rx: mpsc::Receiver<UploadOutcome>,
    /// Single-flight guard: true while a spawned upload is outstanding.
    uploading: bool,
    /// Without an API key the pipeline runs in no-op mode.
    enabled: bool,
}

impl<C, S, T> EventTracker<C, S, T>
where
    C: Collector + 'static,
    S: StateStore + 'static,
    T: TimeSource + Clone,
{
    pub fn new(
        config: TracekitConfig,
        collector: Arc<C>,
        store: Arc<S>,
        time_source: T,
        command_rx: mpsc::Receiver<Command>,
    ) -> Self {
        let queue = restore_queue(store.as_ref(), config.max_queued_events);
        let mut session = SessionTracker::new(time_source.clone());
        let mut user = UserStore::new(Arc::clone(&store), time_source.clone());

        if config.enable_auto_session {
            session.start();
            if let Err(error) = user.increment_session_count() {
                warn!(%error, "failed to persist session count");
            }
        }

        let (upload_tx, upload_rx) = mpsc::channel(1);
        let enabled = config.delivery_enabled();

        Self {
            config,
            collector,
            store,
            time_source,
            queue,
            session,
            user,
            screen_views: HashMap::new(),
            command_rx,
            upload_tx,
            upload_rx,
            uploading: false,
            enabled,
        }
    }

    /// Run the tracker loop until shutdown or all handles drop.
    pub async fn run(mut self) {
        // First tick fires after one full interval, not at startup.
        let period = self.config.upload_interval();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                Some(outcome) = self.upload_rx.recv() => {
                    self.finish_upload(outcome);
                }
                _ = ticker.tick() => {
                    self.begin_flush();
                }
            }
        }

        debug!("tracker loop stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Track { name, properties } => self.track(name, properties),
            Command::TrackScreen { name } => self.track_screen(&name),
            Command::Identify { user_id } => {
                if let Err(error) = self.user.set_user_id(user_id) {
                    warn!(%error, "failed to persist user id");
                }
            }
            Command::SetSegment { segment } => {
                if let Err(error) = self.user.set_segment(segment) {
                    warn!(%error, "failed to persist segment");
                }
            }
            Command::SetUserProperties { properties } => {
                if let Err(error) = self.user.merge_properties(properties) {
                    warn!(%error, "failed to persist user properties");
                }
            }
            Command::Flush => self.begin_flush(),
            Command::Lifecycle(event) => self.handle_lifecycle(event),
            Command::QueueSnapshot { reply } => {
                let _ = reply.send(self.queue.snapshot());
            }
            Command::CurrentContext { reply } => {
                let _ = reply.send(self.capture_context());
            }
            Command::Shutdown => unreachable!("handled in run loop"),
        }
    }

    // ------------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------------

    fn track(&mut self, name: String, properties: Properties) {
        if !self.enabled {
            if self.config.debug_mode {
                debug!(%name, "event dropped, no api key configured");
            }
            return;
        }

        self.session.increment_event_count();
        let context = self.capture_context();
        let event = ContextEvent::new(name, properties, context, self.time_source.now());
        self.queue.push(event);
        self.persist_queue();

        if self.queue.len() >= self.config.max_batch_size {
            self.begin_flush();
        }
    }

    fn track_screen(&mut self, name: &str) {
        self.session.track_screen_view(name);

        let now = self.time_source.now();
        let mut properties = Properties::new();
        properties.insert(
            "screen_name".to_string(),
            PropertyValue::String(name.to_string()),
        );
        // Duration since the previous view of this screen, if any.
        if let Some(previous) = self.screen_views.insert(name.to_string(), now) {
            let duration = (now - previous).num_milliseconds() as f64 / 1000.0;
            properties.insert("duration".to_string(), PropertyValue::Float(duration));
        }

        self.track("screen_view".to_string(), properties);
    }

    fn capture_context(&self) -> ContextSnapshot {
        ContextSnapshot::capture(&self.config, &self.user, &self.session, &self.time_source)
    }

    // ------------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------------

    /// Start an upload of the current queue contents unless one is already
    /// in flight. The queue is left intact until delivery is confirmed, so a
    /// backlog built up under delivery failure goes out whole on the next
    /// successful flush.
    fn begin_flush(&mut self) {
        if !self.enabled || self.queue.is_empty() || self.uploading {
            return;
        }

        let batch = self.queue.snapshot();
        let ids: Vec<String> = batch.iter().map(|event| event.id.clone()).collect();

        debug!(events = batch.len(), "starting batch upload");
        self.uploading = true;

        let collector = Arc::clone(&self.collector);
        let outcome_tx = self.upload_tx.clone();
        tokio::spawn(async move {
            let outcome = match collector.upload(&batch).await {
                Ok(()) => UploadOutcome::Delivered { ids },
                Err(error) => UploadOutcome::Failed { error },
            };
            let _ = outcome_tx.send(outcome).await;
        });
    }

    fn finish_upload(&mut self, outcome: UploadOutcome) {
        self.uploading = false;
        match outcome {
            UploadOutcome::Delivered { ids } => {
                let removed = self.queue.remove_delivered(&ids);
                debug!(removed, remaining = self.queue.len(), "batch delivered");
                self.persist_queue();
            }
            UploadOutcome::Failed { error } => {
                // Queue untouched; events go out with a later flush.
                warn!(%error, queued = self.queue.len(), "batch upload failed");
            }
        }
    }

    fn persist_queue(&self) {
        let serialized = match self.queue.serialize() {
            Ok(serialized) => serialized,
            Err(error) => {
                warn!(%error, "failed to serialize event queue");
                return;
            }
        };
        if let Err(error) = self.store.put(QUEUE_KEY, &serialized) {
            warn!(%error, "failed to persist event queue");
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        debug!(?event, "lifecycle transition");
        match event {
            LifecycleEvent::Foreground => {
                self.session.start();
                if let Err(error) = self.user.increment_session_count() {
                    warn!(%error, "failed to persist session count");
                }
            }
            LifecycleEvent::Background => {
                self.session.end();
                self.begin_flush();
                self.persist_queue();
            }
            LifecycleEvent::Terminate => {
                self.begin_flush();
                self.persist_queue();
            }
        }
    }
}

/// Restore the persisted queue, starting empty if the stored value is
/// missing or unreadable.
fn restore_queue<S: StateStore>(store: &S, capacity: usize) -> EventQueue {
    let raw = match store.get(QUEUE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return EventQueue::new(capacity),
        Err(error) => {
            warn!(%error, "failed to read persisted queue, starting empty");
            return EventQueue::new(capacity);
        }
    };

    match EventQueue::deserialize(&raw) {
        Ok(events) => {
            debug!(events = events.len(), "restored persisted queue");
            EventQueue::restore(events, capacity)
        }
        Err(error) => {
            warn!(%error, "persisted queue corrupt, starting empty");
            EventQueue::new(capacity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracekit_core::MemoryStateStore;
    use tracekit_core::SystemTimeSource;

    struct NullCollector;

    #[async_trait::async_trait]
    impl Collector for NullCollector {
        async fn upload(&self, _events: &[ContextEvent]) -> Result<(), tracekit_core::ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_restore_skips_corrupt_queue() {
        let store = Arc::new(MemoryStateStore::new());
        store.put(QUEUE_KEY, "not json").unwrap();

        let queue = restore_queue(store.as_ref(), 10);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_auto_session_starts_active() {
        let (_tx, rx) = mpsc::channel(8);
        let tracker = EventTracker::new(
            TracekitConfig::testing(),
            Arc::new(NullCollector),
            Arc::new(MemoryStateStore::new()),
            SystemTimeSource::new(),
            rx,
        );
        assert!(tracker.session.is_active());
        assert_eq!(tracker.user.snapshot().session_count, 1);
    }

    #[tokio::test]
    async fn test_disabled_pipeline_queues_nothing() {
        let (_tx, rx) = mpsc::channel(8);
        let config = TracekitConfig::new("");
        let mut tracker = EventTracker::new(
            config,
            Arc::new(NullCollector),
            Arc::new(MemoryStateStore::new()),
            SystemTimeSource::new(),
            rx,
        );
        tracker.track("checkout".to_string(), Properties::new());
        assert!(tracker.queue.is_empty());
    }
}
