//! Builder and public handle
//!
//! [`TracekitBuilder`] validates the configuration, wires up storage and the
//! delivery client, and spawns the tracker task. The returned [`Tracekit`]
//! handle is a cheap channel sender; tracking calls never block and never
//! fail, they log and drop when the pipeline is saturated or gone.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use tracekit_core::{
    ContextEvent, ContextSnapshot, Properties, StateStore, SystemTimeSource, TimeSource,
    TracekitConfig, TracekitError,
};

use crate::client::{ApiClient, Collector};
use crate::store::FileStateStore;
use crate::tracker::{Command, EventTracker, LifecycleEvent};

/// Depth of the command channel between handles and the tracker task.
const COMMAND_BUFFER: usize = 128;

// ----------------------------------------------------------------------------
// Builder
// ----------------------------------------------------------------------------

/// Builder for a [`Tracekit`] pipeline.
pub struct TracekitBuilder {
    config: TracekitConfig,
    state_dir: Option<PathBuf>,
}

impl TracekitBuilder {
    pub fn new(config: TracekitConfig) -> Self {
        Self {
            config,
            state_dir: None,
        }
    }

    /// Override the directory used for persisted state.
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    /// Build with production storage and transport.
    pub fn build(self) -> Result<Tracekit, TracekitError> {
        let state_dir = self
            .state_dir
            .clone()
            .unwrap_or_else(default_state_dir);
        let store =
            Arc::new(FileStateStore::new(&state_dir).map_err(TracekitError::Storage)?);
        let collector = Arc::new(ApiClient::new(&self.config).map_err(TracekitError::Api)?);
        self.build_with(collector, store, SystemTimeSource::new())
    }

    /// Build with custom components. This is the seam tests use to substitute
    /// a stub collector, in-memory storage, or a manual clock.
    pub fn build_with<C, S, T>(
        self,
        collector: Arc<C>,
        store: Arc<S>,
        time_source: T,
    ) -> Result<Tracekit, TracekitError>
    where
        C: Collector + 'static,
        S: StateStore + 'static,
        T: TimeSource + Clone + 'static,
    {
        if let Err(reason) = self.config.validate() {
            return Err(TracekitError::Configuration { reason });
        }

        if !self.config.delivery_enabled() {
            info!("no api key configured, running in no-op mode");
        }

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let tracker = EventTracker::new(self.config, collector, store, time_source, command_rx);
        let task = tokio::spawn(tracker.run());

        Ok(Tracekit { command_tx, task })
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tracekit")
}

// ----------------------------------------------------------------------------
// Handle
// ----------------------------------------------------------------------------

/// Handle to a running pipeline. Cloning is not supported; share via the
/// methods, which take `&self`.
pub struct Tracekit {
    command_tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl Tracekit {
    /// Start building a pipeline.
    pub fn builder(config: TracekitConfig) -> TracekitBuilder {
        TracekitBuilder::new(config)
    }

    /// Record an event with custom properties. Never blocks and never fails;
    /// if the pipeline is saturated the event is dropped with a warning.
    pub fn track(&self, name: impl Into<String>, properties: Properties) {
        self.send(Command::Track {
            name: name.into(),
            properties,
        });
    }

    /// Record a screen view. Repeat views of the same screen carry the
    /// elapsed duration since the previous view.
    pub fn track_screen(&self, name: impl Into<String>) {
        self.send(Command::TrackScreen { name: name.into() });
    }

    /// Attach a stable user identifier to future events.
    pub fn identify(&self, user_id: impl Into<String>) {
        self.send(Command::Identify {
            user_id: user_id.into(),
        });
    }

    /// Set the user's segment.
    pub fn set_segment(&self, segment: impl Into<String>) {
        self.send(Command::SetSegment {
            segment: segment.into(),
        });
    }

    /// Merge custom properties into the persisted user state.
    pub fn set_user_properties(&self, properties: Properties) {
        self.send(Command::SetUserProperties { properties });
    }

    /// Request an immediate upload of queued events.
    pub fn flush(&self) {
        self.send(Command::Flush);
    }

    /// Forward an application lifecycle transition.
    pub fn notify_lifecycle(&self, event: LifecycleEvent) {
        self.send(Command::Lifecycle(event));
    }

    /// Snapshot of the currently queued events, oldest first.
    pub async fn queue_snapshot(&self) -> Result<Vec<ContextEvent>, TracekitError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::QueueSnapshot { reply });
        rx.await.map_err(|_| TracekitError::ChannelClosed)
    }

    /// Capture the context that would be attached to an event right now.
    pub async fn current_context(&self) -> Result<ContextSnapshot, TracekitError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CurrentContext { reply });
        rx.await.map_err(|_| TracekitError::ChannelClosed)
    }

    /// Stop the tracker task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        if let Err(error) = self.task.await {
            warn!(%error, "tracker task did not shut down cleanly");
        }
    }

    fn send(&self, command: Command) {
        if let Err(error) = self.command_tx.try_send(command) {
            warn!(%error, "command dropped, tracker busy or stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracekit_core::MemoryStateStore;

    struct NullCollector;

    #[async_trait::async_trait]
    impl Collector for NullCollector {
        async fn upload(
            &self,
            _events: &[ContextEvent],
        ) -> Result<(), tracekit_core::ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = TracekitConfig {
            max_batch_size: 0,
            ..TracekitConfig::testing()
        };
        let result = TracekitBuilder::new(config).build_with(
            Arc::new(NullCollector),
            Arc::new(MemoryStateStore::new()),
            SystemTimeSource::new(),
        );
        assert!(matches!(
            result,
            Err(TracekitError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_joins_the_task() {
        let handle = TracekitBuilder::new(TracekitConfig::testing())
            .build_with(
                Arc::new(NullCollector),
                Arc::new(MemoryStateStore::new()),
                SystemTimeSource::new(),
            )
            .unwrap();
        handle.track("launch", Properties::new());
        handle.shutdown().await;
    }
}
