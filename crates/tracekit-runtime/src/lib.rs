//! tracekit-runtime: async event pipeline
//!
//! Tokio runtime layer over [`tracekit_core`]: a single tracker task owns the
//! queue, session, and user state; a channel-backed [`Tracekit`] handle
//! provides the public API; the [`client`] module delivers batches over HTTP
//! with compression and bounded retry; the [`store`] module persists state to
//! disk between runs.
//!
//! ```no_run
//! use tracekit_runtime::{Tracekit, TracekitConfig};
//!
//! # async fn run() -> Result<(), tracekit_runtime::TracekitError> {
//! let tracker = Tracekit::builder(TracekitConfig::new("tk_live_abc")).build()?;
//! tracker.track_screen("home");
//! tracker.track("signup_completed", Default::default());
//! tracker.flush();
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod store;
pub mod tracker;

pub use builder::{Tracekit, TracekitBuilder};
pub use client::{ApiClient, Collector, HttpExchange, Insight, InsightType, Recommendation,
    ReqwestExchange, Severity};
pub use store::FileStateStore;
pub use tracker::{Command, EventTracker, LifecycleEvent};

// Core types callers need alongside the runtime surface.
pub use tracekit_core::{
    ApiError, ContextEvent, ContextSnapshot, DayPeriod, DeviceContext, GeoContext,
    ManualTimeSource, MemoryStateStore, Properties, PropertyValue, SessionContext, StateStore,
    StorageError, SystemTimeSource, TimeContext, TimeSource, TracekitConfig, TracekitError,
    UserContext,
};
