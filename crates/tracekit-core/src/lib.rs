//! Tracekit Core
//!
//! This crate provides the foundational types for the tracekit telemetry SDK:
//! context providers, the session state machine, the durable user state store,
//! the ordered event queue, and the wire payload types. Everything here is
//! synchronous and side-effect free apart from the [`StateStore`] boundary;
//! the async pipeline (batching, upload, lifecycle) lives in
//! `tracekit-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod context;
pub mod errors;
pub mod event;
pub mod properties;
pub mod queue;
pub mod session;
pub mod store;
pub mod types;
pub mod user;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::TracekitConfig;
pub use context::{
    ContextSnapshot, DayPeriod, DeviceContext, GeoContext, SessionContext, TimeContext,
    UserContext,
};
pub use errors::{ApiError, Result, StorageError, TracekitError};
pub use event::{ContextEvent, EventBatch};
pub use properties::{Properties, PropertyValue};
pub use queue::EventQueue;
pub use session::SessionTracker;
pub use store::{MemoryStateStore, StateStore, QUEUE_KEY, USER_STATE_KEY};
pub use types::{ManualTimeSource, SystemTimeSource, TimeSource, SDK_NAME, SDK_VERSION};
pub use user::UserStore;
