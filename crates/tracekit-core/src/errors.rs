//! Error types for the tracekit SDK
//!
//! The error taxonomy mirrors how failures propagate through the pipeline:
//! delivery errors ([`ApiError`]) reach the flush trigger, persistence errors
//! ([`StorageError`]) are absorbed near the call site, and context capture has
//! no error path at all, it degrades to sentinel values.

// ----------------------------------------------------------------------------
// Delivery Errors
// ----------------------------------------------------------------------------

/// Errors surfaced by the delivery client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    #[error("Network error: {reason}")]
    Network { reason: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidUrl { url: String },

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Payload compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Upload failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl ApiError {
    /// Whether this failure is worth retrying.
    ///
    /// Transport-level failures and server errors (5xx) are transient; client
    /// errors (4xx) and local serialization problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http { status } => *status >= 500,
            ApiError::Network { .. } => true,
            _ => false,
        }
    }
}

// ----------------------------------------------------------------------------
// Persistence Errors
// ----------------------------------------------------------------------------

/// Errors from the durable state store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persisted value for key '{key}' is corrupt")]
    Corrupt { key: String },

    #[error("State serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Top-level error type for the tracekit SDK.
#[derive(Debug, thiserror::Error)]
pub enum TracekitError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Tracker channel closed")]
    ChannelClosed,
}

pub type Result<T> = core::result::Result<T, TracekitError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::Http { status: 500 }.is_retryable());
        assert!(ApiError::Http { status: 503 }.is_retryable());
        assert!(ApiError::Network {
            reason: "timeout".into()
        }
        .is_retryable());

        assert!(!ApiError::Http { status: 400 }.is_retryable());
        assert!(!ApiError::Http { status: 404 }.is_retryable());
        assert!(!ApiError::InvalidUrl { url: "::".into() }.is_retryable());
        assert!(!ApiError::RetriesExhausted {
            attempts: 3,
            last: "status 503".into()
        }
        .is_retryable());
    }
}
