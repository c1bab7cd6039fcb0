//! Tracking runtime error types

use thiserror::Error;

/// Errors a runtime can return when creating a manager
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The runtime refused to create a manager
    #[error("Failed to create tracking manager: {0}")]
    CreateFailed(String),

    /// The platform cannot deliver hot-plug notifications
    #[error("Hot-plug notifications are not supported on this platform")]
    HotplugUnsupported,

    /// Error from the underlying device backend
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Type alias for tracking runtime results
pub type Result<T> = std::result::Result<T, TrackingError>;
