//! Discovery error types

use thiserror::Error;

/// Errors surfaced by the discovery core
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The tracking runtime could not create a manager; discovery is unavailable
    #[error("Discovery unavailable: {0}")]
    ManagerUnavailable(#[source] tracking::TrackingError),

    /// The event thread could not be spawned
    #[error("Failed to spawn event thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A blocking discovery task failed to complete
    #[error("Discovery task failed: {0}")]
    Task(String),

    /// The context was already shut down
    #[error("Discovery context is disposed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
