//! Runtime capability traits
//!
//! A `TrackingRuntime` creates a `TrackingManager` bound to a `Listener`.
//! Draining the manager's event queue invokes the listener synchronously on
//! the draining thread, so listener implementations must never block.

use crate::{DeviceHandle, ErrorCode, EventType, Result, RuntimeVersion};
use std::sync::Arc;

/// Receiver of asynchronous device notifications
///
/// Both callbacks are total: they cannot report failure to the runtime and
/// must not panic.
pub trait Listener: Send + Sync {
    /// A device attached or detached
    ///
    /// The handle may be absent or stale on `Detach`.
    fn on_state_changed(&self, event: EventType, device: Option<DeviceHandle>);

    /// The runtime hit an error, possibly unrelated to any tracked device
    fn on_error(&self, code: ErrorCode, device: Option<DeviceHandle>);
}

/// Central runtime handle through which events are drained
pub trait TrackingManager: Send + Sync {
    /// Deliver every pending event to the registered listener, then return
    ///
    /// Must not block waiting for new events.
    fn handle_events(&self);

    /// Version of the runtime library
    fn version(&self) -> RuntimeVersion;
}

/// Entry point of the vendor runtime
pub trait TrackingRuntime: Send + Sync {
    /// Create a manager that reports to `listener`
    ///
    /// The manager keeps a shared reference to the listener for as long as
    /// it lives.
    fn create_instance(&self, listener: Arc<dyn Listener>) -> Result<Arc<dyn TrackingManager>>;
}
