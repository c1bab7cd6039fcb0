//! Process-wide discovery context
//!
//! At most one context runs per process. It is created by `start` (or lazily
//! by the enumeration entry point) and torn down by `stop`. A failed start is
//! not remembered; the next call tries again.

use crate::config::{DiscoveryConfig, DiscoverySettings};
use crate::context::{DiscoveryContext, lock};
use crate::error::{DiscoveryError, Result};
use crate::usb::UsbTrackingRuntime;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracking::TrackingRuntime;

static CONTEXT: Mutex<Option<Arc<DiscoveryContext>>> = Mutex::new(None);

/// Start the global context, or return the one already running
pub fn start(
    runtime: &dyn TrackingRuntime,
    settings: DiscoverySettings,
) -> Result<Arc<DiscoveryContext>> {
    let mut slot = lock(&CONTEXT);
    if let Some(context) = slot.as_ref() {
        return Ok(context.clone());
    }

    let context = Arc::new(DiscoveryContext::start(runtime, settings)?);
    *slot = Some(context.clone());
    info!("Discovery context started");
    Ok(context)
}

/// The running global context, if any
pub fn current() -> Option<Arc<DiscoveryContext>> {
    lock(&CONTEXT).clone()
}

/// Start with the USB runtime and the user's configuration unless running
///
/// Falls back to built-in defaults when no configuration file is found.
pub fn get_or_start_default() -> Result<Arc<DiscoveryContext>> {
    if let Some(context) = current() {
        return Ok(context);
    }

    let config = DiscoveryConfig::load_or_default();
    let runtime = UsbTrackingRuntime::from_patterns(&config.usb.filters)
        .map_err(DiscoveryError::ManagerUnavailable)?;
    start(&runtime, config.discovery)
}

/// Stop the global context and join its event thread
///
/// Returns whether a context was running. Other holders of the context keep
/// a disposed instance whose device list no longer changes.
pub fn stop() -> bool {
    let Some(context) = lock(&CONTEXT).take() else {
        return false;
    };

    context.shutdown();
    info!("Discovery context stopped");
    true
}
