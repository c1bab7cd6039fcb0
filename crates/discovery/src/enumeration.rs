//! Bounded-wait device enumeration
//!
//! The device list is polled once per round. An empty list costs one round
//! and one round interval of sleep; any non-empty reading ends the query.
//! Exactly one device yields one device-info; several devices are rejected
//! with a warning since only a single tracking device is supported.

use crate::config::DiscoverySettings;
use crate::context::DiscoveryContext;
use crate::device::TrackingDevice;
use crate::error::{DiscoveryError, Result};
use crate::framework::{BackendDeviceGroup, DeviceInfo, DeviceInterface, EnumerationContext};
use crate::global;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracking::{DeviceHandle, TrackingManager, TrackingRuntime};

/// Discovered tracking device, bound to the manager and enumeration context
#[derive(Clone)]
pub struct TrackingDeviceInfo {
    manager: Arc<dyn TrackingManager>,
    handle: DeviceHandle,
    context: Arc<EnumerationContext>,
    data: BackendDeviceGroup,
}

impl TrackingDeviceInfo {
    pub fn new(
        manager: Arc<dyn TrackingManager>,
        handle: DeviceHandle,
        context: Arc<EnumerationContext>,
        data: BackendDeviceGroup,
    ) -> Self {
        Self {
            manager,
            handle,
            context,
            data,
        }
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub fn context(&self) -> &Arc<EnumerationContext> {
        &self.context
    }

    /// Build the concrete device object
    pub fn create_device(
        &self,
        ctx: Arc<EnumerationContext>,
        register_device_notifications: bool,
    ) -> TrackingDevice {
        TrackingDevice::new(
            self.manager.clone(),
            self.handle,
            ctx,
            self.data.clone(),
            register_device_notifications,
        )
    }
}

impl DeviceInfo for TrackingDeviceInfo {
    fn create(
        &self,
        ctx: Arc<EnumerationContext>,
        register_device_notifications: bool,
    ) -> Result<Arc<dyn DeviceInterface>> {
        Ok(Arc::new(self.create_device(ctx, register_device_notifications)))
    }

    fn device_data(&self) -> &BackendDeviceGroup {
        &self.data
    }
}

impl std::fmt::Debug for TrackingDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingDeviceInfo")
            .field("handle", &self.handle)
            .field("context", &self.context.name())
            .finish()
    }
}

/// Wait for a tracking device on `context`
///
/// Returns at most one device-info. An empty result means no device showed
/// up within the configured rounds, or more than one did.
pub fn pick_devices_from(
    context: &DiscoveryContext,
    ctx: &Arc<EnumerationContext>,
    group: &BackendDeviceGroup,
) -> Vec<TrackingDeviceInfo> {
    let settings = context.settings();
    let mut results = Vec::new();
    let mut remaining = settings.rounds;

    while remaining > 0 {
        let devices = context.query_devices();

        match devices.as_slice() {
            [] => {
                // Firmware may still be loading.
                remaining -= 1;
                debug!("No tracking device yet, {} round(s) left", remaining);
                std::thread::sleep(settings.round_interval());
            }
            [device] => {
                remaining = 0;
                info!("Found tracking device {}", device);
                results.push(TrackingDeviceInfo::new(
                    context.get_manager(),
                    *device,
                    ctx.clone(),
                    group.clone(),
                ));
            }
            many => {
                remaining = 0;
                warn!(
                    "At the moment only a single tracking device is supported, found {}",
                    many.len()
                );
            }
        }
    }

    results
}

/// Enumeration entry point using the process-wide context
///
/// Starts the global context with the USB runtime and the configuration file
/// on first use.
pub fn pick_tracking_devices(
    ctx: &Arc<EnumerationContext>,
    group: &BackendDeviceGroup,
) -> Result<Vec<TrackingDeviceInfo>> {
    let context = global::get_or_start_default()?;
    Ok(pick_devices_from(&context, ctx, group))
}

/// Like [`pick_tracking_devices`], starting the global context on `runtime`
///
/// A context that is already running is reused and `runtime` is ignored.
pub fn pick_tracking_devices_with(
    runtime: &dyn TrackingRuntime,
    settings: DiscoverySettings,
    ctx: &Arc<EnumerationContext>,
    group: &BackendDeviceGroup,
) -> Result<Vec<TrackingDeviceInfo>> {
    let context = global::start(runtime, settings)?;
    Ok(pick_devices_from(&context, ctx, group))
}

/// Run `pick_devices_from` on the blocking pool
pub async fn discover_async(
    context: Arc<DiscoveryContext>,
    ctx: Arc<EnumerationContext>,
    group: BackendDeviceGroup,
) -> Result<Vec<TrackingDeviceInfo>> {
    if context.is_disposed() {
        return Err(DiscoveryError::Disposed);
    }

    tokio::task::spawn_blocking(move || pick_devices_from(&context, &ctx, &group))
        .await
        .map_err(|e| DiscoveryError::Task(e.to_string()))
}
