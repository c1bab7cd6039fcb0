//! Tracking device object
//!
//! The device keeps the tracking manager alive for as long as it exists, so
//! it stays usable after discovery returns and even after the discovery
//! context is stopped.

use crate::framework::{BackendDeviceGroup, DeviceInterface, EnumerationContext};
use std::sync::Arc;
use tracking::{DeviceHandle, RuntimeVersion, TrackingManager};

pub const TRACKING_DEVICE_NAME: &str = "Tracking Module";

pub struct TrackingDevice {
    manager: Arc<dyn TrackingManager>,
    handle: DeviceHandle,
    context: Arc<EnumerationContext>,
    data: BackendDeviceGroup,
    notifications: bool,
}

impl TrackingDevice {
    pub fn new(
        manager: Arc<dyn TrackingManager>,
        handle: DeviceHandle,
        context: Arc<EnumerationContext>,
        data: BackendDeviceGroup,
        notifications: bool,
    ) -> Self {
        Self {
            manager,
            handle,
            context,
            data,
            notifications,
        }
    }

    /// Runtime device handle this object wraps
    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub fn manager(&self) -> &Arc<dyn TrackingManager> {
        &self.manager
    }

    pub fn context(&self) -> &Arc<EnumerationContext> {
        &self.context
    }

    /// Version of the runtime driving this device
    pub fn runtime_version(&self) -> RuntimeVersion {
        self.manager.version()
    }

    /// Whether the framework asked for device-change notifications
    pub fn notifications_registered(&self) -> bool {
        self.notifications
    }
}

impl DeviceInterface for TrackingDevice {
    fn name(&self) -> &str {
        TRACKING_DEVICE_NAME
    }

    fn device_data(&self) -> &BackendDeviceGroup {
        &self.data
    }
}

impl std::fmt::Debug for TrackingDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingDevice")
            .field("handle", &self.handle)
            .field("context", &self.context.name())
            .field("notifications", &self.notifications)
            .finish()
    }
}
