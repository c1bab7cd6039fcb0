//! Generic device-enumeration framework types
//!
//! The enumeration framework hands discovery a context handle and the
//! platform's view of connected devices, and gets back device-info objects
//! it can later turn into full device objects.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Generic context handle owned by the enumeration framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationContext {
    name: String,
}

impl EnumerationContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// USB device as seen by the platform backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub device_address: u8,
}

/// Platform device group passed to discovery and carried as device data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDeviceGroup {
    pub usb_devices: Vec<UsbDeviceDescriptor>,
}

impl BackendDeviceGroup {
    pub fn is_empty(&self) -> bool {
        self.usb_devices.is_empty()
    }
}

/// A fully constructed device
pub trait DeviceInterface: Send + Sync {
    /// Human-readable device name
    fn name(&self) -> &str;

    /// Platform data the device was discovered with
    fn device_data(&self) -> &BackendDeviceGroup;
}

/// Discovered device that can build a device object on demand
pub trait DeviceInfo: Send + Sync {
    /// Construct the device object
    fn create(
        &self,
        ctx: Arc<EnumerationContext>,
        register_device_notifications: bool,
    ) -> Result<Arc<dyn DeviceInterface>>;

    /// Platform data the device was discovered with
    fn device_data(&self) -> &BackendDeviceGroup;
}
