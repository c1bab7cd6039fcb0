//! Tracking device discovery
//!
//! Tracks presence of a single class of hot-pluggable tracking devices and
//! exposes them to a generic device-enumeration framework.
//!
//! - [`DiscoveryContext`] owns the runtime's manager, a background thread that
//!   drains runtime events every poll interval, and the device list fed by
//!   [`DeviceEventListener`].
//! - [`pick_tracking_devices`] is the enumeration entry point: it polls the
//!   device list for a bounded number of rounds and wraps a single attached
//!   device into a [`TrackingDeviceInfo`].
//! - [`global`] holds the process-wide context with explicit start/stop.
//! - [`usb`] is a libusb hot-plug backed runtime.
//!
//! # Example
//!
//! ```
//! use common::test_utils::MockRuntime;
//! use discovery::{BackendDeviceGroup, DiscoveryContext, DiscoverySettings, EnumerationContext};
//! use std::sync::Arc;
//! use tracking::DeviceHandle;
//!
//! let runtime = MockRuntime::new();
//! let settings = DiscoverySettings {
//!     round_interval_ms: 10,
//!     ..DiscoverySettings::default()
//! };
//! let context = DiscoveryContext::start(runtime.as_ref(), settings).unwrap();
//! runtime.manager().unwrap().push_attach(DeviceHandle(0x0203));
//!
//! let ctx = Arc::new(EnumerationContext::new("doc"));
//! let found = discovery::pick_devices_from(&context, &ctx, &BackendDeviceGroup::default());
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].handle(), DeviceHandle(0x0203));
//! ```

pub mod config;
pub mod context;
pub mod device;
pub mod enumeration;
pub mod error;
pub mod framework;
pub mod global;
pub mod listener;
pub mod usb;

pub use config::{DiscoveryConfig, DiscoverySettings};
pub use context::{DeviceRegistry, DiscoveryContext};
pub use device::TrackingDevice;
pub use enumeration::{
    TrackingDeviceInfo, discover_async, pick_devices_from, pick_tracking_devices,
    pick_tracking_devices_with,
};
pub use error::{DiscoveryError, Result};
pub use framework::{
    BackendDeviceGroup, DeviceInfo, DeviceInterface, EnumerationContext, UsbDeviceDescriptor,
};
pub use listener::DeviceEventListener;
pub use usb::UsbTrackingRuntime;
