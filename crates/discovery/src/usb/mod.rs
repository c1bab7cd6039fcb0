//! USB tracking runtime
//!
//! A `TrackingRuntime` backed by libusb hot-plug notifications:
//! - Hot-plug callbacks (filtered by VID:PID) queue attach/detach events
//! - `handle_events()` pumps libusb without blocking, then delivers the
//!   queued events to the listener on the calling thread
//! - libusb errors surface as listener `on_error` calls

pub mod filter;
pub mod runtime;

pub use filter::DeviceFilter;
pub use runtime::{UsbTrackingManager, UsbTrackingRuntime, device_handle, map_rusb_error};
