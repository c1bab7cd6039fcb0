//! Tracking runtime interface for tm-discovery
//!
//! This crate defines the boundary between the discovery core and the vendor
//! tracking runtime. The runtime hands out a manager object, delivers
//! attach/detach/error notifications to a registered listener while its event
//! queue is being drained, and reports its own version.
//!
//! # Example
//!
//! ```
//! use tracking::{DeviceHandle, ErrorCode, EventType, Listener};
//!
//! struct PrintListener;
//!
//! impl Listener for PrintListener {
//!     fn on_state_changed(&self, event: EventType, device: Option<DeviceHandle>) {
//!         println!("{:?} {:?}", event, device);
//!     }
//!
//!     fn on_error(&self, code: ErrorCode, device: Option<DeviceHandle>) {
//!         println!("error {} on {:?}", code, device);
//!     }
//! }
//!
//! PrintListener.on_state_changed(EventType::Attach, Some(DeviceHandle(0x0103)));
//! ```

pub mod error;
pub mod runtime;
pub mod types;
pub mod version;

pub use error::{Result, TrackingError};
pub use runtime::{Listener, TrackingManager, TrackingRuntime};
pub use types::{DeviceHandle, ErrorCode, EventType};
pub use version::RuntimeVersion;
