//! Tracking runtime type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque device handle supplied by the runtime with attach events
///
/// The value means nothing to the discovery core; it is only compared,
/// copied and handed back to the runtime. A handle delivered with a detach
/// event may be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle(pub u64);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Kind of device state change reported to a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// A device of the tracked class connected and finished loading firmware
    Attach,
    /// A device of the tracked class disconnected
    Detach,
}

/// Vendor-defined error code reported to a listener
///
/// Rendered in hexadecimal everywhere it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    /// Device could not be opened or claimed
    pub const ACCESS: ErrorCode = ErrorCode(0x1001);
    /// Device disappeared while the runtime talked to it
    pub const NO_DEVICE: ErrorCode = ErrorCode(0x1002);
    /// Event pumping was interrupted or timed out
    pub const EVENT_LOOP: ErrorCode = ErrorCode(0x1003);
    /// Anything the runtime could not classify
    pub const UNKNOWN: ErrorCode = ErrorCode(0x10ff);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
