//! Common utilities for tm-discovery
//!
//! This crate provides shared functionality for the discovery core and its
//! binaries: error handling, logging setup, the presence event channel that
//! mirrors listener notifications to subscribers, and test support.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use channel::{
    PresenceEvent, PresenceReceiver, PresenceSender, PublishOutcome, create_presence_channel,
};
pub use error::{Error, Result};
pub use logging::setup_logging;
