//! Device event listener
//!
//! Translates runtime callbacks into device list updates. Callbacks run on
//! the event thread inside the manager's drain call and never block.

use crate::context::DeviceRegistry;
use common::PresenceEvent;
use std::sync::Weak;
use tracing::{debug, error, info, warn};
use tracking::{DeviceHandle, ErrorCode, EventType, Listener};

/// Listener registered with the tracking manager
///
/// Holds only a weak reference to the context's registry; events arriving
/// after the context is gone are dropped.
pub struct DeviceEventListener {
    registry: Weak<DeviceRegistry>,
}

impl DeviceEventListener {
    pub fn new(registry: Weak<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

impl Listener for DeviceEventListener {
    fn on_state_changed(&self, event: EventType, device: Option<DeviceHandle>) {
        let Some(registry) = self.registry.upgrade() else {
            debug!("Dropping {:?} event, discovery context is gone", event);
            return;
        };

        match event {
            EventType::Attach => {
                let Some(device) = device else {
                    warn!("Tracking device attach reported without a device handle");
                    return;
                };
                registry.append(device);
                info!("Tracking device attached - {}", device);
                registry.publish(PresenceEvent::Attached { device });
            }
            EventType::Detach => {
                // The device list is append-only: a detached device stays listed.
                match device {
                    Some(device) => info!("Tracking device detached - {}", device),
                    None => info!("Tracking device detached"),
                }
                registry.publish(PresenceEvent::Detached { device });
            }
        }
    }

    fn on_error(&self, code: ErrorCode, device: Option<DeviceHandle>) {
        match device {
            Some(device) => error!(
                "Error occurred while connecting device {}: error {}",
                device, code
            ),
            None => error!("Tracking runtime error: {}", code),
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.publish(PresenceEvent::Error { code, device });
        }
    }
}
