//! libusb hot-plug runtime and manager

use crate::context::lock;
use crate::usb::filter::DeviceFilter;
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration, UsbContext};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracking::{
    DeviceHandle, ErrorCode, EventType, Listener, RuntimeVersion, TrackingError, TrackingManager,
    TrackingRuntime,
};

/// Stable handle for a device at `bus`/`address`
pub fn device_handle(bus: u8, address: u8) -> DeviceHandle {
    DeviceHandle((u64::from(bus) << 8) | u64::from(address))
}

/// Map a libusb error onto a runtime error code
pub fn map_rusb_error(error: &rusb::Error) -> ErrorCode {
    match error {
        rusb::Error::Access | rusb::Error::Busy => ErrorCode::ACCESS,
        rusb::Error::NoDevice | rusb::Error::NotFound => ErrorCode::NO_DEVICE,
        rusb::Error::Timeout | rusb::Error::Interrupted | rusb::Error::Pipe => {
            ErrorCode::EVENT_LOOP
        }
        _ => ErrorCode::UNKNOWN,
    }
}

enum PendingEvent {
    State(EventType, DeviceHandle),
}

type PendingQueue = Arc<Mutex<VecDeque<PendingEvent>>>;

/// Hot-plug callback handler
///
/// Runs inside libusb event handling (or during registration for devices
/// already present) and only queues events.
struct HotplugCallback {
    filters: Vec<DeviceFilter>,
    pending: PendingQueue,
    // Tracked devices currently present; left events for others are ignored
    present: HashSet<DeviceHandle>,
}

impl<T: UsbContext> Hotplug<T> for HotplugCallback {
    fn device_arrived(&mut self, device: Device<T>) {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(e) => {
                debug!(
                    "Hot-plug: cannot read descriptor (bus={}, addr={}): {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                return;
            }
        };

        if !DeviceFilter::any_matches(
            &self.filters,
            descriptor.vendor_id(),
            descriptor.product_id(),
        ) {
            return;
        }

        let handle = device_handle(device.bus_number(), device.address());
        debug!(
            "Hot-plug: tracking device arrived {} (vid={:#06x}, pid={:#06x})",
            handle,
            descriptor.vendor_id(),
            descriptor.product_id()
        );
        self.present.insert(handle);
        lock(&self.pending).push_back(PendingEvent::State(EventType::Attach, handle));
    }

    fn device_left(&mut self, device: Device<T>) {
        let handle = device_handle(device.bus_number(), device.address());
        if self.present.remove(&handle) {
            debug!("Hot-plug: tracking device left {}", handle);
            lock(&self.pending).push_back(PendingEvent::State(EventType::Detach, handle));
        }
    }
}

/// Manager draining libusb events into a listener
pub struct UsbTrackingManager {
    context: Context,
    listener: Arc<dyn Listener>,
    pending: PendingQueue,
    _registration: Mutex<Registration<Context>>,
}

impl TrackingManager for UsbTrackingManager {
    fn handle_events(&self) {
        match self.context.handle_events(Some(Duration::ZERO)) {
            Ok(()) => {}
            Err(rusb::Error::Interrupted) => {
                debug!("USB event handling interrupted");
            }
            Err(e) => {
                warn!("Error handling USB events: {}", e);
                self.listener.on_error(map_rusb_error(&e), None);
            }
        }

        let events: Vec<PendingEvent> = lock(&self.pending).drain(..).collect();
        for event in events {
            match event {
                PendingEvent::State(kind, handle) => {
                    self.listener.on_state_changed(kind, Some(handle))
                }
            }
        }
    }

    fn version(&self) -> RuntimeVersion {
        let version = rusb::version();
        RuntimeVersion::from_parts(
            version.major() as u8,
            version.minor() as u8,
            version.micro(),
        )
    }
}

/// Runtime creating libusb-backed managers
#[derive(Debug, Clone, Default)]
pub struct UsbTrackingRuntime {
    filters: Vec<DeviceFilter>,
}

impl UsbTrackingRuntime {
    pub fn new(filters: Vec<DeviceFilter>) -> Self {
        Self { filters }
    }

    /// Build from `0xVID:0xPID` patterns
    pub fn from_patterns(patterns: &[String]) -> tracking::Result<Self> {
        let filters = patterns
            .iter()
            .map(|p| DeviceFilter::parse(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(TrackingError::Backend)?;
        Ok(Self::new(filters))
    }

    pub fn filters(&self) -> &[DeviceFilter] {
        &self.filters
    }
}

impl TrackingRuntime for UsbTrackingRuntime {
    fn create_instance(
        &self,
        listener: Arc<dyn Listener>,
    ) -> tracking::Result<Arc<dyn TrackingManager>> {
        if !rusb::has_hotplug() {
            return Err(TrackingError::HotplugUnsupported);
        }

        let context = Context::new().map_err(|e| TrackingError::Backend(e.to_string()))?;
        let pending: PendingQueue = Arc::new(Mutex::new(VecDeque::new()));

        let callback = HotplugCallback {
            filters: self.filters.clone(),
            pending: pending.clone(),
            present: HashSet::new(),
        };

        // Devices already plugged in are reported as arrivals during registration.
        let registration = HotplugBuilder::new()
            .enumerate(true)
            .register(&context, Box::new(callback))
            .map_err(|e| TrackingError::CreateFailed(e.to_string()))?;

        info!(
            "USB tracking runtime watching {} filter(s)",
            self.filters.len()
        );

        Ok(Arc::new(UsbTrackingManager {
            context,
            listener,
            pending,
            _registration: Mutex::new(registration),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::RecordingListener;

    #[test]
    fn test_device_handle_layout() {
        assert_eq!(device_handle(2, 3), DeviceHandle(0x0203));
        assert_ne!(device_handle(1, 2), device_handle(2, 1));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(map_rusb_error(&rusb::Error::Access), ErrorCode::ACCESS);
        assert_eq!(map_rusb_error(&rusb::Error::NoDevice), ErrorCode::NO_DEVICE);
        assert_eq!(map_rusb_error(&rusb::Error::Timeout), ErrorCode::EVENT_LOOP);
        assert_eq!(map_rusb_error(&rusb::Error::Other), ErrorCode::UNKNOWN);
    }

    #[test]
    fn test_from_patterns_rejects_bad_filter() {
        let err = UsbTrackingRuntime::from_patterns(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, TrackingError::Backend(_)));
    }

    #[test]
    fn test_usb_runtime_creation() {
        let runtime = UsbTrackingRuntime::from_patterns(&[
            crate::config::TRACKING_MODULE_FILTER.to_string(),
        ])
        .unwrap();
        let listener = Arc::new(RecordingListener::default());

        // May fail without libusb hot-plug support or USB permissions
        match runtime.create_instance(listener) {
            Ok(manager) => {
                manager.handle_events();
                assert!(manager.version().major() >= 1);
            }
            Err(e) => {
                eprintln!("USB runtime creation failed (expected without USB access): {}", e);
            }
        }
    }
}
