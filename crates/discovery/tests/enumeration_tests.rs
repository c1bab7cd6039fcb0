//! Bounded-wait enumeration tests
//!
//! Tests for the discovery query used by the enumeration framework:
//! - No device: empty result after the full round budget
//! - One device: one device-info, returned promptly
//! - Several devices: empty result and a single warning
//! - Device objects built from a device-info
//!
//! Run with: `cargo test -p discovery --test enumeration_tests`

use common::test_utils::{DEFAULT_TEST_TIMEOUT, LogCapture, MockEvent, MockRuntime, wait_until};
use discovery::{
    BackendDeviceGroup, DeviceInfo, DeviceInterface, DiscoveryContext, DiscoverySettings,
    EnumerationContext, UsbDeviceDescriptor, discover_async, pick_devices_from,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::Level;
use tracking::{DeviceHandle, EventType, TrackingManager};

fn settings(rounds: u32, round_interval_ms: u64) -> DiscoverySettings {
    DiscoverySettings {
        rounds,
        round_interval_ms,
        ..DiscoverySettings::default()
    }
}

fn enumeration_context() -> Arc<EnumerationContext> {
    Arc::new(EnumerationContext::new("test"))
}

#[test]
fn test_no_device_times_out_empty() {
    let runtime = MockRuntime::new();
    let context = DiscoveryContext::start(runtime.as_ref(), settings(3, 20)).unwrap();

    let started = Instant::now();
    let found = pick_devices_from(&context, &enumeration_context(), &BackendDeviceGroup::default());
    let elapsed = started.elapsed();

    assert!(found.is_empty());
    assert!(elapsed >= Duration::from_millis(60));
    assert!(elapsed < Duration::from_secs(2));
}

#[test]
fn test_single_device_returned_promptly() {
    let runtime = MockRuntime::new();
    let context = DiscoveryContext::start(runtime.as_ref(), settings(100, 10)).unwrap();
    let manager = runtime.manager().unwrap();

    let attach = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        manager.push_attach(DeviceHandle(0x0307));
    });

    let started = Instant::now();
    let found = pick_devices_from(&context, &enumeration_context(), &BackendDeviceGroup::default());
    attach.join().unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].handle(), DeviceHandle(0x0307));
    // Far below the 100 x 10ms budget
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_device_present_before_first_round() {
    let runtime = MockRuntime::new();
    runtime.preload(vec![MockEvent::State(
        EventType::Attach,
        Some(DeviceHandle(1)),
    )]);
    let context = DiscoveryContext::start(runtime.as_ref(), settings(10, 1000)).unwrap();
    assert!(wait_until(DEFAULT_TEST_TIMEOUT, || {
        !context.query_devices().is_empty()
    }));

    let started = Instant::now();
    let found = pick_devices_from(&context, &enumeration_context(), &BackendDeviceGroup::default());

    assert_eq!(found.len(), 1);
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_multiple_devices_rejected_with_single_warning() {
    let runtime = MockRuntime::new();
    runtime.preload(vec![
        MockEvent::State(EventType::Attach, Some(DeviceHandle(1))),
        MockEvent::State(EventType::Attach, Some(DeviceHandle(2))),
    ]);
    let context = DiscoveryContext::start(runtime.as_ref(), settings(10, 1000)).unwrap();
    assert!(wait_until(DEFAULT_TEST_TIMEOUT, || {
        context.query_devices().len() == 2
    }));

    let capture = LogCapture::new();
    let found = tracing::subscriber::with_default(capture.subscriber(), || {
        pick_devices_from(&context, &enumeration_context(), &BackendDeviceGroup::default())
    });

    assert!(found.is_empty());
    assert_eq!(capture.count(Level::WARN), 1);
    assert!(capture.contains(Level::WARN, "single tracking device"));
}

#[test]
fn test_detached_device_still_discovered() {
    let runtime = MockRuntime::new();
    runtime.preload(vec![
        MockEvent::State(EventType::Attach, Some(DeviceHandle(4))),
        MockEvent::State(EventType::Detach, Some(DeviceHandle(4))),
    ]);
    let context = DiscoveryContext::start(runtime.as_ref(), settings(10, 10)).unwrap();
    let manager = runtime.manager().unwrap();
    assert!(wait_until(DEFAULT_TEST_TIMEOUT, || manager.pending_count() == 0
        && manager.drain_count() > 0));

    // The list is append-only, so the detached handle is still reported
    let found = pick_devices_from(&context, &enumeration_context(), &BackendDeviceGroup::default());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].handle(), DeviceHandle(4));
}

#[test]
fn test_device_info_builds_device() {
    let runtime = MockRuntime::new();
    runtime.preload(vec![MockEvent::State(
        EventType::Attach,
        Some(DeviceHandle(8)),
    )]);
    let context = DiscoveryContext::start(runtime.as_ref(), settings(10, 10)).unwrap();
    let group = BackendDeviceGroup {
        usb_devices: vec![UsbDeviceDescriptor {
            vendor_id: 0x8087,
            product_id: 0x0b37,
            bus_number: 2,
            device_address: 5,
        }],
    };
    let ctx = enumeration_context();

    let found = pick_devices_from(&context, &ctx, &group);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].device_data(), &group);

    let device = found[0].create_device(ctx.clone(), true);
    assert_eq!(device.handle(), DeviceHandle(8));
    assert_eq!(device.context().name(), "test");
    assert!(device.notifications_registered());

    // Device keeps the manager alive after the context is gone
    drop(context);
    assert_eq!(device.runtime_version(), runtime.manager().unwrap().version());

    let generic = found[0].create(ctx, false).unwrap();
    assert_eq!(generic.device_data().usb_devices.len(), 1);
}

#[tokio::test]
async fn test_discover_async() {
    let runtime = MockRuntime::new();
    let context = Arc::new(DiscoveryContext::start(runtime.as_ref(), settings(50, 10)).unwrap());
    runtime.manager().unwrap().push_attach(DeviceHandle(6));

    let found = discover_async(
        context.clone(),
        enumeration_context(),
        BackendDeviceGroup::default(),
    )
    .await
    .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].handle(), DeviceHandle(6));
}
