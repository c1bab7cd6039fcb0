//! Discovery context
//!
//! Owns the tracking manager, the event thread draining it and the device
//! list the listener appends to.
//!
//! Event thread states:
//! 1. Wait for the manager slot to be filled (condition variable).
//! 2. Poll: drain runtime events, sleep the poll interval, stop once disposed.
//! 3. Return; `shutdown` joins the thread.

use crate::config::DiscoverySettings;
use crate::error::{DiscoveryError, Result};
use crate::listener::DeviceEventListener;
use common::{PresenceEvent, PresenceReceiver, PresenceSender, PublishOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, error, info};
use std::any::Any;
use tracking::{DeviceHandle, RuntimeVersion, TrackingError, TrackingManager, TrackingRuntime};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Device list and presence subscribers shared with the listener
///
/// The list is append-only: detach events do not remove entries.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: Mutex<Vec<DeviceHandle>>,
    subscribers: Mutex<Vec<PresenceSender>>,
}

impl DeviceRegistry {
    pub(crate) fn append(&self, device: DeviceHandle) {
        lock(&self.devices).push(device);
    }

    /// Point-in-time copy of the device list
    pub fn snapshot(&self) -> Vec<DeviceHandle> {
        lock(&self.devices).clone()
    }

    /// Register a new presence subscriber
    pub fn subscribe(&self, capacity: usize) -> PresenceReceiver {
        let (tx, rx) = common::create_presence_channel(capacity);
        lock(&self.subscribers).push(tx);
        rx
    }

    pub(crate) fn publish(&self, event: PresenceEvent) {
        lock(&self.subscribers).retain(|tx| match tx.publish(event.clone()) {
            PublishOutcome::Delivered => true,
            PublishOutcome::Dropped => {
                debug!("Presence subscriber full, dropped {:?}", event);
                true
            }
            PublishOutcome::Closed => false,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown"
    }
}

enum SlotState {
    Pending,
    Ready(Arc<dyn TrackingManager>),
    Failed,
}

/// State shared between the context and its event thread
struct EventLoopShared {
    disposed: AtomicBool,
    slot: Mutex<SlotState>,
    slot_changed: Condvar,
}

impl EventLoopShared {
    fn new() -> Self {
        Self {
            disposed: AtomicBool::new(false),
            slot: Mutex::new(SlotState::Pending),
            slot_changed: Condvar::new(),
        }
    }

    fn set_slot(&self, state: SlotState) {
        *lock(&self.slot) = state;
        self.slot_changed.notify_all();
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        // Take the slot lock so a waiter cannot miss the wakeup.
        let _guard = lock(&self.slot);
        self.slot_changed.notify_all();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Block until the manager is available, creation failed, or disposal
    fn wait_for_manager(&self) -> Option<Arc<dyn TrackingManager>> {
        let mut state = lock(&self.slot);
        loop {
            match &*state {
                SlotState::Ready(manager) => return Some(manager.clone()),
                SlotState::Failed => return None,
                SlotState::Pending if self.is_disposed() => return None,
                SlotState::Pending => {
                    state = self
                        .slot_changed
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}

fn run_event_loop(shared: Arc<EventLoopShared>, settings: DiscoverySettings) {
    let Some(manager) = shared.wait_for_manager() else {
        debug!("Event thread exiting before a manager became available");
        return;
    };

    let poll_interval = settings.poll_interval();
    debug!("Event thread polling every {:?}", poll_interval);

    loop {
        let drained = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            manager.handle_events();
        }));
        if let Err(e) = drained {
            error!("Panic while draining tracking events: {:?}", e);
        }

        std::thread::sleep(poll_interval);

        if shared.is_disposed() {
            break;
        }
    }

    debug!("Event thread stopped");
}

/// Process-wide device presence tracker
///
/// Dropping the context disposes it and joins the event thread.
pub struct DiscoveryContext {
    manager: Arc<dyn TrackingManager>,
    registry: Arc<DeviceRegistry>,
    _listener: Arc<DeviceEventListener>,
    shared: Arc<EventLoopShared>,
    thread: Mutex<Option<JoinHandle<()>>>,
    settings: DiscoverySettings,
    version: RuntimeVersion,
}

impl DiscoveryContext {
    /// Create the manager and start the event thread
    ///
    /// Fails with `ManagerUnavailable` if the runtime cannot create a
    /// manager; the event thread is stopped before returning.
    pub fn start(runtime: &dyn TrackingRuntime, settings: DiscoverySettings) -> Result<Self> {
        let registry = Arc::new(DeviceRegistry::default());
        let listener = Arc::new(DeviceEventListener::new(Arc::downgrade(&registry)));
        let shared = Arc::new(EventLoopShared::new());

        let thread = {
            let shared = shared.clone();
            let settings = settings.clone();
            std::thread::Builder::new()
                .name("tm-events".to_string())
                .spawn(move || run_event_loop(shared, settings))
                .map_err(DiscoveryError::Spawn)?
        };

        let created = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            runtime.create_instance(listener.clone())
        }))
        .unwrap_or_else(|panic| {
            Err(TrackingError::CreateFailed(format!(
                "runtime panicked: {}",
                panic_message(panic.as_ref())
            )))
        });

        let manager = match created {
            Ok(manager) => manager,
            Err(e) => {
                error!("Failed to create tracking manager: {}", e);
                shared.set_slot(SlotState::Failed);
                shared.dispose();
                if thread.join().is_err() {
                    error!("Event thread panicked");
                }
                return Err(DiscoveryError::ManagerUnavailable(e));
            }
        };

        shared.set_slot(SlotState::Ready(manager.clone()));

        let version = manager.version();
        info!("Tracking runtime version {}", version);

        Ok(Self {
            manager,
            registry,
            _listener: listener,
            shared,
            thread: Mutex::new(Some(thread)),
            settings,
            version,
        })
    }

    /// Shared manager handle, kept alive by every device built from it
    pub fn get_manager(&self) -> Arc<dyn TrackingManager> {
        self.manager.clone()
    }

    /// Point-in-time copy of the attached device list
    pub fn query_devices(&self) -> Vec<DeviceHandle> {
        self.registry.snapshot()
    }

    /// Ask the event thread to stop; does not wait for it
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Dispose and join the event thread
    ///
    /// Safe to call any number of times.
    pub fn shutdown(&self) {
        self.dispose();

        let Some(handle) = lock(&self.thread).take() else {
            return;
        };

        if handle.thread().id() == std::thread::current().id() {
            return;
        }

        if handle.join().is_err() {
            error!("Event thread panicked");
        } else {
            debug!("Event thread joined");
        }
    }

    /// Subscribe to attach/detach/error notifications
    pub fn subscribe(&self) -> PresenceReceiver {
        self.registry
            .subscribe(self.settings.presence_channel_capacity)
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Runtime version reported at start
    pub fn version(&self) -> RuntimeVersion {
        self.version
    }
}

impl Drop for DiscoveryContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DiscoveryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryContext")
            .field("devices", &self.registry.snapshot())
            .field("disposed", &self.is_disposed())
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::{DEFAULT_TEST_TIMEOUT, MockRuntime, wait_until};
    use std::time::Duration;

    #[test]
    fn test_wait_for_manager_returns_on_dispose() {
        let shared = Arc::new(EventLoopShared::new());
        let waiter = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.wait_for_manager().is_none())
        };

        std::thread::sleep(Duration::from_millis(10));
        shared.dispose();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_failed_slot_wakes_waiter() {
        let shared = Arc::new(EventLoopShared::new());
        let waiter = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.wait_for_manager().is_none())
        };

        shared.set_slot(SlotState::Failed);
        assert!(waiter.join().unwrap());
    }

    struct PanickingRuntime;

    impl TrackingRuntime for PanickingRuntime {
        fn create_instance(
            &self,
            _listener: Arc<dyn tracking::Listener>,
        ) -> tracking::Result<Arc<dyn TrackingManager>> {
            panic!("firmware loader crashed");
        }
    }

    #[test]
    fn test_runtime_panic_stops_event_thread() {
        let err = DiscoveryContext::start(&PanickingRuntime, DiscoverySettings::default())
            .unwrap_err();

        match err {
            DiscoveryError::ManagerUnavailable(TrackingError::CreateFailed(message)) => {
                assert!(message.contains("firmware loader crashed"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_event_thread_drains_until_disposed() {
        let runtime = MockRuntime::new();
        let context = DiscoveryContext::start(runtime.as_ref(), DiscoverySettings::default())
            .unwrap();
        let mock = runtime.manager().unwrap();

        assert!(wait_until(DEFAULT_TEST_TIMEOUT, || mock.drain_count() > 2));

        context.shutdown();
        let drains = mock.drain_count();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(mock.drain_count(), drains);
    }

    #[test]
    fn test_listener_runs_on_event_thread() {
        let runtime = MockRuntime::new();
        let context = DiscoveryContext::start(runtime.as_ref(), DiscoverySettings::default())
            .unwrap();
        let mock = runtime.manager().unwrap();
        mock.push_attach(DeviceHandle(1));

        assert!(wait_until(DEFAULT_TEST_TIMEOUT, || !context
            .query_devices()
            .is_empty()));
        assert_ne!(mock.draining_thread(), Some(std::thread::current().id()));
    }
}
