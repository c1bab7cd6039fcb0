//! Test utilities for tm-discovery
//!
//! Provides a scripted tracking runtime, a log capture layer and timeout
//! helpers for testing across crates.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{MockRuntime, RecordingListener};
//! use std::sync::Arc;
//! use tracking::{DeviceHandle, TrackingRuntime};
//!
//! let runtime = MockRuntime::new();
//! let listener = Arc::new(RecordingListener::default());
//! let manager = runtime.create_instance(listener.clone()).unwrap();
//!
//! runtime.manager().unwrap().push_attach(DeviceHandle(1));
//! manager.handle_events();
//! assert_eq!(listener.attached(), vec![DeviceHandle(1)]);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracking::{
    DeviceHandle, ErrorCode, EventType, Listener, RuntimeVersion, TrackingError,
    TrackingManager, TrackingRuntime,
};

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Version reported by mock managers unless overridden
pub const MOCK_RUNTIME_VERSION: RuntimeVersion = RuntimeVersion(0x0100_0002);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event queued on a mock manager, delivered on the next drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    State(EventType, Option<DeviceHandle>),
    Error(ErrorCode, Option<DeviceHandle>),
}

/// Scripted manager: events pushed from any thread are delivered to the
/// listener on whichever thread calls `handle_events`
pub struct MockManager {
    listener: Arc<dyn Listener>,
    pending: Mutex<VecDeque<MockEvent>>,
    drains: AtomicUsize,
    draining_thread: Mutex<Option<std::thread::ThreadId>>,
    version: RuntimeVersion,
}

impl MockManager {
    fn new(listener: Arc<dyn Listener>, version: RuntimeVersion) -> Self {
        Self {
            listener,
            pending: Mutex::new(VecDeque::new()),
            drains: AtomicUsize::new(0),
            draining_thread: Mutex::new(None),
            version,
        }
    }

    /// Queue an event for the next drain
    pub fn push(&self, event: MockEvent) {
        lock(&self.pending).push_back(event);
    }

    pub fn push_attach(&self, device: DeviceHandle) {
        self.push(MockEvent::State(EventType::Attach, Some(device)));
    }

    pub fn push_detach(&self, device: Option<DeviceHandle>) {
        self.push(MockEvent::State(EventType::Detach, device));
    }

    pub fn push_error(&self, code: ErrorCode, device: Option<DeviceHandle>) {
        self.push(MockEvent::Error(code, device));
    }

    /// Number of completed `handle_events` calls
    pub fn drain_count(&self) -> usize {
        self.drains.load(Ordering::SeqCst)
    }

    /// Number of events not yet delivered
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Thread that performed the most recent drain
    pub fn draining_thread(&self) -> Option<std::thread::ThreadId> {
        *lock(&self.draining_thread)
    }
}

impl TrackingManager for MockManager {
    fn handle_events(&self) {
        *lock(&self.draining_thread) = Some(std::thread::current().id());

        let events: Vec<MockEvent> = lock(&self.pending).drain(..).collect();
        for event in events {
            match event {
                MockEvent::State(kind, device) => self.listener.on_state_changed(kind, device),
                MockEvent::Error(code, device) => self.listener.on_error(code, device),
            }
        }

        self.drains.fetch_add(1, Ordering::SeqCst);
    }

    fn version(&self) -> RuntimeVersion {
        self.version
    }
}

/// Scripted runtime handing out `MockManager`s
pub struct MockRuntime {
    fail_create: AtomicBool,
    version: RuntimeVersion,
    initial_events: Mutex<Vec<MockEvent>>,
    manager: Mutex<Option<Arc<MockManager>>>,
    created: AtomicUsize,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_version(MOCK_RUNTIME_VERSION))
    }

    /// Runtime whose `create_instance` always fails
    pub fn failing() -> Arc<Self> {
        let runtime = Self::with_version(MOCK_RUNTIME_VERSION);
        runtime.fail_create.store(true, Ordering::SeqCst);
        Arc::new(runtime)
    }

    pub fn with_version(version: RuntimeVersion) -> Self {
        Self {
            fail_create: AtomicBool::new(false),
            version,
            initial_events: Mutex::new(Vec::new()),
            manager: Mutex::new(None),
            created: AtomicUsize::new(0),
        }
    }

    /// Events queued on every manager as soon as it is created
    pub fn preload(&self, events: Vec<MockEvent>) {
        *lock(&self.initial_events) = events;
    }

    /// Most recently created manager
    pub fn manager(&self) -> Option<Arc<MockManager>> {
        lock(&self.manager).clone()
    }

    /// Number of successful `create_instance` calls
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl TrackingRuntime for MockRuntime {
    fn create_instance(
        &self,
        listener: Arc<dyn Listener>,
    ) -> tracking::Result<Arc<dyn TrackingManager>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(TrackingError::CreateFailed("mock runtime unavailable".into()));
        }

        let manager = Arc::new(MockManager::new(listener, self.version));
        for event in lock(&self.initial_events).iter().cloned() {
            manager.push(event);
        }

        *lock(&self.manager) = Some(manager.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(manager)
    }
}

/// Listener that records every callback
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<MockEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<MockEvent> {
        lock(&self.events).clone()
    }

    /// Handles of all attach notifications, in delivery order
    pub fn attached(&self) -> Vec<DeviceHandle> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                MockEvent::State(EventType::Attach, device) => *device,
                _ => None,
            })
            .collect()
    }
}

impl Listener for RecordingListener {
    fn on_state_changed(&self, event: EventType, device: Option<DeviceHandle>) {
        lock(&self.events).push(MockEvent::State(event, device));
    }

    fn on_error(&self, code: ErrorCode, device: Option<DeviceHandle>) {
        lock(&self.events).push(MockEvent::Error(code, device));
    }
}

/// A captured log record
#[derive(Debug, Clone)]
pub struct CapturedRecord {
    pub level: Level,
    pub message: String,
}

/// Tracing layer that keeps every record it sees
///
/// Install with `tracing::subscriber::with_default(capture.subscriber(), ..)`;
/// only records emitted on that thread are captured.
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriber routing all records into this capture
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        use tracing_subscriber::prelude::*;
        tracing_subscriber::registry().with(self.clone())
    }

    pub fn records(&self) -> Vec<CapturedRecord> {
        lock(&self.records).clone()
    }

    /// Number of records at exactly `level`
    pub fn count(&self, level: Level) -> usize {
        lock(&self.records)
            .iter()
            .filter(|r| r.level == level)
            .count()
    }

    /// Whether any record at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        lock(&self.records)
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        lock(&self.records).push(CapturedRecord {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}

/// Poll `condition` until it holds or `timeout` elapses
///
/// Returns whether the condition was met.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Timeout wrapper for async tests
///
/// Wraps an async operation with a timeout to prevent tests from hanging.
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_manager_delivers_in_order() {
        let runtime = MockRuntime::new();
        let listener = Arc::new(RecordingListener::default());
        let manager = runtime.create_instance(listener.clone()).unwrap();
        let mock = runtime.manager().unwrap();

        mock.push_attach(DeviceHandle(1));
        mock.push_detach(None);
        mock.push_error(ErrorCode(0x20), Some(DeviceHandle(1)));
        mock.push_attach(DeviceHandle(2));
        assert_eq!(mock.pending_count(), 4);

        manager.handle_events();

        assert_eq!(mock.pending_count(), 0);
        assert_eq!(mock.drain_count(), 1);
        assert_eq!(listener.attached(), vec![DeviceHandle(1), DeviceHandle(2)]);
        assert_eq!(
            listener.events()[2],
            MockEvent::Error(ErrorCode(0x20), Some(DeviceHandle(1)))
        );
    }

    #[test]
    fn test_failing_runtime() {
        let runtime = MockRuntime::failing();
        let listener = Arc::new(RecordingListener::default());

        assert!(runtime.create_instance(listener).is_err());
        assert_eq!(runtime.created_count(), 0);
        assert!(runtime.manager().is_none());
    }

    #[test]
    fn test_preloaded_events() {
        let runtime = MockRuntime::new();
        runtime.preload(vec![MockEvent::State(
            EventType::Attach,
            Some(DeviceHandle(9)),
        )]);
        let listener = Arc::new(RecordingListener::default());
        let manager = runtime.create_instance(listener.clone()).unwrap();

        manager.handle_events();
        assert_eq!(listener.attached(), vec![DeviceHandle(9)]);
        assert_eq!(manager.version(), MOCK_RUNTIME_VERSION);
    }

    #[test]
    fn test_log_capture() {
        let capture = LogCapture::new();
        tracing::subscriber::with_default(capture.subscriber(), || {
            tracing::warn!("only {} device", "one");
            tracing::info!("hello");
        });

        assert_eq!(capture.count(Level::WARN), 1);
        assert!(capture.contains(Level::WARN, "only one device"));
        assert!(!capture.contains(Level::ERROR, "hello"));
    }

    #[test]
    fn test_wait_until() {
        assert!(wait_until(Duration::from_millis(50), || true));
        assert!(!wait_until(Duration::from_millis(5), || false));
    }

    #[tokio::test]
    async fn test_with_timeout_failure() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            42
        })
        .await;

        assert!(result.is_err());
    }
}
