//! Presence event channel between the event thread and subscribers
//!
//! The listener runs on the event thread inside the runtime's drain call, so
//! publishing never blocks: a full or closed channel drops the event.

use async_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use serde::{Deserialize, Serialize};
use tracking::{DeviceHandle, ErrorCode};

/// Default channel capacity
pub const PRESENCE_CHANNEL_CAPACITY: usize = 64;

/// Device presence notifications mirrored from the listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceEvent {
    /// A device attached and was appended to the device list
    Attached {
        /// Handle supplied by the runtime
        device: DeviceHandle,
    },

    /// A device detached; the device list is not changed
    Detached {
        /// Handle supplied by the runtime, possibly stale or absent
        device: Option<DeviceHandle>,
    },

    /// The runtime reported an error
    Error {
        /// Vendor error code
        code: ErrorCode,
        /// Device the error pertains to, if any
        device: Option<DeviceHandle>,
    },
}

/// Publishing half, owned by the listener side
#[derive(Debug, Clone)]
pub struct PresenceSender {
    tx: Sender<PresenceEvent>,
}

/// Outcome of a non-blocking publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    /// Channel full, event dropped
    Dropped,
    /// Every receiver is gone
    Closed,
}

impl PresenceSender {
    /// Publish an event without blocking
    pub fn publish(&self, event: PresenceEvent) -> PublishOutcome {
        match self.tx.try_send(event) {
            Ok(()) => PublishOutcome::Delivered,
            Err(TrySendError::Full(_)) => PublishOutcome::Dropped,
            Err(TrySendError::Closed(_)) => PublishOutcome::Closed,
        }
    }

    /// Whether every receiver has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Subscribing half
#[derive(Debug, Clone)]
pub struct PresenceReceiver {
    rx: Receiver<PresenceEvent>,
}

impl PresenceReceiver {
    /// Receive the next event
    pub async fn recv_event(&self) -> crate::Result<PresenceEvent> {
        self.rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive the next event, blocking the current thread
    pub fn recv_blocking(&self) -> crate::Result<PresenceEvent> {
        self.rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive an event without waiting
    pub fn try_recv_event(&self) -> Option<PresenceEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a bounded presence channel
///
/// Returns (PresenceSender for the listener, PresenceReceiver for a subscriber)
pub fn create_presence_channel(capacity: usize) -> (PresenceSender, PresenceReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (PresenceSender { tx }, PresenceReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_presence_channel() {
        let (tx, rx) = create_presence_channel(4);

        let handle = std::thread::spawn(move || {
            tx.publish(PresenceEvent::Attached {
                device: DeviceHandle(7),
            })
        });
        assert_eq!(handle.join().unwrap(), PublishOutcome::Delivered);

        let event = rx.recv_event().await.unwrap();
        assert_eq!(
            event,
            PresenceEvent::Attached {
                device: DeviceHandle(7)
            }
        );
    }

    #[test]
    fn test_publish_never_blocks_when_full() {
        let (tx, rx) = create_presence_channel(1);
        let detach = PresenceEvent::Detached { device: None };

        assert_eq!(tx.publish(detach.clone()), PublishOutcome::Delivered);
        assert_eq!(tx.publish(detach.clone()), PublishOutcome::Dropped);
        assert_eq!(rx.len(), 1);

        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.publish(detach), PublishOutcome::Closed);
    }
}
