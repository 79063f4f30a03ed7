//! Event bus for inter-component communication
//!
//! Uses tokio::sync::broadcast for pub/sub pattern.
//! Events are typed and can carry payloads.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::adapters::receiver::{ReceiverSnapshot, Source};

/// Event types that can be published on the bus
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum BusEvent {
    /// Any field of the receiver state changed
    ReceiverUpdated {
        host: String,
        snapshot: Box<ReceiverSnapshot>,
    },
    NowPlayingChanged {
        host: String,
        source: Option<Source>,
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
    },
    VolumeChanged {
        host: String,
        value: f64,
        is_muted: bool,
    },
    /// Published once when polls start failing, not on every failure
    ReceiverUnreachable {
        host: String,
        consecutive_failures: u32,
    },
    ReceiverRecovered {
        host: String,
    },
    CommandFailed {
        host: String,
        command: String,
        error: String,
    },
    AdapterStopped {
        adapter: String,
    },
}

/// Event bus handle for publishing and subscribing
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: BusEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    /// Default capacity (256 events)
    fn default() -> Self {
        Self::new(256)
    }
}

/// Shared event bus wrapped in Arc for thread-safe sharing
pub type SharedBus = Arc<EventBus>;

/// Create a new shared event bus
pub fn create_bus() -> SharedBus {
    Arc::new(EventBus::default())
}
