//! Event system for queue lifecycle notifications

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::broadcast;

/// Event key type
pub type EventKey = String;

/// Event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Empty,
    String(String),
    Map(HashMap<String, serde_json::Value>),
}

/// Queue event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Event key (e.g., "queue.entry.submitted", "queue.lane.closed")
    pub key: EventKey,

    /// Event payload
    pub payload: EventPayload,

    /// Timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl QueueEvent {
    /// Create a new event
    pub fn new(key: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            key: key.into(),
            payload,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create an event with no payload
    pub fn empty(key: impl Into<String>) -> Self {
        Self::new(key, EventPayload::Empty)
    }

    /// Create an event with a string payload
    pub fn with_string(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(key, EventPayload::String(message.into()))
    }

    /// Create an event with a map payload
    pub fn with_map(key: impl Into<String>, map: HashMap<String, serde_json::Value>) -> Self {
        Self::new(key, EventPayload::Map(map))
    }
}

/// Event emitter
#[derive(Clone)]
pub struct EventEmitter {
    sender: Arc<broadcast::Sender<QueueEvent>>,
}

impl EventEmitter {
    /// Create a new event emitter
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Emit an event
    pub fn emit(&self, event: QueueEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to filtered events as an `EventStream` (implements `Stream`)
    pub fn subscribe_filtered(
        &self,
        filter: impl Fn(&QueueEvent) -> bool + Send + Sync + 'static,
    ) -> EventStream {
        use tokio_stream::wrappers::BroadcastStream;
        use tokio_stream::StreamExt as TokioStreamExt;
        let stream = BroadcastStream::new(self.sender.subscribe())
            .filter_map(|r: Result<QueueEvent, _>| r.ok())
            .filter(move |e| filter(e));
        EventStream {
            inner: Box::pin(stream),
        }
    }

    /// Subscribe to all events as an `EventStream` (implements `Stream`)
    pub fn subscribe_stream(&self) -> EventStream {
        self.subscribe_filtered(|_| true)
    }
}

/// Event stream — implements `futures_core::Stream<Item = QueueEvent>`.
///
/// Returned by [`EventEmitter::subscribe_filtered`] and [`EventEmitter::subscribe_stream`].
/// Use `.next().await` via `StreamExt` from `tokio_stream` or `futures`, or call the
/// convenience [`EventStream::recv`] method directly.
pub struct EventStream {
    inner: Pin<Box<dyn Stream<Item = QueueEvent> + Send>>,
}

impl Stream for EventStream {
    type Item = QueueEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl EventStream {
    /// Receive the next matching event (convenience wrapper around `Stream::poll_next`)
    pub async fn recv(&mut self) -> Option<QueueEvent> {
        use tokio_stream::StreamExt;
        self.next().await
    }
}

/// Event catalog - predefined event keys
pub mod events {
    // Settings events
    pub const QUEUE_SETTINGS_UPDATED: &str = "queue.settings.updated";

    // Entry events
    pub const QUEUE_ENTRY_SUBMITTED: &str = "queue.entry.submitted";
    pub const QUEUE_ENTRY_REJECTED: &str = "queue.entry.rejected";
    pub const QUEUE_ENTRY_STATUS_CHANGED: &str = "queue.entry.status_changed";
    pub const QUEUE_ENTRY_COMPLETED: &str = "queue.entry.completed";

    // Lane events
    pub const QUEUE_LANE_CLOSED: &str = "queue.lane.closed";
}
