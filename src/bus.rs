//! In-process domain event bus.
//!
//! Other services publish named facts ("affaire.validee",
//! "intervention.terminee") with arbitrary JSON payloads; the engine
//! consumes every event through one catch-all subscription — the
//! wildcard filter is the only filter shape the engine needs, since
//! matching against triggers and paused runs happens per event inside the
//! ingestion loop.
//!
//! The bus is a thin flume pair. Broker adapters stay outside the crate:
//! anything that can call [`EventBus::publish`] (or clone the sender)
//! integrates the engine with a real topic exchange.

use chrono::{DateTime, Utc};
use flume::r#async::RecvStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named fact delivered by the domain event bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub name: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl DomainEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Publish/subscribe channel for [`DomainEvent`]s.
///
/// The bus keeps its own receiver handle alive, so publishing never fails
/// while the bus exists, even before a subscriber attaches.
pub struct EventBus {
    sender: flume::Sender<DomainEvent>,
    receiver: flume::Receiver<DomainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Publish an event to all subscriptions.
    pub fn publish(&self, name: impl Into<String>, payload: Value) {
        let event = DomainEvent::new(name, payload);
        // Send cannot fail while `self.receiver` is alive.
        let _ = self.sender.send(event);
    }

    /// Sender handle for broker adapters feeding the bus.
    #[must_use]
    pub fn sender(&self) -> flume::Sender<DomainEvent> {
        self.sender.clone()
    }

    /// Catch-all subscription.
    ///
    /// Subscriptions share one queue: with several subscribers each event
    /// goes to exactly one of them (work distribution, not broadcast).
    /// The engine runs a single ingestion loop, which is the intended
    /// consumer.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.receiver.clone(),
        }
    }
}

/// Consuming side of the bus.
pub struct EventSubscription {
    receiver: flume::Receiver<DomainEvent>,
}

impl EventSubscription {
    /// Await the next event; `None` once every publisher is gone.
    pub async fn recv(&self) -> Option<DomainEvent> {
        self.receiver.recv_async().await.ok()
    }

    /// Stream view for `futures_util` combinators.
    #[must_use]
    pub fn into_stream(self) -> RecvStream<'static, DomainEvent> {
        self.receiver.into_stream()
    }
}
