//! In-process command transport backed by flume channels.
//!
//! One unbounded channel per queue name. The consuming side is handed out
//! via [`MemoryTransport::subscribe`]; anything draining that receiver
//! plays the role of the destination service. Used by tests and local
//! wiring; broker adapters implement the same traits against a real
//! message bus.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::{CommandChannel, CommandTransport, DispatchError};

/// A command as it appears on a queue.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandMessage {
    pub pattern: String,
    pub payload: Value,
}

/// In-memory transport multiplexing named queues over flume channels.
#[derive(Default)]
pub struct MemoryTransport {
    queues: Mutex<FxHashMap<String, flume::Sender<CommandMessage>>>,
    receivers: Mutex<FxHashMap<String, flume::Receiver<CommandMessage>>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receiver side of a queue, creating the queue if needed.
    ///
    /// Receivers are cloneable; messages go to whichever clone receives
    /// first (point-to-point, not broadcast).
    #[must_use]
    pub fn subscribe(&self, queue: &str) -> flume::Receiver<CommandMessage> {
        self.ensure_queue(queue);
        self.receivers
            .lock()
            .expect("memory transport poisoned")
            .get(queue)
            .cloned()
            .expect("queue registered by ensure_queue")
    }

    fn ensure_queue(&self, queue: &str) {
        let mut queues = self.queues.lock().expect("memory transport poisoned");
        if !queues.contains_key(queue) {
            let (tx, rx) = flume::unbounded();
            queues.insert(queue.to_string(), tx);
            self.receivers
                .lock()
                .expect("memory transport poisoned")
                .insert(queue.to_string(), rx);
        }
    }
}

#[async_trait]
impl CommandTransport for MemoryTransport {
    async fn open(&self, queue: &str) -> Result<Arc<dyn CommandChannel>, DispatchError> {
        self.ensure_queue(queue);
        let sender = self
            .queues
            .lock()
            .expect("memory transport poisoned")
            .get(queue)
            .cloned()
            .expect("queue registered by ensure_queue");
        Ok(Arc::new(MemoryChannel {
            queue: queue.to_string(),
            sender,
        }))
    }
}

struct MemoryChannel {
    queue: String,
    sender: flume::Sender<CommandMessage>,
}

#[async_trait]
impl CommandChannel for MemoryChannel {
    async fn send(&self, pattern: &str, payload: Value) -> Result<(), DispatchError> {
        self.sender
            .send(CommandMessage {
                pattern: pattern.to_string(),
                payload,
            })
            .map_err(|e| DispatchError::SendFailed {
                queue: self.queue.clone(),
                message: e.to_string(),
            })
    }
}
