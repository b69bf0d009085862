//! Fire-and-forget command dispatch over named queues.
//!
//! The engine is a producer only: an ACTION node renders its payload and
//! sends `{ pattern, payload }` to a point-to-point channel, then moves
//! on. There is no acknowledgement, no reply, and deliberately no retry —
//! a dispatch failure becomes a terminal run error, and changing that
//! would change observable failure semantics callers rely on.
//!
//! Transport is pluggable behind two traits. [`CommandDispatcher`] owns an
//! explicit per-queue channel pool: one logical channel per distinct queue
//! name, created lazily on first use and cached for the process lifetime.
//! The pool is a plain owned object injected into the engine's dependency
//! set, never module-level state.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

pub mod memory;

pub use memory::{CommandMessage, MemoryTransport};

#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    #[error("cannot open command channel {queue}: {message}")]
    #[diagnostic(
        code(eventweave::dispatch::open),
        help("Check that the command transport is reachable.")
    )]
    ChannelUnavailable { queue: String, message: String },

    #[error("send to {queue} failed: {message}")]
    #[diagnostic(code(eventweave::dispatch::send))]
    SendFailed { queue: String, message: String },
}

/// One open point-to-point channel to a named command queue.
///
/// Implementations must be safe for concurrent use from overlapping
/// traversals.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Fire-and-forget send. Errors propagate to the caller; the channel
    /// itself performs no retry.
    async fn send(&self, pattern: &str, payload: Value) -> Result<(), DispatchError>;
}

/// Factory for command channels, one per queue name.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn open(&self, queue: &str) -> Result<Arc<dyn CommandChannel>, DispatchError>;
}

/// Default queue name for a command pattern: the first dot-segment
/// suffixed with `_queue` (`"contracts.create"` → `"contracts_queue"`).
#[must_use]
pub fn derive_queue(pattern: &str) -> String {
    let service = pattern.split('.').next().unwrap_or(pattern);
    format!("{service}_queue")
}

/// Caching dispatcher over a [`CommandTransport`].
pub struct CommandDispatcher {
    transport: Arc<dyn CommandTransport>,
    channels: Mutex<FxHashMap<String, Arc<dyn CommandChannel>>>,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(transport: Arc<dyn CommandTransport>) -> Self {
        Self {
            transport,
            channels: Mutex::new(FxHashMap::default()),
        }
    }

    /// Send `{ pattern, payload }` to `queue`, opening and caching the
    /// channel on first use.
    #[tracing::instrument(skip(self, payload), err)]
    pub async fn dispatch(
        &self,
        queue: &str,
        pattern: &str,
        payload: Value,
    ) -> Result<(), DispatchError> {
        let channel = {
            let mut channels = self.channels.lock().await;
            match channels.get(queue) {
                Some(channel) => Arc::clone(channel),
                None => {
                    let channel = self.transport.open(queue).await?;
                    channels.insert(queue.to_string(), Arc::clone(&channel));
                    channel
                }
            }
        };
        channel.send(pattern, payload).await
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher").finish()
    }
}
