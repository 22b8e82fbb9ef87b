//! Bridge implementation that maps domain events to broadcast transport.
//!
//! The [`BroadcastEventBridge`] lives at the boundary between the session
//! core and its consumers, forwarding typed domain events into a broadcast
//! channel the embedding bot's reply layer subscribes to.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::{ConnectionEvent, PlaybackEvent, QueueEvent, SessionEvent};

/// Bridges domain events to a broadcast channel.
///
/// Implements [`EventEmitter`] by forwarding events to a
/// `tokio::sync::broadcast` channel that reply formatters and dashboards
/// subscribe to.
///
/// The bridge also forwards to an optional external emitter that can be set
/// after construction, for embedders that deliver events through their own
/// transport in addition to the channel.
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks. The
/// external emitter sits behind an `RwLock` so it can be set late.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<SessionEvent>,
    /// Optional external emitter for embedder-specific event delivery.
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a new bridge wrapping an existing broadcast sender.
    pub fn with_sender(tx: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter for embedder-specific event delivery.
    ///
    /// Can be called after construction, which is useful when the embedder's
    /// handle isn't available until later in startup.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Returns a reference to the broadcast sender.
    pub fn sender(&self) -> &broadcast::Sender<SessionEvent> {
        &self.tx
    }
}

/// Generates an [`EventEmitter`] method that forwards to the external emitter
/// (if set) and then sends to the broadcast channel.
macro_rules! impl_emit {
    ($method:ident, $event_ty:ty, $variant:ident) => {
        fn $method(&self, event: $event_ty) {
            if let Some(ref emitter) = *self.external_emitter.read() {
                emitter.$method(event.clone());
            }
            if let Err(e) = self.tx.send(SessionEvent::$variant(event)) {
                tracing::trace!("no broadcast receivers: {}", e);
            }
        }
    };
}

impl EventEmitter for BroadcastEventBridge {
    impl_emit!(emit_queue, QueueEvent, Queue);
    impl_emit!(emit_playback, PlaybackEvent, Playback);
    impl_emit!(emit_connection, ConnectionEvent, Connection);
}
