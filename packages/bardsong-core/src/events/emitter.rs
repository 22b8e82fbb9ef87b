//! Event emitter abstraction for decoupling the core from delivery.
//!
//! The session machinery depends on the [`EventEmitter`] trait rather than a
//! concrete channel, enabling testing and alternative delivery (chat replies,
//! a dashboard, logs).

use super::{ConnectionEvent, PlaybackEvent, QueueEvent};

/// Trait for emitting domain events without knowledge of delivery.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyService {
///     fn do_something(&self) {
///         self.emitter.emit_queue(QueueEvent::TrackQueued { ... });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a queue mutation event.
    fn emit_queue(&self, event: QueueEvent);

    /// Emits a playback lifecycle event.
    fn emit_playback(&self, event: PlaybackEvent);

    /// Emits a connection/session lifecycle event.
    fn emit_connection(&self, event: ConnectionEvent);
}

/// No-op emitter for tests and headless embedding.
///
/// Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_queue(&self, _event: QueueEvent) {
        // No-op
    }

    fn emit_playback(&self, _event: PlaybackEvent) {
        // No-op
    }

    fn emit_connection(&self, _event: ConnectionEvent) {
        // No-op
    }
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_queue(&self, event: QueueEvent) {
        tracing::debug!(?event, "queue_event");
    }

    fn emit_playback(&self, event: PlaybackEvent) {
        tracing::debug!(?event, "playback_event");
    }

    fn emit_connection(&self, event: ConnectionEvent) {
        tracing::debug!(?event, "connection_event");
    }
}
