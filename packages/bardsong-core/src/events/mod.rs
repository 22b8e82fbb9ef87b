//! Event system for user-facing replies and observability.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the session core to emit events
//! - [`BroadcastEventBridge`] delivering events to subscribed consumers
//! - Event types for the queue, playback, and connection domains
//!
//! The embedding bot subscribes here to turn events into chat replies (the
//! now-playing announcement, queue confirmations); the core itself never
//! formats user-visible text beyond the bounded queue summary.

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::track::Track;

/// Events broadcast to consumers.
///
/// Each category has its own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Queue mutations worth announcing.
    Queue(QueueEvent),

    /// Playback lifecycle events.
    Playback(PlaybackEvent),

    /// Connection and session lifecycle events.
    Connection(ConnectionEvent),
}

/// Events related to queue contents.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueEvent {
    /// A single track was appended.
    TrackQueued {
        /// Group the session belongs to.
        group: String,
        /// The queued track.
        track: Track,
        /// Queue position it landed at (0 = playing now).
        position: usize,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A playlist resolution was appended in bulk.
    PlaylistQueued {
        /// Group the session belongs to.
        group: String,
        /// Number of tracks appended; 0 means the playlist was empty.
        count: usize,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to playback progress.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// A new track started playing.
    NowPlaying {
        /// Group the session belongs to.
        group: String,
        /// The track that just started.
        track: Track,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The queue ran out; the engine is idle.
    QueueFinished {
        /// Group the session belongs to.
        group: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Too many consecutive tracks failed to start; playback gave up until
    /// the next user command.
    Stalled {
        /// Group the session belongs to.
        group: String,
        /// How many starts failed back to back.
        #[serde(rename = "consecutiveFailures")]
        consecutive_failures: u32,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// The user asked the bot to leave.
    UserDisconnect,
    /// Kicked from the channel without recovering in the grace window.
    Kicked,
    /// All rejoin attempts were spent.
    RetriesExhausted,
    /// The connection never reached Ready in time.
    ConnectTimeout,
}

/// Events from connection supervision and session lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConnectionEvent {
    /// A rejoin was scheduled after a disconnect.
    Reconnecting {
        /// Group the session belongs to.
        group: String,
        /// Rejoin attempt number about to run (1-based).
        attempt: u32,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The session was torn down.
    SessionEnded {
        /// Group the session belonged to.
        group: String,
        /// Why it ended.
        reason: EndReason,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

// From implementations for converting inner events to SessionEvent
impl From<QueueEvent> for SessionEvent {
    fn from(event: QueueEvent) -> Self {
        SessionEvent::Queue(event)
    }
}

impl From<PlaybackEvent> for SessionEvent {
    fn from(event: PlaybackEvent) -> Self {
        SessionEvent::Playback(event)
    }
}

impl From<ConnectionEvent> for SessionEvent {
    fn from(event: ConnectionEvent) -> Self {
        SessionEvent::Connection(event)
    }
}
