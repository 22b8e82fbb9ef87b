//! Bardsong Core - session engine for a voice-channel music bot.
//!
//! This crate owns everything between a user's playback command and the
//! audio pipeline: per-group track queues, supervision of the voice
//! connection (kick grace, backed-off rejoins, ready timeouts), and the
//! advance logic that keeps the queue flowing when tracks finish or fail.
//! Catalog lookup, streaming, and the actual transport live in the embedding
//! bot behind trait handles.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`events`]: Domain events for chat replies, dashboards, and logs
//! - [`config`]: Supervision and playback tunables
//! - [`track`]: Track metadata and duration formatting
//! - [`queue`]: The per-group track queue and its rendered summary
//! - [`traits`]: Collaborator handles the embedder implements
//! - [`session`]: The per-group session and its state machines
//! - [`registry`]: One-session-per-group ownership and teardown
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The embedding bot provides implementations of:
//!
//! - [`TrackResolver`](traits::TrackResolver): catalog queries to tracks
//! - [`StreamProvider`](traits::StreamProvider): track URLs to open streams
//! - [`VoiceConnection`](traits::VoiceConnection): the live voice transport
//! - [`PlaybackEngine`](traits::PlaybackEngine): the audio pipeline
//! - [`EventEmitter`](events::EventEmitter): event delivery
//! - [`TaskSpawner`](runtime::TaskSpawner): background task spawning

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod events;
pub mod queue;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod track;
pub mod traits;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at the crate root
pub use config::CoreConfig;
pub use error::{SessionError, SessionResult};
pub use events::{
    BroadcastEventBridge, ConnectionEvent, EndReason, EventEmitter, LoggingEventEmitter,
    NoopEventEmitter, PlaybackEvent, QueueEvent, SessionEvent,
};
pub use queue::TrackQueue;
pub use registry::SessionRegistry;
pub use runtime::{TaskSpawner, TokioSpawner};
pub use session::{GroupId, Session};
pub use track::{format_duration, SourceKind, Track};
pub use traits::{
    AudioSource, ConnectionState, DisconnectReason, PlaybackEngine, PlaybackEngineFactory,
    PlaybackState, StateChange, StreamProvider, TrackResolver, VoiceConnection,
    CLOSE_CODE_MOVED_OR_KICKED,
};
pub use utils::now_millis;
