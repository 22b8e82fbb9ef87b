//! Trait abstractions for the session core's collaborators.
//!
//! The core supervises and advances playback but implements neither the
//! catalog lookup, the audio pipeline, nor the voice transport. Those live
//! behind the traits here, injected as `Arc<dyn Trait>`, which also keeps
//! every state machine testable against in-memory mocks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::SessionResult;
use crate::track::{SourceKind, Track};

/// Close code the voice transport reports when the bot was moved to another
/// channel or kicked from it.
pub const CLOSE_CODE_MOVED_OR_KICKED: u16 = 4014;

/// Why a voice connection left the Ready state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Our side closed the connection deliberately.
    CleanClose,
    /// The transport closed us with [`CLOSE_CODE_MOVED_OR_KICKED`]; it may
    /// recover on its own if the bot was only moved between channels.
    MovedOrKicked,
    /// The link dropped without a clean close.
    NetworkLoss,
}

/// Lifecycle states of the voice transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Establishing or re-establishing the link.
    Connecting,
    /// Link up, negotiating the media session.
    Signalling,
    /// Fully connected and able to carry audio.
    Ready,
    /// The link went down; the reason decides the recovery policy.
    Disconnected {
        reason: DisconnectReason,
        close_code: u16,
    },
    /// Permanently gone. Terminal.
    Destroyed,
}

/// States of the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing playing; also the state reached when a track finishes.
    Idle,
    /// A resource is being prepared for playback.
    Buffering,
    /// Audio is flowing.
    Playing,
    /// Paused by user command.
    Paused,
    /// Paused by the engine itself (no connected transport to play into).
    AutoPaused,
}

/// A state-change notification from a collaborator handle.
///
/// The supervising state machines keep their own recorded state and
/// transition on `new`; `old` is carried for logging only, since duplicated
/// deliveries can repeat it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange<S> {
    pub old: S,
    pub new: S,
}

/// A materialized, immediately playable resource.
///
/// The stream provider turns a track's catalog URL into this; the playback
/// engine consumes it. The core only carries it between the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    /// Direct stream locator the engine can open.
    pub stream_url: String,
    /// Container/mime hint, when the provider knows it.
    pub content_type: Option<String>,
}

/// Resolves user queries into playable tracks.
///
/// Implemented against an external catalog; any transient failure surfaces
/// as a resolution error and is treated as not-found for that call.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolves a single query (free text or link) into a track.
    async fn resolve(&self, query: &str, hint: SourceKind) -> SessionResult<Track>;

    /// Resolves a playlist query into its tracks, preserving playlist order.
    ///
    /// An empty list is a valid outcome (empty playlist), distinct from an
    /// error.
    async fn resolve_playlist(&self, query: &str, hint: SourceKind)
        -> SessionResult<Vec<Track>>;
}

/// Opens a track's locator into a playable stream.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Materializes the given track URL into an [`AudioSource`].
    ///
    /// Must be idempotent per call with no partial-open side effects, so the
    /// controller can safely retry with the next track after a failure.
    async fn open(&self, url: &str) -> SessionResult<AudioSource>;
}

/// Handle to one live voice transport connection.
///
/// Connecting to a channel happens in the embedding bot; the core receives
/// the already-created handle and supervises it from there.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Attempts to re-establish the connection with its last known target.
    ///
    /// Increments the handle's own rejoin counter. Returns whether a rejoin
    /// could be initiated.
    async fn rejoin(&self) -> bool;

    /// Permanently tears the connection down. Idempotent: destroying an
    /// already-destroyed connection is a no-op.
    async fn destroy(&self);

    /// Re-initializes networking parameters in place.
    ///
    /// Called when the transport renegotiates (Ready back to Connecting);
    /// without it the link goes silent after about a minute.
    async fn reinit_networking(&self);

    /// Attaches a playback engine so its audio flows into this connection.
    fn subscribe_engine(&self, engine: Arc<dyn PlaybackEngine>);

    /// Rejoin attempts made so far, maintained by the handle itself.
    fn rejoin_attempts(&self) -> u32;

    /// Subscribes to connection state changes.
    fn state_changes(&self) -> broadcast::Receiver<StateChange<ConnectionState>>;
}

/// Handle to one playback engine instance.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Starts playing the given source, replacing whatever was active.
    async fn play(&self, source: AudioSource);

    /// Halts playback. The engine reports Idle through its state stream.
    async fn stop(&self);

    /// Pauses playback.
    async fn pause(&self);

    /// Resumes paused playback.
    async fn resume(&self);

    /// Elapsed position in the active resource; zero when idle.
    fn position(&self) -> Duration;

    /// Subscribes to engine state changes.
    fn state_changes(&self) -> broadcast::Receiver<StateChange<PlaybackState>>;
}

/// Creates a fresh playback engine for each new session.
pub trait PlaybackEngineFactory: Send + Sync {
    /// Builds one engine instance.
    fn create(&self) -> Arc<dyn PlaybackEngine>;
}
