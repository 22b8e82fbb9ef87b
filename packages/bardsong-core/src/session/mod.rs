//! Live playback session for one group.
//!
//! A [`Session`] owns the track queue, the supervised voice connection, and
//! the playback engine for a single group (guild). Everything that touches
//! session state goes through one async mutex, so a user-issued seek can
//! never interleave with an automatic queue advance triggered by an engine
//! notification arriving at the same moment. Sessions of different groups
//! share nothing and run fully concurrently.
//!
//! Collaborator notifications reach the session through its event pump: a
//! spawned task that receives connection and engine state changes and feeds
//! them, one at a time, into the handlers in [`supervisor`] and [`playback`].

mod playback;
mod supervisor;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::{ConnectionEvent, EndReason, EventEmitter, QueueEvent};
use crate::queue::TrackQueue;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::track::{SourceKind, Track};
use crate::traits::{
    AudioSource, ConnectionState, PlaybackEngine, PlaybackState, StreamProvider, TrackResolver,
    VoiceConnection,
};
use crate::utils::now_millis;

/// Identity of a group (guild) owning at most one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    /// Creates a group id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The textual form of the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for GroupId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Serialized mutable state of one session.
///
/// Only ever touched while holding the session mutex.
pub(crate) struct SessionInner {
    /// The track queue; index 0 is now playing.
    pub(crate) queue: TrackQueue,
    /// Connection state as last reported by the transport.
    pub(crate) conn_state: ConnectionState,
    /// Engine state as last reported by the engine.
    pub(crate) engine_state: PlaybackState,
    /// Resource currently handed to the engine, for diagnostics.
    pub(crate) active: Option<AudioSource>,
    /// A play command was issued and the engine has not reported since.
    pub(crate) pending_start: bool,
    /// Back-to-back failed track starts in the current run.
    pub(crate) consecutive_failures: u32,
    /// Bumped on every connection transition; armed timers capture it and
    /// stand down when it moved on before they fired.
    pub(crate) conn_epoch: u64,
    /// Set once by teardown; everything becomes a no-op afterwards.
    pub(crate) finished: bool,
}

/// The live playback context for one group.
///
/// Created by the registry on the first playback command in a group and
/// destroyed through a single teardown path: explicit disconnect, an
/// unrecoverable connection, or a kick that did not self-recover.
pub struct Session {
    group: GroupId,
    /// Correlation id for logs.
    id: Uuid,
    config: CoreConfig,
    connection: Arc<dyn VoiceConnection>,
    engine: Arc<dyn PlaybackEngine>,
    resolver: Arc<dyn TrackResolver>,
    provider: Arc<dyn StreamProvider>,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
    /// Cancels the event pump and any armed supervision timers.
    cancel: CancellationToken,
    /// Removes this session from the registry; runs exactly once.
    cleanup: Box<dyn Fn() + Send + Sync>,
    self_weak: std::sync::Weak<Session>,
    inner: Mutex<SessionInner>,
}

impl Session {
    /// Creates the session, wires the engine into the connection, and spawns
    /// the event pump.
    ///
    /// The connection handle is expected to be freshly connected (or
    /// connecting); a ready-wait timer is armed immediately so a link that
    /// never comes up is destroyed rather than supervised forever.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn launch(
        group: GroupId,
        connection: Arc<dyn VoiceConnection>,
        engine: Arc<dyn PlaybackEngine>,
        resolver: Arc<dyn TrackResolver>,
        provider: Arc<dyn StreamProvider>,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
        config: CoreConfig,
        cleanup: Box<dyn Fn() + Send + Sync>,
    ) -> Arc<Self> {
        connection.subscribe_engine(Arc::clone(&engine));

        let summary_budget = config.summary_char_budget;
        let session = Arc::new_cyclic(|weak| Self {
            group,
            id: Uuid::new_v4(),
            config,
            connection,
            engine,
            resolver,
            provider,
            emitter,
            spawner,
            cancel: CancellationToken::new(),
            cleanup,
            self_weak: weak.clone(),
            inner: Mutex::new(SessionInner {
                queue: TrackQueue::new(summary_budget),
                conn_state: ConnectionState::Connecting,
                engine_state: PlaybackState::Idle,
                active: None,
                pending_start: false,
                consecutive_failures: 0,
                conn_epoch: 0,
                finished: false,
            }),
        });

        tracing::info!(group = %session.group, session = %session.id, "session created");
        session.spawn_pump();
        session.arm_ready_timeout(0);
        session
    }

    /// The group this session belongs to.
    #[must_use]
    pub fn group(&self) -> &GroupId {
        &self.group
    }

    /// Log-correlation id of this session.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    // ─────────────────────────────────────────────────────────────────────
    // Command surface
    // ─────────────────────────────────────────────────────────────────────

    /// Resolves a query and appends the track to the queue, starting
    /// playback if nothing is playing.
    ///
    /// # Returns
    /// The queued track and the position it landed at; position 0 means it
    /// plays right away.
    pub async fn play(&self, query: &str, hint: SourceKind) -> SessionResult<(Track, usize)> {
        let mut inner = self.inner.lock().await;
        self.ensure_active(&inner)?;

        let track = match self.resolver.resolve(query, hint).await {
            Ok(track) => track,
            Err(e) => {
                tracing::debug!(group = %self.group, query, error = %e, "resolution failed");
                return Err(e);
            }
        };

        let position = inner.queue.append(track.clone()) - 1;
        self.emitter.emit_queue(QueueEvent::TrackQueued {
            group: self.group.to_string(),
            track: track.clone(),
            position,
            timestamp: now_millis(),
        });

        self.start_next(&mut inner).await;
        Ok((track, position))
    }

    /// Resolves a playlist and appends its tracks in order.
    ///
    /// # Returns
    /// The number of tracks queued. Zero means the playlist resolved empty,
    /// which is an answer, not an error.
    pub async fn play_list(&self, query: &str, hint: SourceKind) -> SessionResult<usize> {
        let mut inner = self.inner.lock().await;
        self.ensure_active(&inner)?;

        let tracks = match self.resolver.resolve_playlist(query, hint).await {
            Ok(tracks) => tracks,
            Err(e) => {
                tracing::debug!(group = %self.group, query, error = %e, "playlist resolution failed");
                return Err(e);
            }
        };

        let count = inner.queue.append_bulk(tracks);
        self.emitter.emit_queue(QueueEvent::PlaylistQueued {
            group: self.group.to_string(),
            count,
            timestamp: now_millis(),
        });

        if count > 0 {
            self.start_next(&mut inner).await;
        }
        Ok(count)
    }

    /// Pauses the engine. No queue effect.
    pub async fn pause(&self) -> SessionResult<()> {
        let inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        self.engine.pause().await;
        Ok(())
    }

    /// Resumes the engine. No queue effect.
    pub async fn resume(&self) -> SessionResult<()> {
        let inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        self.engine.resume().await;
        Ok(())
    }

    /// Drops everything but the current track and halts the engine.
    ///
    /// The engine's idle notification then advances past the retained entry,
    /// leaving the queue empty with nothing to start.
    pub async fn stop(&self) -> SessionResult<()> {
        let mut inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        inner.queue.clear();
        self.engine.stop().await;
        Ok(())
    }

    /// Makes the track at `index` the next one to play, keeping all tracks.
    pub async fn seek(&self, index: usize) -> SessionResult<()> {
        let mut inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        inner.queue.seek(index)?;
        self.switch_track(&mut inner).await;
        Ok(())
    }

    /// Jumps to the track at `index`, discarding everything before it
    /// (except the current track, which the jump finishes off).
    pub async fn skip_to(&self, index: usize) -> SessionResult<()> {
        let mut inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        inner.queue.skip_to(index)?;
        self.switch_track(&mut inner).await;
        Ok(())
    }

    /// Skips exactly the current track.
    pub async fn skip(&self) -> SessionResult<()> {
        let mut inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        inner.queue.skip()?;
        self.switch_track(&mut inner).await;
        Ok(())
    }

    /// Removes the upcoming track at `index` from the queue.
    pub async fn remove(&self, index: usize) -> SessionResult<Track> {
        let mut inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        inner.queue.remove(index)
    }

    /// The current track and how far into it playback is.
    pub async fn now_playing(&self) -> SessionResult<Option<(Track, std::time::Duration)>> {
        let inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        Ok(inner
            .queue
            .current()
            .cloned()
            .map(|track| (track, self.engine.position())))
    }

    /// Renders the bounded queue listing against the engine's position.
    pub async fn queue_summary(&self) -> SessionResult<String> {
        let inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        Ok(inner.queue.render_summary(self.engine.position()))
    }

    /// Tears the session down on user request.
    pub async fn disconnect(&self) -> SessionResult<()> {
        let mut inner = self.inner.lock().await;
        self.ensure_active(&inner)?;
        self.finalize_locked(&mut inner, EndReason::UserDisconnect)
            .await;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Rejects commands against a torn-down session.
    fn ensure_active(&self, inner: &SessionInner) -> SessionResult<()> {
        if inner.finished {
            return Err(SessionError::NoActiveSession(self.group.to_string()));
        }
        Ok(())
    }

    /// After a queue mutation that changes what plays next: hand over by
    /// halting the engine (its idle notification advances past the
    /// superseded head into the chosen track), or, when nothing is in
    /// flight, perform that advance here and start directly.
    async fn switch_track(&self, inner: &mut SessionInner) {
        if inner.engine_state == PlaybackState::Idle && !inner.pending_start {
            // Seek and skip bounds guarantee an entry follows the head.
            inner.queue.advance();
            self.start_next(inner).await;
        } else {
            self.engine.stop().await;
        }
    }

    /// The single teardown path. Idempotent.
    ///
    /// Cancels the pump and timers, halts the engine, destroys the
    /// connection, discards the queue, removes the session from the
    /// registry, and announces the end.
    pub(crate) async fn finalize_locked(&self, inner: &mut SessionInner, reason: EndReason) {
        if inner.finished {
            return;
        }
        inner.finished = true;
        inner.queue.discard_all();
        inner.active = None;

        tracing::info!(group = %self.group, session = %self.id, ?reason, "session ending");

        self.cancel.cancel();
        self.engine.stop().await;
        self.connection.destroy().await;
        (self.cleanup)();

        self.emitter.emit_connection(ConnectionEvent::SessionEnded {
            group: self.group.to_string(),
            reason,
            timestamp: now_millis(),
        });
    }

    /// Tears down from outside the lock (registry and supervisor paths).
    pub(crate) async fn finalize(&self, reason: EndReason) {
        let mut inner = self.inner.lock().await;
        self.finalize_locked(&mut inner, reason).await;
    }

    /// Upgrades the weak self-reference for spawned tasks.
    ///
    /// Present for as long as the session is reachable at all, so armed
    /// timers and the pump can re-enter the session lock later.
    fn strong(&self) -> Option<Arc<Session>> {
        self.self_weak.upgrade()
    }

    /// Spawns the event pump serializing collaborator notifications.
    fn spawn_pump(&self) {
        let Some(session) = self.strong() else {
            return;
        };
        let mut conn_rx = self.connection.state_changes();
        let mut engine_rx = self.engine.state_changes();

        self.spawner.spawn(async move {
            loop {
                tokio::select! {
                    _ = session.cancel.cancelled() => break,
                    change = conn_rx.recv() => match change {
                        Ok(change) => session.handle_connection_change(change).await,
                        Err(RecvError::Lagged(missed)) => {
                            tracing::warn!(
                                group = %session.group,
                                missed,
                                "connection events lagged"
                            );
                        }
                        Err(RecvError::Closed) => break,
                    },
                    change = engine_rx.recv() => match change {
                        Ok(change) => session.handle_engine_change(change).await,
                        Err(RecvError::Lagged(missed)) => {
                            tracing::warn!(group = %session.group, missed, "engine events lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!(group = %session.group, session = %session.id, "event pump stopped");
        });
    }

    #[cfg(test)]
    pub(crate) async fn queue_titles(&self) -> Vec<String> {
        self.inner.lock().await.queue.titles()
    }

    #[cfg(test)]
    pub(crate) async fn is_finished(&self) -> bool {
        self.inner.lock().await.finished
    }
}
