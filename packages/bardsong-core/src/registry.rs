//! Registry owning at most one live session per group.
//!
//! The registry is the embedding bot's entry point: command handlers look
//! sessions up here, and the first playback command in a group creates one.
//! Sessions remove themselves from the map through the cleanup hook wired in
//! at creation, so the single teardown path inside the session covers every
//! exit (user disconnect, kick, exhausted rejoins, dead link) without the
//! registry tracking why.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::CoreConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::{EndReason, EventEmitter};
use crate::runtime::TokioSpawner;
use crate::session::{GroupId, Session};
use crate::traits::{PlaybackEngineFactory, StreamProvider, TrackResolver, VoiceConnection};

/// Per-group session registry.
///
/// Cheap to share: clone the `Arc` it is typically held in. All methods take
/// `&self`; the map is sharded internally.
pub struct SessionRegistry {
    sessions: Arc<DashMap<GroupId, Arc<Session>>>,
    resolver: Arc<dyn TrackResolver>,
    provider: Arc<dyn StreamProvider>,
    engines: Arc<dyn PlaybackEngineFactory>,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
    config: CoreConfig,
}

impl SessionRegistry {
    /// Creates an empty registry over the given collaborators.
    ///
    /// `config` is expected to be validated by the embedder beforehand.
    pub fn new(
        resolver: Arc<dyn TrackResolver>,
        provider: Arc<dyn StreamProvider>,
        engines: Arc<dyn PlaybackEngineFactory>,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
        config: CoreConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            resolver,
            provider,
            engines,
            emitter,
            spawner,
            config,
        }
    }

    /// Returns the group's live session, creating one wired to `connection`
    /// if none exists.
    ///
    /// An existing session keeps its original connection; the handle passed
    /// here is ignored then. Creation is atomic per group, so two racing
    /// first commands end up sharing one session.
    pub fn get_or_create(
        &self,
        group: GroupId,
        connection: Arc<dyn VoiceConnection>,
    ) -> Arc<Session> {
        self.sessions
            .entry(group.clone())
            .or_insert_with(|| {
                let sessions = Arc::downgrade(&self.sessions);
                let cleanup_group = group.clone();
                Session::launch(
                    group,
                    connection,
                    self.engines.create(),
                    Arc::clone(&self.resolver),
                    Arc::clone(&self.provider),
                    Arc::clone(&self.emitter),
                    self.spawner.clone(),
                    self.config.clone(),
                    Box::new(move || {
                        if let Some(map) = sessions.upgrade() {
                            map.remove(&cleanup_group);
                        }
                    }),
                )
            })
            .clone()
    }

    /// Returns the group's live session.
    ///
    /// # Errors
    /// [`SessionError::NoActiveSession`] when the group has none.
    pub fn get(&self, group: &GroupId) -> SessionResult<Arc<Session>> {
        self.sessions
            .get(group)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SessionError::NoActiveSession(group.to_string()))
    }

    /// Tears down the group's session: queue discarded, engine halted,
    /// connection destroyed, session removed.
    ///
    /// # Errors
    /// [`SessionError::NoActiveSession`] when the group has none (including
    /// a session that already tore itself down).
    pub async fn teardown(&self, group: &GroupId) -> SessionResult<()> {
        let session = self.get(group)?;
        session.finalize(EndReason::UserDisconnect).await;
        Ok(())
    }

    /// Tears down every live session. For process shutdown.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        if sessions.is_empty() {
            return;
        }
        tracing::info!(count = sessions.len(), "shutting down all sessions");
        futures::future::join_all(
            sessions
                .iter()
                .map(|session| session.finalize(EndReason::UserDisconnect)),
        )
        .await;
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no group has a session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
