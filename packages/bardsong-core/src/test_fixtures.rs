//! Shared mocks for session, supervision, and registry tests.
//!
//! The collaborator mocks record every call and let tests push state-change
//! notifications by hand, so timing-sensitive scenarios run deterministically
//! under paused tokio time.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::config::CoreConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::{
    ConnectionEvent, EndReason, EventEmitter, PlaybackEvent, QueueEvent, SessionEvent,
};
use crate::registry::SessionRegistry;
use crate::runtime::TokioSpawner;
use crate::session::{GroupId, Session};
use crate::track::{SourceKind, Track};
use crate::traits::{
    AudioSource, ConnectionState, PlaybackEngine, PlaybackEngineFactory, PlaybackState,
    StateChange, StreamProvider, TrackResolver, VoiceConnection,
};

/// Deterministic catalog URL for a track title.
pub(crate) fn url_for(title: &str) -> String {
    format!("https://tracks.example/{title}")
}

/// A playable test track.
pub(crate) fn track(title: &str, duration_secs: u64) -> Track {
    Track {
        query: title.to_string(),
        source: SourceKind::Search,
        title: title.to_string(),
        url: url_for(title),
        thumbnail: None,
        duration_secs,
    }
}

/// Registers and plays one track per title, using the title as the query.
///
/// Only the first track reaches the engine; the rest queue up behind it.
pub(crate) async fn fill_queue(harness: &SessionHarness, session: &Arc<Session>, titles: &[&str]) {
    for title in titles {
        harness.resolver.add_track(title, track(title, 120));
        session
            .play(title, SourceKind::Search)
            .await
            .unwrap_or_else(|e| panic!("queueing {title} failed: {e}"));
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Collaborator mocks
// ─────────────────────────────────────────────────────────────────────────

/// In-memory catalog lookup.
#[derive(Default)]
pub(crate) struct MockResolver {
    tracks: Mutex<HashMap<String, Track>>,
    playlists: Mutex<HashMap<String, Vec<Track>>>,
}

impl MockResolver {
    pub(crate) fn add_track(&self, query: &str, track: Track) {
        self.tracks.lock().insert(query.to_string(), track);
    }

    pub(crate) fn add_playlist(&self, query: &str, tracks: Vec<Track>) {
        self.playlists.lock().insert(query.to_string(), tracks);
    }
}

#[async_trait]
impl TrackResolver for MockResolver {
    async fn resolve(&self, query: &str, _hint: SourceKind) -> SessionResult<Track> {
        self.tracks
            .lock()
            .get(query)
            .cloned()
            .ok_or_else(|| SessionError::Resolution(format!("no results for {query}")))
    }

    async fn resolve_playlist(
        &self,
        query: &str,
        _hint: SourceKind,
    ) -> SessionResult<Vec<Track>> {
        self.playlists
            .lock()
            .get(query)
            .cloned()
            .ok_or_else(|| SessionError::Resolution(format!("no playlist for {query}")))
    }
}

/// Stream opener with per-URL failure injection.
#[derive(Default)]
pub(crate) struct MockProvider {
    failing: Mutex<HashSet<String>>,
    opened: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Makes every open of `url` fail from now on.
    pub(crate) fn fail_url(&self, url: String) {
        self.failing.lock().insert(url);
    }

    /// Every URL an open was attempted for, failures included.
    pub(crate) fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl StreamProvider for MockProvider {
    async fn open(&self, url: &str) -> SessionResult<AudioSource> {
        self.opened.lock().push(url.to_string());
        if self.failing.lock().contains(url) {
            return Err(SessionError::Stream(format!("refused: {url}")));
        }
        Ok(AudioSource {
            stream_url: url.to_string(),
            content_type: Some("audio/webm".to_string()),
        })
    }
}

/// Voice transport handle recording calls; state changes are test-driven.
pub(crate) struct MockConnection {
    tx: broadcast::Sender<StateChange<ConnectionState>>,
    rejoins: AtomicUsize,
    reinits: AtomicUsize,
    destroyed: AtomicBool,
    engines: Mutex<Vec<Arc<dyn PlaybackEngine>>>,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            rejoins: AtomicUsize::new(0),
            reinits: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
            engines: Mutex::new(Vec::new()),
        }
    }

    /// Delivers a state-change notification to subscribers.
    pub(crate) fn push(&self, old: ConnectionState, new: ConnectionState) {
        let _ = self.tx.send(StateChange { old, new });
    }

    pub(crate) fn rejoin_calls(&self) -> usize {
        self.rejoins.load(Ordering::SeqCst)
    }

    pub(crate) fn reinit_calls(&self) -> usize {
        self.reinits.load(Ordering::SeqCst)
    }

    pub(crate) fn destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribed_engines(&self) -> usize {
        self.engines.lock().len()
    }
}

#[async_trait]
impl VoiceConnection for MockConnection {
    async fn rejoin(&self) -> bool {
        self.rejoins.fetch_add(1, Ordering::SeqCst);
        true
    }

    async fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    async fn reinit_networking(&self) {
        self.reinits.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe_engine(&self, engine: Arc<dyn PlaybackEngine>) {
        self.engines.lock().push(engine);
    }

    fn rejoin_attempts(&self) -> u32 {
        self.rejoins.load(Ordering::SeqCst) as u32
    }

    fn state_changes(&self) -> broadcast::Receiver<StateChange<ConnectionState>> {
        self.tx.subscribe()
    }
}

/// Playback engine recording calls; state changes are test-driven.
pub(crate) struct MockEngine {
    tx: broadcast::Sender<StateChange<PlaybackState>>,
    played: Mutex<Vec<AudioSource>>,
    stops: AtomicUsize,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    position: Mutex<Duration>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            played: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            position: Mutex::new(Duration::ZERO),
        }
    }

    /// Delivers a state-change notification to subscribers.
    pub(crate) fn push(&self, old: PlaybackState, new: PlaybackState) {
        let _ = self.tx.send(StateChange { old, new });
    }

    pub(crate) fn played_urls(&self) -> Vec<String> {
        self.played
            .lock()
            .iter()
            .map(|source| source.stream_url.clone())
            .collect()
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub(crate) fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub(crate) fn set_position(&self, position: Duration) {
        *self.position.lock() = position;
    }
}

#[async_trait]
impl PlaybackEngine for MockEngine {
    async fn play(&self, source: AudioSource) {
        self.played.lock().push(source);
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    async fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn position(&self) -> Duration {
        *self.position.lock()
    }

    fn state_changes(&self) -> broadcast::Receiver<StateChange<PlaybackState>> {
        self.tx.subscribe()
    }
}

/// Hands out a fresh [`MockEngine`] per session.
#[derive(Default)]
pub(crate) struct MockEngineFactory;

impl PlaybackEngineFactory for MockEngineFactory {
    fn create(&self) -> Arc<dyn PlaybackEngine> {
        Arc::new(MockEngine::new())
    }
}

/// Emitter keeping every event for assertions.
#[derive(Default)]
pub(crate) struct CollectingEmitter {
    events: Mutex<Vec<SessionEvent>>,
}

impl CollectingEmitter {
    pub(crate) fn ended_reasons(&self) -> Vec<EndReason> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Connection(ConnectionEvent::SessionEnded { reason, .. }) => {
                    Some(*reason)
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn reconnect_attempts(&self) -> Vec<u32> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Connection(ConnectionEvent::Reconnecting { attempt, .. }) => {
                    Some(*attempt)
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn now_playing_titles(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Playback(PlaybackEvent::NowPlaying { track, .. }) => {
                    Some(track.title.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn stall_counts(&self) -> Vec<u32> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Playback(PlaybackEvent::Stalled {
                    consecutive_failures,
                    ..
                }) => Some(*consecutive_failures),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn queue_finished_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SessionEvent::Playback(PlaybackEvent::QueueFinished { .. })
                )
            })
            .count()
    }
}

impl EventEmitter for CollectingEmitter {
    fn emit_queue(&self, event: QueueEvent) {
        self.events.lock().push(event.into());
    }

    fn emit_playback(&self, event: PlaybackEvent) {
        self.events.lock().push(event.into());
    }

    fn emit_connection(&self, event: ConnectionEvent) {
        self.events.lock().push(event.into());
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Harnesses
// ─────────────────────────────────────────────────────────────────────────

/// One session's worth of mocks, for tests driving a [`Session`] directly.
pub(crate) struct SessionHarness {
    pub(crate) resolver: Arc<MockResolver>,
    pub(crate) provider: Arc<MockProvider>,
    pub(crate) engine: Arc<MockEngine>,
    pub(crate) connection: Arc<MockConnection>,
    pub(crate) emitter: Arc<CollectingEmitter>,
    pub(crate) config: CoreConfig,
}

impl SessionHarness {
    pub(crate) fn new() -> Self {
        Self {
            resolver: Arc::new(MockResolver::default()),
            provider: Arc::new(MockProvider::default()),
            engine: Arc::new(MockEngine::new()),
            connection: Arc::new(MockConnection::new()),
            emitter: Arc::new(CollectingEmitter::default()),
            config: CoreConfig::default(),
        }
    }

    /// Launches a session over this harness's mocks with a no-op cleanup hook.
    pub(crate) fn launch_session(&self, group: &str) -> Arc<Session> {
        Session::launch(
            GroupId::from(group),
            Arc::clone(&self.connection) as Arc<dyn VoiceConnection>,
            Arc::clone(&self.engine) as Arc<dyn PlaybackEngine>,
            Arc::clone(&self.resolver) as Arc<dyn TrackResolver>,
            Arc::clone(&self.provider) as Arc<dyn StreamProvider>,
            Arc::clone(&self.emitter) as Arc<dyn EventEmitter>,
            TokioSpawner::current(),
            self.config.clone(),
            Box::new(|| {}),
        )
    }
}

/// A registry over mock collaborators, for registry-level tests.
pub(crate) struct RegistryHarness {
    pub(crate) registry: SessionRegistry,
    pub(crate) emitter: Arc<CollectingEmitter>,
}

pub(crate) fn registry_harness() -> RegistryHarness {
    let emitter = Arc::new(CollectingEmitter::default());
    let registry = SessionRegistry::new(
        Arc::new(MockResolver::default()),
        Arc::new(MockProvider::default()),
        Arc::new(MockEngineFactory::default()),
        Arc::clone(&emitter) as Arc<dyn EventEmitter>,
        TokioSpawner::current(),
        CoreConfig::default(),
    );
    RegistryHarness { registry, emitter }
}
