//! Playback control.
//!
//! Drives the queue from engine state notifications: a genuine transition
//! into idle means the previous track finished, so the queue advances and
//! the next track is started; a genuine transition into playing announces
//! the new track. Transitions are judged against the engine state this
//! session last recorded, so a duplicated notification changes nothing.
//!
//! Starting the next track is a bounded loop, not a recursion: a track whose
//! stream cannot be opened is dropped and the next one tried, up to a cap of
//! consecutive failures per run. A poisoned queue therefore stalls loudly
//! instead of hammering the provider.

use crate::events::PlaybackEvent;
use crate::session::{Session, SessionInner};
use crate::traits::{PlaybackState, StateChange};
use crate::utils::now_millis;

impl Session {
    /// Feeds one engine notification through the playback policy.
    ///
    /// Called only from the event pump, so changes arrive one at a time.
    pub(super) async fn handle_engine_change(&self, change: StateChange<PlaybackState>) {
        let mut inner = self.inner.lock().await;
        if inner.finished {
            return;
        }

        let recorded = inner.engine_state;
        let new = change.new;
        if new == recorded {
            tracing::debug!(
                group = %self.group,
                state = ?new,
                "duplicate engine notification ignored"
            );
            return;
        }

        tracing::debug!(
            group = %self.group,
            from = ?recorded,
            to = ?new,
            reported_old = ?change.old,
            "engine transition"
        );
        inner.engine_state = new;
        // The engine has reported since our last play command.
        inner.pending_start = false;

        match new {
            PlaybackState::Idle => {
                if let Some(source) = inner.active.take() {
                    tracing::debug!(group = %self.group, stream = %source.stream_url, "track finished");
                }
                if inner.queue.advance().is_none() {
                    tracing::info!(group = %self.group, "queue finished");
                    self.emitter.emit_playback(PlaybackEvent::QueueFinished {
                        group: self.group.to_string(),
                        timestamp: now_millis(),
                    });
                } else {
                    self.start_next(&mut inner).await;
                }
            }
            PlaybackState::Playing => {
                if !matches!(recorded, PlaybackState::Playing | PlaybackState::AutoPaused) {
                    if let Some(track) = inner.queue.current() {
                        tracing::info!(group = %self.group, title = %track.title, "now playing");
                        self.emitter.emit_playback(PlaybackEvent::NowPlaying {
                            group: self.group.to_string(),
                            track: track.clone(),
                            timestamp: now_millis(),
                        });
                    }
                }
            }
            PlaybackState::Buffering | PlaybackState::Paused | PlaybackState::AutoPaused => {}
        }
    }

    /// Starts the track at the head of the queue if the engine is free.
    ///
    /// A head track whose stream cannot be opened is dropped via the normal
    /// advance and the next head tried, up to the consecutive-failure cap;
    /// hitting the cap announces the stall and leaves the rest of the queue
    /// for the next user command to retry.
    pub(super) async fn start_next(&self, inner: &mut SessionInner) {
        loop {
            if inner.finished
                || inner.engine_state != PlaybackState::Idle
                || inner.pending_start
            {
                return;
            }
            let Some(track) = inner.queue.current().cloned() else {
                return;
            };

            match self.provider.open(&track.url).await {
                Ok(source) => {
                    tracing::debug!(
                        group = %self.group,
                        title = %track.title,
                        stream = %source.stream_url,
                        "starting track"
                    );
                    self.engine.play(source.clone()).await;
                    inner.active = Some(source);
                    inner.pending_start = true;
                    inner.consecutive_failures = 0;
                    return;
                }
                Err(e) => {
                    inner.queue.advance();
                    inner.consecutive_failures += 1;
                    tracing::warn!(
                        group = %self.group,
                        title = %track.title,
                        error = %e,
                        failures = inner.consecutive_failures,
                        "could not open stream, dropping track"
                    );
                    if inner.consecutive_failures >= self.config.max_start_failures {
                        self.emitter.emit_playback(PlaybackEvent::Stalled {
                            group: self.group.to_string(),
                            consecutive_failures: inner.consecutive_failures,
                            timestamp: now_millis(),
                        });
                        inner.consecutive_failures = 0;
                        return;
                    }
                }
            }
        }
    }
}
