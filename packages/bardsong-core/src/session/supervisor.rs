//! Connection supervision.
//!
//! Reacts to transport state changes with the recovery policy: a kick gets a
//! short grace period to self-recover (the user may have been moved between
//! channels), any other drop gets linearly backed-off rejoin attempts up to a
//! cap, and a link that never reaches ready within the wait window is
//! destroyed rather than supervised forever.
//!
//! Transitions are decided against the state this session last recorded, not
//! against the `old` value carried in the notification, so a duplicated
//! delivery of the same change is a no-op. Every recorded transition bumps an
//! epoch counter; armed timers capture the epoch and stand down when the
//! world moved on before they fired.

use crate::events::{ConnectionEvent, EndReason};
use crate::runtime::TaskSpawner;
use crate::session::Session;
use crate::traits::{ConnectionState, DisconnectReason, StateChange};
use crate::utils::now_millis;

impl Session {
    /// Feeds one transport notification through the supervision policy.
    ///
    /// Called only from the event pump, so changes arrive one at a time.
    pub(super) async fn handle_connection_change(&self, change: StateChange<ConnectionState>) {
        let mut inner = self.inner.lock().await;
        if inner.finished {
            return;
        }

        let recorded = inner.conn_state;
        let new = change.new;
        if new == recorded {
            tracing::debug!(
                group = %self.group,
                state = ?new,
                "duplicate connection notification ignored"
            );
            return;
        }

        tracing::debug!(
            group = %self.group,
            from = ?recorded,
            to = ?new,
            reported_old = ?change.old,
            "connection transition"
        );
        inner.conn_state = new;
        inner.conn_epoch += 1;
        let epoch = inner.conn_epoch;

        match new {
            ConnectionState::Ready => {
                // Arrival at ready retires any pending wait through the
                // epoch bump above.
                tracing::info!(group = %self.group, "voice link ready");
            }
            ConnectionState::Connecting | ConnectionState::Signalling => {
                if recorded == ConnectionState::Ready && new == ConnectionState::Connecting {
                    // Moved between channels: the transport resumes on a new
                    // endpoint and needs its networking rebuilt first.
                    tracing::info!(group = %self.group, "link re-entered connecting, rebuilding networking");
                    self.connection.reinit_networking().await;
                }
                self.arm_ready_timeout(epoch);
            }
            ConnectionState::Disconnected { reason, close_code } => {
                self.handle_disconnected(&mut inner, epoch, reason, close_code)
                    .await;
            }
            ConnectionState::Destroyed => {
                self.finalize_locked(&mut inner, EndReason::UserDisconnect)
                    .await;
            }
        }
    }

    /// Picks the recovery path for a dropped link.
    async fn handle_disconnected(
        &self,
        inner: &mut super::SessionInner,
        epoch: u64,
        reason: DisconnectReason,
        close_code: u16,
    ) {
        if reason == DisconnectReason::MovedOrKicked {
            // Could be a kick or a move; a move resumes on its own within
            // moments. Give it the grace window before giving up.
            tracing::info!(
                group = %self.group,
                close_code,
                grace = ?self.config.kick_grace(),
                "moved or kicked, waiting for the link to recover"
            );
            self.arm_kick_grace(epoch);
            return;
        }

        let attempts = self.connection.rejoin_attempts();
        if attempts >= self.config.max_rejoin_attempts {
            tracing::warn!(
                group = %self.group,
                attempts,
                "rejoin attempts exhausted, ending session"
            );
            self.finalize_locked(inner, EndReason::RetriesExhausted).await;
            return;
        }

        let attempt = attempts + 1;
        let delay = self.config.rejoin_backoff(attempts);
        tracing::info!(
            group = %self.group,
            ?reason,
            close_code,
            attempt,
            ?delay,
            "link dropped, scheduling rejoin"
        );
        self.emitter.emit_connection(ConnectionEvent::Reconnecting {
            group: self.group.to_string(),
            attempt,
            timestamp: now_millis(),
        });
        self.arm_rejoin(epoch, delay);
    }

    /// Waits out the wait-for-ready window; destroys the session when the
    /// link is still not up by then.
    pub(super) fn arm_ready_timeout(&self, epoch: u64) {
        let Some(session) = self.strong() else {
            return;
        };
        let timeout = self.config.ready_timeout();
        self.spawner.spawn(async move {
            tokio::select! {
                _ = session.cancel.cancelled() => return,
                _ = tokio::time::sleep(timeout) => {}
            }
            let mut inner = session.inner.lock().await;
            if inner.finished || inner.conn_epoch != epoch {
                return;
            }
            tracing::warn!(
                group = %session.group,
                waited = ?timeout,
                "voice link never became ready, ending session"
            );
            session
                .finalize_locked(&mut inner, EndReason::ConnectTimeout)
                .await;
        });
    }

    /// Waits out the kick grace period; tears down unless the transport
    /// self-recovered in the meantime (which bumps the epoch).
    fn arm_kick_grace(&self, epoch: u64) {
        let Some(session) = self.strong() else {
            return;
        };
        let grace = self.config.kick_grace();
        self.spawner.spawn(async move {
            tokio::select! {
                _ = session.cancel.cancelled() => return,
                _ = tokio::time::sleep(grace) => {}
            }
            let mut inner = session.inner.lock().await;
            if inner.finished || inner.conn_epoch != epoch {
                return;
            }
            tracing::info!(group = %session.group, "no recovery after kick, ending session");
            session.finalize_locked(&mut inner, EndReason::Kicked).await;
        });
    }

    /// Rejoins after the backoff delay, then re-arms the ready wait so a
    /// rejoin the transport never acts on still terminates.
    fn arm_rejoin(&self, epoch: u64, delay: std::time::Duration) {
        let Some(session) = self.strong() else {
            return;
        };
        self.spawner.spawn(async move {
            tokio::select! {
                _ = session.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let inner = session.inner.lock().await;
            if inner.finished || inner.conn_epoch != epoch {
                return;
            }
            if !session.connection.rejoin().await {
                tracing::warn!(group = %session.group, "rejoin request not accepted");
            }
            session.arm_ready_timeout(epoch);
        });
    }
}
