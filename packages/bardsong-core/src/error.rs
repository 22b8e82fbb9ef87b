//! Centralized error types for the Bardsong core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Attaches machine-readable codes for the embedding bot's reply layer
//! - Serializes to JSON for event payloads and diagnostics

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type for the Bardsong session core.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum SessionError {
    /// Queue mutation with an invalid index. Rejected with no state change;
    /// index 0 (the now-playing slot) can never be targeted.
    #[error("queue index {index} out of range (length {len})")]
    IndexOutOfRange {
        /// The index the caller asked for.
        index: usize,
        /// Queue length at the time of the call.
        len: usize,
    },

    /// Command issued for a group with no live session.
    #[error("no active session for group {0}")]
    NoActiveSession(String),

    /// Track lookup failed or returned nothing usable.
    #[error("track resolution failed: {0}")]
    Resolution(String),

    /// Opening a track's audio stream failed. Transient and per-track; the
    /// controller skips the track and tries the next one.
    #[error("stream open failed: {0}")]
    Stream(String),
}

impl SessionError {
    /// Returns a machine-readable error code for reply formatting.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::NoActiveSession(_) => "no_active_session",
            Self::Resolution(_) => "resolution_failed",
            Self::Stream(_) => "stream_error",
        }
    }

    /// Whether the error is transient for a single track rather than fatal
    /// for the session. Transient errors feed the controller's
    /// skip-and-continue path.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Resolution(_) | Self::Stream(_))
    }
}

/// Convenient Result alias for session-core operations.
pub type SessionResult<T> = Result<T, SessionError>;
