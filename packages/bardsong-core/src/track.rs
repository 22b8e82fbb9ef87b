//! Track domain types.
//!
//! A [`Track`] is an immutable, fully resolved reference to a playable item:
//! the resolver produces it once, and it is never mutated afterwards. The raw
//! audio bytes are not part of the track; the stream provider materializes
//! those on demand from the track's URL.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where a track came from, as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Free-text query resolved through catalog search.
    Search,
    /// Explicit track link pasted by the user.
    DirectUrl,
    /// Entry expanded from a playlist link.
    PlaylistEntry,
}

/// An immutable resolved reference to a playable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// The query or link the user originally submitted.
    pub query: String,
    /// Provider kind the resolver classified the query as.
    pub source: SourceKind,
    /// Display title.
    pub title: String,
    /// Playable locator handed to the stream provider.
    pub url: String,
    /// Artwork locator, when the provider supplies one.
    pub thumbnail: Option<String>,
    /// Track length in whole seconds.
    pub duration_secs: u64,
}

impl Track {
    /// Track length as a [`Duration`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Renders a duration for queue summaries and now-playing lines.
///
/// Sub-second precision is dropped. Hours appear only when non-zero, minutes
/// only when the duration reaches a minute: `45s`, `2m 30s`, `1hr 2m 3s`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}hr {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
