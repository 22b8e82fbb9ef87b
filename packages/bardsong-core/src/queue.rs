//! Per-session track queue.
//!
//! Pure data structure, no I/O and no locking of its own: the owning session
//! serializes access. Index 0 is always the now-playing slot; every mutation
//! here preserves that meaning. The index-0 entry can only leave the queue
//! through [`TrackQueue::advance`], which the playback controller calls when
//! the engine reports a finished track.

use std::time::Duration;

use crate::error::{SessionError, SessionResult};
use crate::track::{format_duration, Track};

/// Shown when a summary is requested for an empty queue.
const EMPTY_SUMMARY: &str = "The queue is empty.";

/// Ordered track list for one session.
///
/// All operations are O(n) over the queue length, which stays small in
/// practice (bounded by how much users queue up).
pub struct TrackQueue {
    tracks: Vec<Track>,
    /// Character budget for [`TrackQueue::render_summary`] output.
    summary_budget: usize,
}

impl TrackQueue {
    /// Creates an empty queue with the given summary character budget.
    pub fn new(summary_budget: usize) -> Self {
        Self {
            tracks: Vec::new(),
            summary_budget,
        }
    }

    /// Appends a track to the tail.
    ///
    /// # Returns
    /// The new queue length.
    pub fn append(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len()
    }

    /// Appends a batch of tracks, preserving their order.
    ///
    /// # Returns
    /// The number of tracks appended. Zero means the batch was empty (an
    /// empty playlist resolution), which is not a failure.
    pub fn append_bulk(&mut self, tracks: Vec<Track>) -> usize {
        let count = tracks.len();
        self.tracks.extend(tracks);
        count
    }

    /// Drops everything except the now-playing entry.
    ///
    /// A non-empty queue keeps exactly its index-0 track; an empty queue
    /// stays empty. The now-playing entry is never removed here.
    pub fn clear(&mut self) {
        self.tracks.truncate(1);
    }

    /// Drops the just-finished index-0 track.
    ///
    /// # Returns
    /// The new now-playing track, or `None` when the queue ran out.
    pub fn advance(&mut self) -> Option<&Track> {
        if !self.tracks.is_empty() {
            self.tracks.remove(0);
        }
        self.tracks.first()
    }

    /// Moves the track at `index` to the next-up position.
    ///
    /// The queue becomes `[current, target, everything else in original
    /// order]`; no track is discarded. Combined with an engine halt, this
    /// makes the chosen track the next one to play.
    ///
    /// # Errors
    /// `IndexOutOfRange` if `index` is 0 (now playing), past the end, or the
    /// queue is empty.
    pub fn seek(&mut self, index: usize) -> SessionResult<()> {
        self.check_upcoming_index(index)?;
        let target = self.tracks.remove(index);
        self.tracks.insert(1, target);
        Ok(())
    }

    /// Discards the tracks between now-playing and `index`.
    ///
    /// The queue becomes `[current, tracks from index onward]`. With the
    /// default target of 1 the queue itself is untouched; the skip effect
    /// comes from halting the engine so the idle transition advances past
    /// the current track.
    ///
    /// # Errors
    /// `IndexOutOfRange` under the same bounds check as [`TrackQueue::seek`].
    pub fn skip_to(&mut self, index: usize) -> SessionResult<()> {
        self.check_upcoming_index(index)?;
        self.tracks.drain(1..index);
        Ok(())
    }

    /// Skips exactly the current track: `skip_to(1)`.
    pub fn skip(&mut self) -> SessionResult<()> {
        self.skip_to(1)
    }

    /// Removes the upcoming track at `index`.
    ///
    /// # Errors
    /// `IndexOutOfRange` if `index` is 0 or past the end; the now-playing
    /// entry can never be removed this way.
    pub fn remove(&mut self, index: usize) -> SessionResult<Track> {
        self.check_upcoming_index(index)?;
        Ok(self.tracks.remove(index))
    }

    /// The now-playing track, if any. No side effects.
    #[must_use]
    pub fn current(&self) -> Option<&Track> {
        self.tracks.first()
    }

    /// Returns the queue length, counting the now-playing entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true when nothing is queued at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Drops every entry, the now-playing one included. Teardown only;
    /// user-facing clearing goes through [`TrackQueue::clear`].
    pub(crate) fn discard_all(&mut self) {
        self.tracks.clear();
    }

    #[cfg(test)]
    pub(crate) fn titles(&self) -> Vec<String> {
        self.tracks.iter().map(|track| track.title.clone()).collect()
    }

    /// Validates an index that must name an upcoming (non-current) entry.
    fn check_upcoming_index(&self, index: usize) -> SessionResult<()> {
        if index == 0 || index >= self.tracks.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        Ok(())
    }

    /// Renders the bounded textual queue listing.
    ///
    /// First line: the current track with its remaining play time given how
    /// far into it playback is. Following lines: upcoming tracks with the
    /// cumulative offset until each one starts. Output never exceeds the
    /// configured character budget; when the full listing would, it is
    /// truncated with a trailing "and N more" line where that still fits.
    #[must_use]
    pub fn render_summary(&self, elapsed_in_current: Duration) -> String {
        let current = match self.tracks.first() {
            Some(track) => track,
            None => return EMPTY_SUMMARY.to_string(),
        };

        let remaining = current.duration().saturating_sub(elapsed_in_current);
        let header = format!(
            "Now playing {} with {} remaining",
            current.title,
            format_duration(remaining)
        );

        let mut out = String::new();
        let mut used = 0usize;
        push_bounded(&mut out, &mut used, self.summary_budget, &header);

        // Cumulative offset until each upcoming track starts.
        let mut offset = remaining;
        for (position, track) in self.tracks.iter().enumerate().skip(1) {
            let line = format!(
                "{}. {} ({}) starts in {}",
                position,
                track.title,
                format_duration(track.duration()),
                format_duration(offset)
            );
            if used + 1 + line.chars().count() > self.summary_budget {
                let omitted = self.tracks.len() - position;
                let marker = format!("and {} more", omitted);
                if used + 1 + marker.chars().count() <= self.summary_budget {
                    out.push('\n');
                    out.push_str(&marker);
                }
                break;
            }
            out.push('\n');
            out.push_str(&line);
            used += 1 + line.chars().count();
            offset += track.duration();
        }

        out
    }
}

/// Appends `text` clipped to whatever fits in the remaining budget.
fn push_bounded(out: &mut String, used: &mut usize, budget: usize, text: &str) {
    for c in text.chars() {
        if *used >= budget {
            return;
        }
        out.push(c);
        *used += 1;
    }
}
