//! Session core configuration.
//!
//! All fields have defaults matching the transport's observed behavior; an
//! embedding bot can deserialize overrides from its own config file and must
//! call [`CoreConfig::validate`] before wiring the registry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for connection supervision, playback advance, and summaries.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoreConfig {
    /// How long a connection may sit in Connecting/Signalling before it is
    /// destroyed (seconds).
    pub ready_timeout_secs: u64,

    /// Self-recovery window after a moved/kicked disconnect before the
    /// session is torn down (seconds).
    pub kick_grace_secs: u64,

    /// Linear backoff unit between rejoin attempts: attempt n waits
    /// `(n + 1) × unit` (seconds).
    pub rejoin_backoff_unit_secs: u64,

    /// Rejoin attempts allowed before the connection is given up on.
    pub max_rejoin_attempts: u32,

    /// Consecutive failed track starts tolerated before playback stalls
    /// instead of burning through the rest of the queue.
    pub max_start_failures: u32,

    /// Character budget for the rendered queue summary.
    pub summary_char_budget: usize,

    /// Capacity of the session event broadcast channel.
    pub event_channel_capacity: usize,
}

impl CoreConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.ready_timeout_secs == 0 {
            return Err("ready_timeout_secs must be >= 1".to_string());
        }
        if self.kick_grace_secs == 0 {
            return Err("kick_grace_secs must be >= 1".to_string());
        }
        if self.rejoin_backoff_unit_secs == 0 {
            return Err("rejoin_backoff_unit_secs must be >= 1".to_string());
        }
        if self.max_rejoin_attempts == 0 {
            return Err("max_rejoin_attempts must be >= 1".to_string());
        }
        if self.max_start_failures == 0 {
            return Err("max_start_failures must be >= 1".to_string());
        }
        if self.summary_char_budget == 0 {
            return Err("summary_char_budget must be >= 1".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    /// Ready-wait timeout as a [`Duration`].
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// Kick-recovery grace window as a [`Duration`].
    #[must_use]
    pub fn kick_grace(&self) -> Duration {
        Duration::from_secs(self.kick_grace_secs)
    }

    /// Backoff before rejoin attempt number `attempts` (zero-based, so the
    /// first retry waits one unit).
    #[must_use]
    pub fn rejoin_backoff(&self, attempts: u32) -> Duration {
        Duration::from_secs(self.rejoin_backoff_unit_secs * u64::from(attempts + 1))
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ready_timeout_secs: 20,
            kick_grace_secs: 5,
            rejoin_backoff_unit_secs: 5,
            max_rejoin_attempts: 5,
            max_start_failures: 3,
            summary_char_budget: 1800,
            event_channel_capacity: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ready_timeout(), Duration::from_secs(20));
        assert_eq!(config.kick_grace(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_zero_values() {
        let mut config = CoreConfig::default();
        config.max_rejoin_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.event_channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn backoff_grows_linearly() {
        let config = CoreConfig::default();
        assert_eq!(config.rejoin_backoff(0), Duration::from_secs(5));
        assert_eq!(config.rejoin_backoff(1), Duration::from_secs(10));
        assert_eq!(config.rejoin_backoff(4), Duration::from_secs(25));
    }
}
