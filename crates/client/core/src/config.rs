//! Client configuration structures and loaders.

use std::env;
use std::time::Duration;

/// Tuning knobs for a session client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Fixed polling interval for snapshot fetches. Snapshots are never
    /// cached; staleness directly causes wrong phase derivations.
    pub poll_interval: Duration,

    /// Upper bound on the random delay applied before a `verify` call,
    /// spreading the two clients apart within a poll window.
    pub verify_jitter_max: Duration,

    /// How long the loop waits on an unchanged phase before surfacing a
    /// still-waiting status. Does not fail the session; the counterparty
    /// may act later.
    pub max_wait: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            verify_jitter_max: Duration::from_millis(750),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl ClientConfig {
    /// Construct configuration from process environment variables.
    ///
    /// - `PASS_POLL_INTERVAL_SECS`
    /// - `PASS_VERIFY_JITTER_MS`
    /// - `PASS_MAX_WAIT_SECS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = read_env::<u64>("PASS_POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = read_env::<u64>("PASS_VERIFY_JITTER_MS") {
            config.verify_jitter_max = Duration::from_millis(ms);
        }
        if let Some(secs) = read_env::<u64>("PASS_MAX_WAIT_SECS") {
            config.max_wait = Duration::from_secs(secs.max(1));
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_timings() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_wait, Duration::from_secs(300));
    }
}
