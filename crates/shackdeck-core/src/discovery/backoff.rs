// ── Re-subscription backoff ──

use std::time::Duration;

/// Exponential backoff for re-establishing the registry watch.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first retry. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on the delay. Default: 30s.
    pub max_delay: Duration,

    /// Give up after this many consecutive failures. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

/// Delay before retry number `attempt` (0-based).
///
/// The initial delay doubles per attempt up to `max_delay`, then is scaled
/// to between 75% and 125% by a spread derived from the attempt number.
pub(crate) fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let doubled = config
        .initial_delay
        .saturating_mul(1 << attempt.min(16))
        .min(config.max_delay);

    let percent = 75 + (attempt.wrapping_mul(37) % 11) * 5;
    doubled * percent / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows() {
        let config = ReconnectConfig::default();
        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);
        assert!(d1 > d0, "d1 ({d1:?}) should exceed d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should exceed d1 ({d1:?})");
    }

    #[test]
    fn backoff_is_capped() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };
        let late = calculate_backoff(40, &config);
        assert!(late <= Duration::from_millis(12_500), "got {late:?}");
        assert!(late >= Duration::from_millis(7_500), "got {late:?}");
    }

    #[test]
    fn spread_stays_within_a_quarter() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(4),
            max_retries: None,
        };
        for attempt in 0..64 {
            let delay = calculate_backoff(attempt, &config);
            assert!(delay >= Duration::from_secs(3), "attempt {attempt}: {delay:?}");
            assert!(delay <= Duration::from_secs(5), "attempt {attempt}: {delay:?}");
        }
    }
}
