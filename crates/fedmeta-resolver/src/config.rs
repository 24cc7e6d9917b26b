//! Resolver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ResolverError, ResolverResult};

/// Configuration for a metadata resolver.
///
/// Refresh cadence is derived from the metadata's own `cacheDuration` and
/// `validUntil` declarations, bounded by the delays configured here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Lower bound on the delay between refresh attempts.
    pub min_refresh_delay: Duration,

    /// Upper bound on the delay between refresh attempts; also the default
    /// when the document declares no `cacheDuration`.
    pub max_refresh_delay: Duration,

    /// How long before the snapshot's `validUntil` the scheduler forces a
    /// refresh attempt.
    pub expiration_safety_margin: Duration,

    /// First retry delay after a refresh failure.
    pub backoff_floor: Duration,

    /// Cap on the exponential retry backoff.
    pub backoff_ceiling: Duration,

    /// Age beyond which served data is reported as stale via
    /// [`ResolverStatus`](crate::ResolverStatus). `None` disables the
    /// staleness report.
    pub max_staleness: Option<Duration>,

    /// How long a dynamic resolver remembers a not-found result before
    /// retrying the origin.
    pub negative_cache_ttl: Duration,

    /// Upper bound on how long a dynamically resolved entity is cached,
    /// regardless of its declared `cacheDuration`.
    pub max_cache_duration: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_refresh_delay: Duration::from_secs(60),
            max_refresh_delay: Duration::from_secs(4 * 3600),
            expiration_safety_margin: Duration::from_secs(60),
            backoff_floor: Duration::from_secs(10),
            backoff_ceiling: Duration::from_secs(600),
            max_staleness: None,
            negative_cache_ttl: Duration::from_secs(600),
            max_cache_duration: Duration::from_secs(24 * 3600),
        }
    }
}

impl ResolverConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum refresh delay.
    #[must_use]
    pub const fn with_min_refresh_delay(mut self, delay: Duration) -> Self {
        self.min_refresh_delay = delay;
        self
    }

    /// Sets the maximum refresh delay.
    #[must_use]
    pub const fn with_max_refresh_delay(mut self, delay: Duration) -> Self {
        self.max_refresh_delay = delay;
        self
    }

    /// Sets the expiration safety margin.
    #[must_use]
    pub const fn with_expiration_safety_margin(mut self, margin: Duration) -> Self {
        self.expiration_safety_margin = margin;
        self
    }

    /// Sets the retry backoff bounds.
    #[must_use]
    pub const fn with_backoff(mut self, floor: Duration, ceiling: Duration) -> Self {
        self.backoff_floor = floor;
        self.backoff_ceiling = ceiling;
        self
    }

    /// Sets the staleness reporting threshold.
    #[must_use]
    pub const fn with_max_staleness(mut self, max_staleness: Option<Duration>) -> Self {
        self.max_staleness = max_staleness;
        self
    }

    /// Sets the negative cache TTL.
    #[must_use]
    pub const fn with_negative_cache_ttl(mut self, ttl: Duration) -> Self {
        self.negative_cache_ttl = ttl;
        self
    }

    /// Sets the dynamic-entry cache bound.
    #[must_use]
    pub const fn with_max_cache_duration(mut self, duration: Duration) -> Self {
        self.max_cache_duration = duration;
        self
    }

    /// Validates internal consistency.
    ///
    /// ## Errors
    ///
    /// Returns [`ResolverError::InitializationFailed`] describing the first
    /// inconsistency found.
    pub fn validate(&self) -> ResolverResult<()> {
        if self.min_refresh_delay.is_zero() {
            return Err(ResolverError::InitializationFailed(
                "min_refresh_delay must be non-zero".to_string(),
            ));
        }
        if self.min_refresh_delay > self.max_refresh_delay {
            return Err(ResolverError::InitializationFailed(
                "min_refresh_delay exceeds max_refresh_delay".to_string(),
            ));
        }
        if self.backoff_floor.is_zero() || self.backoff_floor > self.backoff_ceiling {
            return Err(ResolverError::InitializationFailed(
                "backoff_floor must be non-zero and at most backoff_ceiling".to_string(),
            ));
        }
        if self.min_refresh_delay > self.max_cache_duration {
            return Err(ResolverError::InitializationFailed(
                "min_refresh_delay exceeds max_cache_duration".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry delay after `failures` consecutive refresh failures:
    /// exponential from the floor, capped at the ceiling.
    #[must_use]
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.backoff_floor
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_refresh_bounds_rejected() {
        let config = ResolverConfig::new()
            .with_min_refresh_delay(Duration::from_secs(600))
            .with_max_refresh_delay(Duration::from_secs(60));

        assert!(matches!(
            config.validate(),
            Err(ResolverError::InitializationFailed(_))
        ));
    }

    #[test]
    fn backoff_grows_exponentially_to_ceiling() {
        let config = ResolverConfig::new()
            .with_backoff(Duration::from_secs(10), Duration::from_secs(120));

        assert_eq!(config.backoff_delay(1), Duration::from_secs(10));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(20));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(40));
        assert_eq!(config.backoff_delay(4), Duration::from_secs(80));
        assert_eq!(config.backoff_delay(5), Duration::from_secs(120));
        assert_eq!(config.backoff_delay(50), Duration::from_secs(120));
    }
}
