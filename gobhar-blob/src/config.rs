use std::time::Duration;

use crate::{GatewayError, GatewayResult};

/// Largest accepted `chunk_size`; every read is buffered whole
pub const MAX_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

/// Configuration for range streaming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Bytes requested from the remote store per sub-fetch
    pub chunk_size: u64,

    /// Chunks fetched ahead of the one being delivered (0 = strictly sequential)
    pub prefetch_chunks: usize,

    /// Attempts per sub-fetch before the stream fails
    pub max_attempts: u32,

    /// First retry delay; doubles on every further attempt
    pub base_backoff: Duration,

    /// Upper bound on a single retry delay
    pub max_backoff: Duration,

    /// How long a single remote read may take before it counts as failed
    pub fetch_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512 * 1024, // 512KiB
            prefetch_chunks: 1,
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set chunk size
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set look-ahead depth. Values above 1 are clamped so a session
    /// never has more than two reads in flight.
    pub fn with_prefetch(mut self, chunks: usize) -> Self {
        self.prefetch_chunks = chunks.min(1);
        self
    }

    /// Set attempts per sub-fetch
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set backoff bounds
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max;
        self
    }

    /// Set per-read timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.chunk_size == 0 {
            return Err(GatewayError::config("chunk_size must be greater than zero"));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(GatewayError::config(format!(
                "chunk_size must be at most {MAX_CHUNK_SIZE} bytes"
            )));
        }
        if self.prefetch_chunks > 1 {
            return Err(GatewayError::config("prefetch_chunks must be 0 or 1"));
        }
        if self.max_attempts == 0 {
            return Err(GatewayError::config("max_attempts must be at least 1"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(GatewayError::config("fetch_timeout must be non-zero"));
        }
        if self.base_backoff > self.max_backoff {
            return Err(GatewayError::config("base_backoff exceeds max_backoff"));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (1-based: the delay after the first failure)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Total futures a session may hold at once
    pub(crate) fn in_flight_limit(&self) -> usize {
        self.prefetch_chunks.min(1) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = GatewayConfig::new()
            .with_backoff(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(350));
        assert_eq!(config.backoff_for(40), Duration::from_millis(350));
    }

    #[test]
    fn rejects_degenerate_values() {
        assert!(GatewayConfig::new().validate().is_ok());
        assert!(GatewayConfig::new().with_chunk_size(0).validate().is_err());
        assert!(GatewayConfig::new().with_max_attempts(0).validate().is_err());
    }

    #[test]
    fn prefetch_is_capped() {
        let config = GatewayConfig::new().with_prefetch(8);
        assert_eq!(config.in_flight_limit(), 2);
        assert_eq!(GatewayConfig::new().with_prefetch(0).in_flight_limit(), 1);
    }

    #[test]
    fn prefetch_field_set_directly_is_still_capped() {
        let config = GatewayConfig {
            prefetch_chunks: 8,
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.in_flight_limit(), 2);
    }

    #[test]
    fn rejects_oversized_chunks() {
        let at_limit = GatewayConfig::new().with_chunk_size(MAX_CHUNK_SIZE);
        assert!(at_limit.validate().is_ok());
        let over = GatewayConfig::new().with_chunk_size(MAX_CHUNK_SIZE + 1);
        assert!(over.validate().is_err());
        assert!(GatewayConfig::new().with_chunk_size(u64::MAX).validate().is_err());
    }
}
