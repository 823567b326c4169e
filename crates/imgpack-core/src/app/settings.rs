//! Settings - パイプラインと GC の設定値
//!
//! TTL と sweep 間隔は別々の値です（既定はどちらも 1 時間）。
//! コンポーネントのロジックにハードコードせず、起動時にここから渡します。

use std::time::Duration;

use super::retry::RetryPolicy;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Minimum retention of an artifact.
    pub ttl: Duration,
    /// Time between two garbage-collection sweeps.
    pub sweep_interval: Duration,
    /// Fetches running at once within one batch.
    pub fetch_concurrency: usize,
    /// Per-request network timeout handed to the HTTP client.
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            retry: RetryPolicy::no_retry(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_hourly_without_retry() {
        let settings = Settings::default();
        assert_eq!(settings.ttl, Duration::from_secs(3600));
        assert_eq!(settings.sweep_interval, Duration::from_secs(3600));
        assert_eq!(settings.retry.max_attempts, 1);
        assert!(settings.fetch_concurrency > 0);
    }
}
