//! Engine configuration

use crate::interpreter::constants::{DEFAULT_RECURSION_LIMIT, MAX_RECURSION_LIMIT};
use std::time::Duration;

/// Deadline applied when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Filename shown in diagnostics
pub const DEFAULT_FILENAME: &str = "<snippet>";

/// Settings shared by every invocation of an [`Engine`](super::Engine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Wall-clock budget per invocation. Zero disables the deadline.
    pub timeout: Duration,
    /// Maximum snippet call depth, at most [`MAX_RECURSION_LIMIT`]
    pub recursion_limit: usize,
    /// Append output printed before an error to the diagnostic
    pub keep_partial_output: bool,
    pub filename: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            keep_partial_output: false,
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for [`EngineConfig`]
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Deadline in (fractional) seconds. Zero, negative and NaN disable it.
    pub fn timeout_secs(self, seconds: f64) -> Self {
        let timeout = Duration::try_from_secs_f64(seconds).unwrap_or(if seconds > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        });
        self.timeout(timeout)
    }

    /// Clamped to `1..=MAX_RECURSION_LIMIT` so deep recursion cannot
    /// exhaust the native stack
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        if limit > MAX_RECURSION_LIMIT {
            tracing::warn!(
                requested = limit,
                max = MAX_RECURSION_LIMIT,
                "recursion limit clamped"
            );
        }
        self.config.recursion_limit = limit.clamp(1, MAX_RECURSION_LIMIT);
        self
    }

    pub fn keep_partial_output(mut self, keep: bool) -> Self {
        self.config.keep_partial_output = keep;
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.config.filename = filename.into();
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.recursion_limit, 100);
        assert!(!config.keep_partial_output);
        assert_eq!(config.filename, "<snippet>");
    }

    #[test]
    fn test_timeout_secs() {
        let config = EngineConfig::builder().timeout_secs(1.5).build();
        assert_eq!(config.timeout, Duration::from_millis(1500));

        assert!(EngineConfig::builder().timeout_secs(0.0).build().timeout.is_zero());
        assert!(EngineConfig::builder().timeout_secs(-3.0).build().timeout.is_zero());
        assert!(EngineConfig::builder().timeout_secs(f64::NAN).build().timeout.is_zero());
        assert_eq!(
            EngineConfig::builder().timeout_secs(f64::INFINITY).build().timeout,
            Duration::MAX
        );
    }

    #[test]
    fn test_recursion_limit_is_clamped() {
        assert_eq!(EngineConfig::builder().recursion_limit(0).build().recursion_limit, 1);
        assert_eq!(
            EngineConfig::builder().recursion_limit(100_000).build().recursion_limit,
            MAX_RECURSION_LIMIT
        );
        assert_eq!(EngineConfig::builder().recursion_limit(500).build().recursion_limit, 500);
    }
}
