//! Wait defaults for [`ResultAggregator`](crate::sync::ResultAggregator).
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic** — values set via builder methods (`with_timeout(..)`)
//! 2. **Environment variables** — values from `ASYNCUNIT_*` env vars
//! 3. **Defaults** — built-in defaults from [`AwaitConfig::default()`]
//!
//! [`ResultAggregator::new`](crate::sync::ResultAggregator::new) only uses the
//! defaults. Environment overrides apply when the caller opts in:
//!
//! ```
//! use asyncunit::{AwaitConfig, ResultAggregator};
//!
//! let config = AwaitConfig::from_env()?.with_expected(4);
//! let results = ResultAggregator::<std::io::Error>::with_config(config);
//! assert_eq!(results.config().expected, 4);
//! # Ok::<(), asyncunit::ConfigError>(())
//! ```
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `ASYNCUNIT_AWAIT_TIMEOUT_MS` | `u64` | `timeout` |
//! | `ASYNCUNIT_AWAIT_EXPECTED` | `usize` | `expected` |

use std::time::Duration;

/// Timeout used by the zero-argument [`wait`](crate::sync::ResultAggregator::wait).
pub const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Success count used by the zero-argument wait.
pub const DEFAULT_EXPECTED_SUCCESSES: usize = 1;

/// Environment variable name for the default wait timeout in milliseconds.
pub const ENV_AWAIT_TIMEOUT_MS: &str = "ASYNCUNIT_AWAIT_TIMEOUT_MS";
/// Environment variable name for the default expected success count.
pub const ENV_AWAIT_EXPECTED: &str = "ASYNCUNIT_AWAIT_EXPECTED";

/// Error raised when an override cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The variable is set but does not hold a valid value.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Human-readable description of the accepted format.
        expected: &'static str,
        /// Raw value as found.
        value: String,
    },
}

/// Defaults applied by the zero-argument wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwaitConfig {
    /// Overall deadline, measured from wait entry.
    pub timeout: Duration,
    /// Number of successes that completes the wait.
    pub expected: usize,
}

impl Default for AwaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_AWAIT_TIMEOUT,
            expected: DEFAULT_EXPECTED_SUCCESSES,
        }
    }
}

impl AwaitConfig {
    /// Sets the wait timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the expected success count.
    #[must_use]
    pub const fn with_expected(mut self, expected: usize) -> Self {
        self.expected = expected;
        self
    }

    /// Builds a config from defaults plus any `ASYNCUNIT_*` overrides in the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides read through `lookup`.
    ///
    /// Only variables for which `lookup` returns a value are applied.
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_AWAIT_TIMEOUT_MS) {
            self.timeout = Duration::from_millis(parse_u64(ENV_AWAIT_TIMEOUT_MS, &val)?);
        }
        if let Some(val) = lookup(ENV_AWAIT_EXPECTED) {
            self.expected = parse_usize(ENV_AWAIT_EXPECTED, &val)?;
        }
        tracing::debug!(
            timeout_ms = self.timeout.as_millis(),
            expected = self.expected,
            "await config resolved"
        );
        Ok(self)
    }
}

fn parse_u64(var: &'static str, val: &str) -> Result<u64, ConfigError> {
    val.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        var,
        expected: "unsigned integer (milliseconds)",
        value: val.to_string(),
    })
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize, ConfigError> {
    val.trim().parse::<usize>().map_err(|_| ConfigError::InvalidValue {
        var,
        expected: "unsigned integer",
        value: val.to_string(),
    })
}
