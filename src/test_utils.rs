//! Test utilities for Asyncunit.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Wait-outcome assertion macros
//! - A mock worker error type

use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();
#[cfg(test)]
static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Assert that a wait ended with a count mismatch of the given counts.
#[macro_export]
macro_rules! assert_count_mismatch {
    ($result:expr, $observed:expr, $expected:expr) => {
        match $result {
            Err($crate::sync::AwaitError::CountMismatch { observed, expected }) => {
                assert_eq!(observed, $observed, "observed successes");
                assert_eq!(expected, $expected, "expected successes");
            }
            other => panic!(
                "expected CountMismatch({}, {}), got {:?}",
                $observed, $expected, other
            ),
        }
    };
}

/// Assert that a wait ended with a worker failure and yield it.
#[macro_export]
macro_rules! assert_execution_failure {
    ($result:expr) => {
        match $result {
            Err($crate::sync::AwaitError::Execution(err)) => err,
            other => panic!("expected AwaitError::Execution, got {:?}", other),
        }
    };
}

/// Mock worker error for testing.
///
/// `Display` yields the bare message so tests can compare it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    /// Worker found its state invalid.
    IllegalState(String),
    /// Worker was asked to do something it cannot do.
    Unsupported(String),
}

impl std::error::Error for MockError {}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalState(msg) | Self::Unsupported(msg) => f.write_str(msg),
        }
    }
}
