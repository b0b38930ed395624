#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use asyncunit::ResultAggregator;
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::{Arc, Once};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED5EED;

/// Default pause used by workers that simulate a little work.
pub const WORKER_PAUSE: Duration = Duration::from_millis(50);

const PROPTEST_SEED_ENV: &str = "ASYNCUNIT_PROPTEST_SEED";
const PROPTEST_MAX_SHRINK_ITERS_ENV: &str = "ASYNCUNIT_PROPTEST_MAX_SHRINK_ITERS";

/// Configuration for property tests with optional deterministic seed support.
#[derive(Debug, Clone)]
pub struct PropertyTestConfig {
    /// Fixed seed for reproducibility (overrides CI default when set).
    pub seed: Option<u64>,
    /// Number of successful cases required.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl PropertyTestConfig {
    /// Build a config with defaults for property tests.
    #[must_use]
    pub fn new(cases: u32) -> Self {
        Self {
            seed: read_proptest_seed(),
            cases,
            max_shrink_iters: read_max_shrink_iters()
                .unwrap_or(ProptestConfig::default().max_shrink_iters),
        }
    }

    /// Convert into a ProptestConfig, applying deterministic seed rules.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        let mut config = ProptestConfig::with_cases(self.cases);

        // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
        if matches!(config.rng_seed, RngSeed::Random) {
            if let Some(seed) = self.seed {
                config.rng_seed = RngSeed::Fixed(seed);
            }
        }

        config.max_shrink_iters = self.max_shrink_iters;
        config
    }
}

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    PropertyTestConfig::new(cases).to_proptest_config()
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }

    // If CI is set and no explicit seed is provided, use a fixed seed.
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }

    None
}

fn read_max_shrink_iters() -> Option<u32> {
    std::env::var(PROPTEST_MAX_SHRINK_ITERS_ENV)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
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

/// Simulate worker activity.
pub fn pause(duration: Duration) {
    std::thread::sleep(duration);
}

/// Spawn `count` workers that each run `work` and report its outcome.
pub fn spawn_workers<E, F>(
    results: &Arc<ResultAggregator<E>>,
    count: usize,
    work: F,
) -> Vec<JoinHandle<()>>
where
    E: Send + 'static,
    F: Fn(usize) -> Result<(), E> + Send + Sync + 'static,
{
    let work = Arc::new(work);
    (0..count)
        .map(|index| {
            let reporter = results.reporter();
            let work = Arc::clone(&work);
            std::thread::spawn(move || reporter.report(work(index)))
        })
        .collect()
}

/// Join every worker, failing the test if one panicked.
pub fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}

/// Block until some thread is inside a wait on `results`.
pub fn wait_until_awaiting<E>(results: &ResultAggregator<E>) {
    let started = Instant::now();
    while !results.is_awaiting() {
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "no thread entered the wait"
        );
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Worker error with distinct kinds, used to check that kinds survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Worker observed an invalid state.
    IllegalState(String),
    /// Worker hit an I/O style failure.
    Io(String),
}

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalState(msg) | Self::Io(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for WorkerError {}

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
            Err(::asyncunit::AwaitError::CountMismatch { observed, expected }) => {
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
            Err(::asyncunit::AwaitError::Execution(err)) => err,
            other => panic!("expected AwaitError::Execution, got {:?}", other),
        }
    };
}
