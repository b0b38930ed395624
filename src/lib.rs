//! Asyncunit: result aggregation for tests that assert on concurrent workers.
//!
//! # Overview
//!
//! A test spawns worker threads, each of which reports a single outcome to a
//! shared [`ResultAggregator`]. The test thread then blocks until the expected
//! number of successes arrived, a worker failed, or a deadline passed. Worker
//! failures cross the thread boundary by value, so the controller sees the
//! exact error the worker produced.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use asyncunit::ResultAggregator;
//!
//! let results = Arc::new(ResultAggregator::<std::io::Error>::new());
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let reporter = results.reporter();
//!         std::thread::spawn(move || reporter.success())
//!     })
//!     .collect();
//!
//! results.wait_for(Duration::from_secs(4), 4).expect("all workers succeed");
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`sync`]: The aggregator, its reporting handle and wait errors
//! - [`config`]: Wait defaults and `ASYNCUNIT_*` environment overrides

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod sync;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{AwaitConfig, ConfigError, DEFAULT_AWAIT_TIMEOUT};
pub use sync::{AwaitError, BoxError, Reporter, ResultAggregator};
