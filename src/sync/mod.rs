//! Synchronization primitives for coordinating test workers.
//!
//! # Primitives
//!
//! - [`ResultAggregator`]: collects success/failure reports from any number
//!   of worker threads and releases a single waiting controller
//! - [`Reporter`]: owned, single-use reporting handle for one worker
//!
//! # Wait Protocol
//!
//! A wait ends in exactly one of three ways, checked in this order on every
//! wake:
//!
//! - **Failure**: a worker reported an error; it is returned unchanged
//! - **Success**: the expected number of successes arrived
//! - **Timeout**: the deadline passed first; the observed count is reported
//!
//! Only one controller may wait at a time. A second concurrent wait is
//! refused immediately instead of queueing.

mod aggregator;

pub use aggregator::{AwaitError, BoxError, Reporter, ResultAggregator};
