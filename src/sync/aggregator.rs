//! Result aggregation for concurrently running workers.
//!
//! Workers report exactly one outcome each. A single controller blocks in
//! [`ResultAggregator::wait_for`] until enough successes arrived, a failure
//! was reported, or the deadline passed. A failure always wins over the
//! other two outcomes.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::AwaitConfig;

/// Type-erased worker error, the default error type of an aggregator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned when waiting for results fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwaitError<E = BoxError> {
    /// A worker reported this failure; the value is handed over unchanged.
    Execution(E),
    /// The deadline passed before enough successes were reported.
    CountMismatch {
        /// Successes seen when the deadline passed.
        observed: usize,
        /// Successes the caller waited for.
        expected: usize,
    },
    /// Another thread is already waiting on this aggregator.
    ConcurrentAwait,
    /// The wait was broken off because a thread panicked while holding the
    /// aggregator's lock.
    Interrupted,
}

impl<E> AwaitError<E> {
    /// Returns the worker failure, if this error carries one.
    #[must_use]
    pub fn execution(&self) -> Option<&E> {
        match self {
            Self::Execution(err) => Some(err),
            _ => None,
        }
    }

    /// Consumes the error and returns the worker failure, if any.
    #[must_use]
    pub fn into_execution(self) -> Option<E> {
        match self {
            Self::Execution(err) => Some(err),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for AwaitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution(err) => err.fmt(f),
            Self::CountMismatch { observed, expected } => write!(
                f,
                "Number of flow executions was {observed} instead of {expected}"
            ),
            Self::ConcurrentAwait => write!(
                f,
                "Cannot wait for results, some other thread is already awaiting."
            ),
            Self::Interrupted => write!(f, "wait for results was interrupted"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AwaitError<E> {}

#[derive(Debug)]
struct AggregatorState<E> {
    successes: usize,
    failures: usize,
    failure: Option<E>,
    awaiting: bool,
    // Set when a second wait was refused; the active waiter fails with it too.
    contended: bool,
}

/// Collects worker outcomes and releases a single waiting controller.
///
/// Share it between workers with an [`Arc`] or scoped threads. Reporting
/// never blocks beyond a short critical section; only the wait calls
/// suspend.
#[derive(Debug)]
pub struct ResultAggregator<E = BoxError> {
    config: AwaitConfig,
    state: StdMutex<AggregatorState<E>>,
    cvar: Condvar,
}

impl<E> Default for ResultAggregator<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ResultAggregator<E> {
    /// Creates an aggregator with the default [`AwaitConfig`].
    ///
    /// The environment is not consulted; use
    /// `with_config(AwaitConfig::from_env()?)` for `ASYNCUNIT_*` overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AwaitConfig::default())
    }

    /// Creates an aggregator whose [`wait`](Self::wait) uses `config`.
    #[must_use]
    pub fn with_config(config: AwaitConfig) -> Self {
        Self {
            config,
            state: StdMutex::new(AggregatorState {
                successes: 0,
                failures: 0,
                failure: None,
                awaiting: false,
                contended: false,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Returns the defaults used by [`wait`](Self::wait).
    #[must_use]
    pub fn config(&self) -> &AwaitConfig {
        &self.config
    }

    /// Returns an owned handle for a single worker.
    #[must_use]
    pub fn reporter(self: &Arc<Self>) -> Reporter<E> {
        Reporter {
            inner: Arc::clone(self),
        }
    }

    /// Records a successful worker run.
    pub fn report_success(&self) {
        let mut state = self.lock_state();
        state.successes = state.successes.saturating_add(1);
        self.cvar.notify_all();
        tracing::trace!(
            successes = state.successes,
            "result aggregator recorded success"
        );
    }

    /// Records a failed worker run.
    ///
    /// The first failure is kept for the waiter; later ones are only counted.
    pub fn report_failure(&self, err: E) {
        let mut state = self.lock_state();
        state.failures = state.failures.saturating_add(1);
        let first = state.failure.is_none();
        if first {
            state.failure = Some(err);
        }
        self.cvar.notify_all();
        tracing::debug!(
            first,
            failures = state.failures,
            "result aggregator recorded failure"
        );
    }

    /// Records a worker outcome.
    pub fn report(&self, outcome: Result<(), E>) {
        match outcome {
            Ok(()) => self.report_success(),
            Err(err) => self.report_failure(err),
        }
    }

    /// Returns the number of successes reported so far.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.lock_state().successes
    }

    /// Returns the number of failures reported so far.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.lock_state().failures
    }

    /// Returns true if a failure is waiting to be handed to a waiter.
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.lock_state().failure.is_some()
    }

    /// Returns true while a controller is blocked in a wait call.
    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        self.lock_state().awaiting
    }

    /// Waits using the configured timeout and expected success count.
    pub fn wait(&self) -> Result<(), AwaitError<E>> {
        self.wait_for(self.config.timeout, self.config.expected)
    }

    /// Waits until `expected` successes were reported, a failure was
    /// reported, or `timeout` elapsed since entry.
    ///
    /// A reported failure is returned even when the count was already met
    /// or the deadline already passed. Only one thread may wait at a time:
    /// a second caller gets [`AwaitError::ConcurrentAwait`] without blocking,
    /// and the waiter already inside is woken and fails the same way.
    pub fn wait_for(&self, timeout: Duration, expected: usize) -> Result<(), AwaitError<E>> {
        // `None` when the deadline overflows `Instant`: wait without bound.
        let deadline = Instant::now().checked_add(timeout);

        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                if guard.awaiting {
                    return Err(self.refuse(&mut guard, expected));
                }
                drop(guard);
                self.state.clear_poison();
                tracing::warn!(expected, "result wait interrupted: aggregator lock poisoned");
                return Err(AwaitError::Interrupted);
            }
        };

        if state.awaiting {
            return Err(self.refuse(&mut state, expected));
        }
        state.awaiting = true;
        tracing::debug!(
            expected,
            timeout_ms = timeout.as_millis(),
            successes = state.successes,
            "waiting for results"
        );

        loop {
            if let Some(err) = state.failure.take() {
                state.awaiting = false;
                state.contended = false;
                tracing::debug!(
                    successes = state.successes,
                    failures = state.failures,
                    "result wait ended with worker failure"
                );
                return Err(AwaitError::Execution(err));
            }

            if state.contended {
                state.awaiting = false;
                state.contended = false;
                tracing::debug!(
                    successes = state.successes,
                    "result wait ended: another thread tried to await"
                );
                return Err(AwaitError::ConcurrentAwait);
            }

            if state.successes >= expected {
                state.awaiting = false;
                tracing::debug!(
                    successes = state.successes,
                    expected,
                    "result wait satisfied"
                );
                return Ok(());
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        state.awaiting = false;
                        state.contended = false;
                        let observed = state.successes;
                        tracing::debug!(observed, expected, "result wait timed out");
                        return Err(AwaitError::CountMismatch { observed, expected });
                    }
                    Some(remaining)
                }
                None => None,
            };

            state = match self.sleep(state, remaining) {
                Ok(guard) => guard,
                Err(mut guard) => {
                    guard.awaiting = false;
                    guard.contended = false;
                    drop(guard);
                    self.state.clear_poison();
                    tracing::warn!(expected, "result wait interrupted: aggregator lock poisoned");
                    return Err(AwaitError::Interrupted);
                }
            };
        }
    }

    /// Refuses a second waiter and flags the refusal for the active one.
    fn refuse(&self, state: &mut AggregatorState<E>, expected: usize) -> AwaitError<E> {
        state.contended = true;
        self.cvar.notify_all();
        tracing::warn!(expected, "result wait refused: another thread is awaiting");
        AwaitError::ConcurrentAwait
    }

    /// Blocks on the condvar, releasing the lock while asleep.
    ///
    /// Returns the re-acquired guard as `Err` when the lock was poisoned.
    fn sleep<'a>(
        &self,
        state: MutexGuard<'a, AggregatorState<E>>,
        remaining: Option<Duration>,
    ) -> Result<MutexGuard<'a, AggregatorState<E>>, MutexGuard<'a, AggregatorState<E>>> {
        match remaining {
            Some(timeout) => self
                .cvar
                .wait_timeout(state, timeout)
                .map(|(guard, _)| guard)
                .map_err(|poisoned| poisoned.into_inner().0),
            None => self.cvar.wait(state).map_err(PoisonError::into_inner),
        }
    }

    /// Reporters keep recording on a poisoned lock; only the waiter surfaces it.
    fn lock_state(&self) -> MutexGuard<'_, AggregatorState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned handle through which one worker reports its outcome.
///
/// Every reporting method consumes the handle.
#[derive(Debug)]
pub struct Reporter<E = BoxError> {
    inner: Arc<ResultAggregator<E>>,
}

impl<E> Reporter<E> {
    /// Reports a success.
    pub fn success(self) {
        self.inner.report_success();
    }

    /// Reports a failure.
    pub fn failure(self, err: E) {
        self.inner.report_failure(err);
    }

    /// Reports `outcome`.
    pub fn report(self, outcome: Result<(), E>) {
        self.inner.report(outcome);
    }
}
