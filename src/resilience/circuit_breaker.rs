//! Failure gate wrapping a connection factory.
//!
//! # States
//! - Open: consecutive failures below threshold, or cooldown elapsed
//! - Closed: failures at/over threshold and cooldown still running
//!
//! # Admission
//! ```text
//! d = consecutive_failures - threshold
//! d <  0          → delegate
//! d >= 0          → cooldown = 2^(d+1) s from last_attempt
//!   now <= reopen → reject with Unavailable (factory not called)
//!   now >  reopen → delegate
//! ```
//!
//! # Design Decisions
//! - The admission check takes the shared lock only and never awaits I/O
//! - Outcomes are recorded under the exclusive lock, one at a time
//! - Check and record are separate critical sections: concurrent callers
//!   can both be admitted. Admission is advisory, mutation is serialized.
//! - Rejections leave both counters untouched

use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::net::{ConnectError, ConnectionFactory};
use crate::observability::metrics;
use crate::resilience::backoff;
use crate::resilience::timeouts::AttemptContext;

/// Failure returned by [`FailureGate::attempt`].
#[derive(Debug, Error)]
pub enum GateError {
    /// Cooldown still running; the factory was not called.
    #[error("service unavailable")]
    Unavailable {
        /// Time left until the gate admits the next call.
        retry_in: Duration,
    },

    /// The wrapped factory failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

impl GateError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GateError::Unavailable { .. })
    }
}

#[derive(Debug)]
struct GateState {
    consecutive_failures: u32,
    last_attempt: Instant,
}

/// Point-in-time copy of the gate's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    pub consecutive_failures: u32,
    pub last_attempt: Instant,
    pub failure_threshold: u32,
}

impl GateSnapshot {
    /// Instant after which the gate admits calls again, or `None` when it
    /// is not cooling down at all.
    pub fn reopens_at(&self) -> Option<Instant> {
        backoff::cooldown(self.consecutive_failures, self.failure_threshold)
            .map(|cooldown| self.last_attempt.checked_add(cooldown).unwrap_or_else(far_future))
    }

    /// Whether a call made at `now` would be rejected.
    pub fn is_closed_at(&self, now: Instant) -> bool {
        self.reopens_at().is_some_and(|reopen| now <= reopen)
    }
}

/// Roughly thirty years out; stands in for an unrepresentable reopen instant.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}

/// Decorator that short-circuits calls to a [`ConnectionFactory`] after
/// repeated failures.
#[derive(Debug)]
pub struct FailureGate<F> {
    factory: F,
    failure_threshold: u32,
    state: RwLock<GateState>,
}

impl<F: ConnectionFactory> FailureGate<F> {
    /// Wrap `factory`, tolerating `failure_threshold` consecutive failures
    /// before the cooldown starts.
    pub fn new(factory: F, failure_threshold: u32) -> Self {
        Self {
            factory,
            failure_threshold,
            state: RwLock::new(GateState {
                consecutive_failures: 0,
                last_attempt: Instant::now(),
            }),
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub async fn snapshot(&self) -> GateSnapshot {
        let state = self.state.read().await;
        GateSnapshot {
            consecutive_failures: state.consecutive_failures,
            last_attempt: state.last_attempt,
            failure_threshold: self.failure_threshold,
        }
    }

    /// Try to open a connection to `target` through the gate.
    pub async fn attempt(
        &self,
        ctx: &AttemptContext,
        target: &str,
    ) -> Result<F::Connection, GateError> {
        {
            let state = self.state.read().await;
            if let Some(cooldown) =
                backoff::cooldown(state.consecutive_failures, self.failure_threshold)
            {
                let now = Instant::now();
                let reopen = state.last_attempt.checked_add(cooldown);
                if reopen.map_or(true, |at| now <= at) {
                    let retry_in = reopen.map_or(Duration::MAX, |at| at.saturating_duration_since(now));
                    tracing::debug!(
                        consecutive_failures = state.consecutive_failures,
                        threshold = self.failure_threshold,
                        cooldown_secs = cooldown.as_secs(),
                        retry_in_ms = retry_in.as_millis() as u64,
                        "Gate closed, rejecting attempt"
                    );
                    metrics::record_gate_rejection();
                    return Err(GateError::Unavailable { retry_in });
                }
            }
        }

        let result = self.factory.connect(ctx, target).await;

        let mut state = self.state.write().await;
        state.last_attempt = Instant::now();
        match result {
            Ok(connection) => {
                if state.consecutive_failures > 0 {
                    tracing::debug!(
                        previous_failures = state.consecutive_failures,
                        "Attempt succeeded, resetting failure count"
                    );
                }
                state.consecutive_failures = 0;
                metrics::record_attempt("success");
                metrics::record_consecutive_failures(0);
                Ok(connection)
            }
            Err(e) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                metrics::record_attempt("failure");
                metrics::record_consecutive_failures(state.consecutive_failures);
                Err(GateError::Connect(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time;

    /// Factory whose outcome is flipped from the test body.
    #[derive(Clone, Default)]
    struct FlakyFactory {
        calls: Arc<AtomicU32>,
        failing: Arc<AtomicBool>,
    }

    impl FlakyFactory {
        fn failing() -> Self {
            let factory = Self::default();
            factory.failing.store(true, Ordering::SeqCst);
            factory
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl ConnectionFactory for FlakyFactory {
        type Connection = u32;

        async fn connect(&self, ctx: &AttemptContext, _target: &str) -> Result<u32, ConnectError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let failing = self.failing.load(Ordering::SeqCst);
            ctx.run(async move {
                if failing {
                    Err(ConnectError::Failed(format!("refused on call {}", call)))
                } else {
                    Ok(call)
                }
            })
            .await
        }
    }

    /// Factory that never completes on its own.
    struct HangingFactory;

    impl ConnectionFactory for HangingFactory {
        type Connection = ();

        async fn connect(&self, ctx: &AttemptContext, _target: &str) -> Result<(), ConnectError> {
            ctx.run(std::future::pending()).await
        }
    }

    const TARGET: &str = "postgresql://root@127.0.0.1:26257/defaultdb";

    #[tokio::test(start_paused = true)]
    async fn test_delegates_up_to_threshold() {
        let factory = FlakyFactory::failing();
        let gate = FailureGate::new(factory.clone(), 3);
        let ctx = AttemptContext::background();

        for expected in 1..=3 {
            let err = gate.attempt(&ctx, TARGET).await.unwrap_err();
            assert!(!err.is_unavailable());
            assert_eq!(factory.calls(), expected);
        }

        let err = gate.attempt(&ctx, TARGET).await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(factory.calls(), 3);
        assert_eq!(gate.snapshot().await.consecutive_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_doubles_per_failure_over_threshold() {
        let factory = FlakyFactory::failing();
        let gate = FailureGate::new(factory.clone(), 1);
        let ctx = AttemptContext::background();

        gate.attempt(&ctx, TARGET).await.unwrap_err();
        assert_eq!(factory.calls(), 1);

        // d = 0: closed for 2s, boundary included.
        time::advance(Duration::from_secs(2)).await;
        assert!(gate.attempt(&ctx, TARGET).await.unwrap_err().is_unavailable());
        time::advance(Duration::from_millis(1)).await;
        assert!(!gate.attempt(&ctx, TARGET).await.unwrap_err().is_unavailable());
        assert_eq!(factory.calls(), 2);

        // d = 1: closed for 4s.
        time::advance(Duration::from_secs(3)).await;
        assert!(gate.attempt(&ctx, TARGET).await.unwrap_err().is_unavailable());
        time::advance(Duration::from_millis(1001)).await;
        assert!(!gate.attempt(&ctx, TARGET).await.unwrap_err().is_unavailable());
        assert_eq!(factory.calls(), 3);

        // d = 2: closed for 8s.
        time::advance(Duration::from_secs(8)).await;
        assert!(gate.attempt(&ctx, TARGET).await.unwrap_err().is_unavailable());
        assert_eq!(factory.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_reports_time_left() {
        let gate = FailureGate::new(FlakyFactory::failing(), 0);
        let ctx = AttemptContext::background();

        // Threshold zero starts closed, counted from construction.
        time::advance(Duration::from_millis(500)).await;
        match gate.attempt(&ctx, TARGET).await {
            Err(GateError::Unavailable { retry_in }) => {
                assert_eq!(retry_in, Duration::from_millis(1500));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_does_not_touch_state() {
        let factory = FlakyFactory::failing();
        let gate = FailureGate::new(factory.clone(), 1);
        let ctx = AttemptContext::background();

        gate.attempt(&ctx, TARGET).await.unwrap_err();
        let before = gate.snapshot().await;

        time::advance(Duration::from_secs(1)).await;
        assert!(gate.attempt(&ctx, TARGET).await.unwrap_err().is_unavailable());
        time::advance(Duration::from_millis(900)).await;
        assert!(gate.attempt(&ctx, TARGET).await.unwrap_err().is_unavailable());

        let after = gate.snapshot().await;
        assert_eq!(before, after);
        assert_eq!(factory.calls(), 1);

        // Reopen time is still anchored at the delegated attempt.
        time::advance(Duration::from_millis(101)).await;
        assert!(!after.is_closed_at(Instant::now()));
        gate.attempt(&ctx, TARGET).await.unwrap_err();
        assert_eq!(factory.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failures() {
        let factory = FlakyFactory::failing();
        let gate = FailureGate::new(factory.clone(), 2);
        let ctx = AttemptContext::background();

        for _ in 0..2 {
            gate.attempt(&ctx, TARGET).await.unwrap_err();
        }
        time::advance(Duration::from_secs(3)).await;
        gate.attempt(&ctx, TARGET).await.unwrap_err();
        assert_eq!(gate.snapshot().await.consecutive_failures, 3);

        factory.set_failing(false);
        time::advance(Duration::from_secs(5)).await;
        let call = gate.attempt(&ctx, TARGET).await.unwrap();
        assert_eq!(call, 4);

        let snapshot = gate.snapshot().await;
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.last_attempt, Instant::now());
        assert!(snapshot.reopens_at().is_none());

        // Fully reopened: next failure is delegated immediately.
        factory.set_failing(true);
        assert!(!gate.attempt(&ctx, TARGET).await.unwrap_err().is_unavailable());
        assert_eq!(factory.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_gate_always_delegates() {
        let factory = FlakyFactory::default();
        let gate = FailureGate::new(factory.clone(), 1);
        let ctx = AttemptContext::background();

        for _ in 0..100 {
            gate.attempt(&ctx, TARGET).await.unwrap();
        }
        assert_eq!(factory.calls(), 100);
        assert_eq!(gate.snapshot().await.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_factory_error_passes_through() {
        let gate = FailureGate::new(FlakyFactory::failing(), 5);
        let err = gate
            .attempt(&AttemptContext::background(), TARGET)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection failed: refused on call 1");
        assert!(matches!(err, GateError::Connect(ConnectError::Failed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_counts_as_failure() {
        let gate = Arc::new(FailureGate::new(HangingFactory, 3));
        let ctx = AttemptContext::background();

        let task = {
            let gate = gate.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { gate.attempt(&ctx, TARGET).await })
        };

        time::sleep(Duration::from_secs(1)).await;
        ctx.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, GateError::Connect(ConnectError::Cancelled)));
        assert_eq!(gate.snapshot().await.consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_failure() {
        let gate = FailureGate::new(HangingFactory, 3);
        let ctx = AttemptContext::with_timeout(Duration::from_secs(2));

        let err = gate.attempt(&ctx, TARGET).await.unwrap_err();
        assert!(matches!(err, GateError::Connect(ConnectError::TimedOut)));
        assert_eq!(gate.snapshot().await.consecutive_failures, 1);
    }
}
