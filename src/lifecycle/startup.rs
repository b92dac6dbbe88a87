//! Startup orchestration: obtain the required connection or give up.
//!
//! # States
//! ```text
//! Initial  → one gated attempt, inline
//!   ok     → Done (no task spawned)
//!   err    → Retrying
//! Retrying → one spawned task, ticking every poll_interval
//!   now > deadline → DeadlineExceeded sent to caller
//!   attempt err    → logged, keep ticking
//!   attempt ok     → connection sent to caller
//! Done     → caller owns the connection
//! ```
//!
//! Gate rejections and factory failures are treated the same: both just
//! extend the loop, which is bounded by the deadline rather than an
//! attempt count.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::config::RetryConfig;
use crate::net::{redact_target, ConnectionFactory};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::FailureGate;
use crate::resilience::timeouts::AttemptContext;

/// Errors that end a bootstrap without a connection.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The retry loop ran past its absolute deadline.
    #[error("database connectivity could not be acquired within {waited:?} ({attempts} attempts)")]
    DeadlineExceeded { waited: Duration, attempts: u32 },

    /// The retry task went away without reporting (panicked).
    #[error("retry task ended without delivering a result")]
    RetryTaskLost,
}

/// Timing for the background retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Time between background attempts.
    pub poll_interval: Duration,
    /// Total budget, counted from the moment the loop starts.
    pub deadline: Duration,
    /// Per-attempt deadline. `None` lets each attempt run to completion.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetrySettings {
    fn from(config: &RetryConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            deadline: config.deadline(),
            attempt_timeout: config.attempt_timeout(),
        }
    }
}

impl RetrySettings {
    fn attempt_context(&self) -> AttemptContext {
        match self.attempt_timeout {
            Some(timeout) => AttemptContext::with_timeout(timeout),
            None => AttemptContext::background(),
        }
    }
}

/// A connection plus how it was obtained.
#[derive(Debug)]
pub struct Bootstrapped<C> {
    pub connection: C,
    /// Gated attempts made, including rejected ones. The last one succeeded.
    pub attempts: u32,
    /// Whether the background retry loop was needed.
    pub retried: bool,
}

/// Drives connection establishment at startup.
pub struct Bootstrapper<F> {
    gate: Arc<FailureGate<F>>,
    settings: RetrySettings,
}

impl<F: ConnectionFactory> Bootstrapper<F> {
    pub fn new(gate: Arc<FailureGate<F>>, settings: RetrySettings) -> Self {
        Self { gate, settings }
    }

    pub fn gate(&self) -> &Arc<FailureGate<F>> {
        &self.gate
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Obtain a connection to `target`, retrying in the background until
    /// the configured deadline.
    pub async fn bootstrap(&self, target: &str) -> Result<F::Connection, BootstrapError> {
        self.bootstrap_detailed(target).await.map(|b| b.connection)
    }

    /// Like [`bootstrap`](Self::bootstrap), also reporting attempt counts.
    pub async fn bootstrap_detailed(
        &self,
        target: &str,
    ) -> Result<Bootstrapped<F::Connection>, BootstrapError> {
        let started = Instant::now();

        match self.gate.attempt(&self.settings.attempt_context(), target).await {
            Ok(connection) => {
                metrics::record_bootstrap_duration(started.elapsed());
                return Ok(Bootstrapped {
                    connection,
                    attempts: 1,
                    retried: false,
                });
            }
            Err(e) => {
                tracing::warn!(attempt = 1u32, error = %e, "connection attempt failed");
            }
        }

        let session = RetrySession::new(self.settings);
        tracing::info!(
            session = %session.id,
            url = %redact_target(target),
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            deadline_ms = self.settings.deadline.as_millis() as u64,
            "Connecting..."
        );

        let (tx, rx) = oneshot::channel();
        tokio::spawn(session.run(self.gate.clone(), target.to_owned(), tx));

        let result = rx.await.unwrap_or(Err(BootstrapError::RetryTaskLost));
        if result.is_ok() {
            metrics::record_bootstrap_duration(started.elapsed());
        }
        result
    }
}

/// State of one background retry loop.
struct RetrySession {
    id: Uuid,
    deadline: Instant,
    settings: RetrySettings,
}

impl RetrySession {
    fn new(settings: RetrySettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            deadline: Instant::now() + settings.deadline,
            settings,
        }
    }

    async fn run<F: ConnectionFactory>(
        self,
        gate: Arc<FailureGate<F>>,
        target: String,
        tx: oneshot::Sender<Result<Bootstrapped<F::Connection>, BootstrapError>>,
    ) {
        let poll = self.settings.poll_interval;
        let mut ticker = time::interval_at(Instant::now() + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The inline attempt already happened.
        let mut attempts: u32 = 1;

        loop {
            ticker.tick().await;

            if Instant::now() > self.deadline {
                tracing::error!(
                    session = %self.id,
                    attempts,
                    "Retry deadline passed without a connection"
                );
                let _ = tx.send(Err(BootstrapError::DeadlineExceeded {
                    waited: self.settings.deadline,
                    attempts,
                }));
                return;
            }

            attempts += 1;
            tracing::info!(session = %self.id, attempt = attempts, "Trying to connect...");

            match gate.attempt(&self.settings.attempt_context(), &target).await {
                Ok(connection) => {
                    tracing::info!(session = %self.id, attempts, "Retry succeeded");
                    let _ = tx.send(Ok(Bootstrapped {
                        connection,
                        attempts,
                        retried: true,
                    }));
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        session = %self.id,
                        attempt = attempts,
                        gate_closed = e.is_unavailable(),
                        error = %e,
                        "connection attempt failed"
                    );
                }
            }
        }
    }
}
