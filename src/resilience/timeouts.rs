//! Attempt context: cancellation and deadline enforcement.
//!
//! # Responsibilities
//! - Carry a cancellation token and an optional deadline into a factory call
//! - Fail the in-flight call promptly once cancelled or expired
//!
//! # Design Decisions
//! - Uses Tokio's timer so paused-clock tests drive expiry
//! - Cancellation wins over expiry, expiry wins over completion
//! - Timeout and cancellation errors are distinct from driver errors

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::net::ConnectError;

/// Execution context handed to every connection attempt.
#[derive(Debug, Clone, Default)]
pub struct AttemptContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl AttemptContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Cancel the context. Any call running under it fails promptly.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Run `fut` under this context.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ConnectError>
    where
        F: Future<Output = Result<T, ConnectError>>,
    {
        let expiry = async {
            match self.deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ConnectError::Cancelled),
            _ = expiry => Err(ConnectError::TimedOut),
            result = fut => result,
        }
    }
}
