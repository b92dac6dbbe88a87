//! Connection factories.
//!
//! # Responsibilities
//! - Define the factory seam the failure gate decorates
//! - Open PostgreSQL-wire connections (CockroachDB, Postgres) via sqlx
//! - Map driver failures onto `ConnectError`

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::future::Future;
use std::str::FromStr;
use thiserror::Error;

use crate::resilience::timeouts::AttemptContext;

/// Errors raised by a single connection attempt.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The target descriptor could not be understood.
    #[error("invalid connection target: {0}")]
    InvalidTarget(String),

    /// The attempt's context was cancelled.
    #[error("connection attempt cancelled")]
    Cancelled,

    /// The attempt's context deadline passed.
    #[error("connection attempt timed out")]
    TimedOut,

    /// Driver-level failure (network, auth, protocol).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other failure reported by a factory.
    #[error("connection failed: {0}")]
    Failed(String),
}

/// Something that can open a connection to a target.
///
/// Implementations must return promptly with `ConnectError::Cancelled` or
/// `ConnectError::TimedOut` once `ctx` is cancelled or expired;
/// [`AttemptContext::run`] does this for any future.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Send + 'static;

    fn connect(
        &self,
        ctx: &AttemptContext,
        target: &str,
    ) -> impl Future<Output = Result<Self::Connection, ConnectError>> + Send;
}

/// Opens a single `PgConnection` from a `postgresql://` URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl PgConnector {
    pub fn new() -> Self {
        Self
    }
}

impl ConnectionFactory for PgConnector {
    type Connection = PgConnection;

    async fn connect(&self, ctx: &AttemptContext, target: &str) -> Result<PgConnection, ConnectError> {
        let options = PgConnectOptions::from_str(target)
            .map_err(|e| ConnectError::InvalidTarget(e.to_string()))?;

        ctx.run(async move {
            let connection = PgConnection::connect_with(&options).await?;
            Ok(connection)
        })
        .await
    }
}

/// Render a target URL for logging with any password masked.
pub fn redact_target(target: &str) -> String {
    match url::Url::parse(target) {
        Ok(mut url) => {
            if url.password().is_some() {
                // Only fails for cannot-be-a-base URLs, which carry no password.
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<unparsable target>".to_string(),
    }
}
