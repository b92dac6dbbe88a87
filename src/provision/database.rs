//! Application database creation.

use sqlx::postgres::PgConnection;
use sqlx::Connection;
use thiserror::Error;

/// Longest identifier PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Errors from the setup transaction, by the step that failed.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid database name '{0}'")]
    InvalidName(String),

    #[error("could not begin database transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("error creating database: {0}")]
    Execute(#[source] sqlx::Error),

    #[error("could not commit creation of database: {0}")]
    Commit(#[source] sqlx::Error),
}

impl SetupError {
    /// Only a failed commit leaves the database in an unknown state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SetupError::Commit(_))
    }
}

/// Whether `name` is a plain SQL identifier: a letter or underscore
/// followed by letters, digits or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    name.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote `name` as a SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create database `name` inside a transaction on `conn`.
///
/// An error from `CREATE DATABASE` drops the transaction, which rolls it back.
pub async fn create_database(conn: &mut PgConnection, name: &str) -> Result<(), SetupError> {
    if !is_valid_identifier(name) {
        return Err(SetupError::InvalidName(name.to_string()));
    }

    let mut tx = conn.begin().await.map_err(SetupError::Begin)?;

    let statement = format!("CREATE DATABASE {}", quote_identifier(name));
    sqlx::query(&statement)
        .execute(&mut *tx)
        .await
        .map_err(SetupError::Execute)?;

    tx.commit().await.map_err(SetupError::Commit)?;

    tracing::info!(database = name, "Database created");
    Ok(())
}
