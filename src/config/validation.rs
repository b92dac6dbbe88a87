//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, non-empty target)
//! - Validate the setup database name before it reaches SQL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BootstrapConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::BootstrapConfig;
use crate::provision::is_valid_identifier;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target.url must not be empty")]
    EmptyTarget,

    #[error("retry.poll_interval_secs must be greater than zero")]
    ZeroPollInterval,

    #[error("retry.deadline_secs must be greater than zero")]
    ZeroDeadline,

    #[error("retry.attempt_timeout_secs must be greater than zero when set")]
    ZeroAttemptTimeout,

    #[error("setup.database '{0}' is not a valid identifier")]
    InvalidDatabaseName(String),
}

/// Check a configuration for semantic problems.
pub fn validate_config(config: &BootstrapConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.target.url.trim().is_empty() {
        errors.push(ValidationError::EmptyTarget);
    }
    if config.retry.poll_interval_secs == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }
    if config.retry.deadline_secs == 0 {
        errors.push(ValidationError::ZeroDeadline);
    }
    if config.retry.attempt_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroAttemptTimeout);
    }
    if config.setup.enabled && !is_valid_identifier(&config.setup.database) {
        errors.push(ValidationError::InvalidDatabaseName(
            config.setup.database.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
