//! Database bootstrap (v1)
//!
//! Obtains a connection to a slow-to-start database at process startup,
//! then runs the one-off setup transaction.
//!
//! # Architecture Overview
//!
//! ```text
//!   main ──▶ lifecycle::startup::Bootstrapper
//!                 │  inline attempt, then (on failure) one retry task
//!                 ▼
//!            resilience::circuit_breaker::FailureGate
//!                 │  admission check / outcome recording
//!                 ▼
//!            net::connection::PgConnector ──▶ database
//!                 │
//!                 ▼
//!   main ◀── connection ──▶ provision::create_database
//! ```
//!
//! A missed retry deadline ends the process with a non-zero status.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use db_bootstrap::config::loader::{load_config, ConfigError};
use db_bootstrap::config::validation::validate_config;
use db_bootstrap::net::redact_target;
use db_bootstrap::observability::logging::init_logging;
use db_bootstrap::provision;
use db_bootstrap::{BootstrapConfig, Bootstrapper, FailureGate, PgConnector, RetrySettings};

#[derive(Parser)]
#[command(name = "db-bootstrap")]
#[command(about = "Connect to a database through a failure gate, then run setup", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL (overrides target.url).
    #[arg(long)]
    target: Option<String>,

    /// Consecutive failures before the gate starts cooling down.
    #[arg(long)]
    threshold: Option<u32>,

    #[arg(long)]
    poll_interval_secs: Option<u64>,

    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Database to create once connected.
    #[arg(long)]
    database: Option<String>,

    /// Connect only, skip the setup transaction.
    #[arg(long)]
    skip_setup: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut BootstrapConfig) {
        if let Some(target) = &self.target {
            config.target.url = target.clone();
        }
        if let Some(threshold) = self.threshold {
            config.breaker.failure_threshold = threshold;
        }
        if let Some(secs) = self.poll_interval_secs {
            config.retry.poll_interval_secs = secs;
        }
        if let Some(secs) = self.deadline_secs {
            config.retry.deadline_secs = secs;
        }
        if let Some(database) = &self.database {
            config.setup.database = database.clone();
        }
        if self.skip_setup {
            config.setup.enabled = false;
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<BootstrapConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BootstrapConfig::default(),
    };
    cli.apply_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    init_logging(&config.observability)?;

    tracing::info!("db-bootstrap v0.1.0 starting");
    tracing::info!(
        url = %redact_target(&config.target.url),
        failure_threshold = config.breaker.failure_threshold,
        poll_interval_secs = config.retry.poll_interval_secs,
        deadline_secs = config.retry.deadline_secs,
        "Configuration loaded"
    );

    let gate = Arc::new(FailureGate::new(
        PgConnector::new(),
        config.breaker.failure_threshold,
    ));
    let bootstrapper = Bootstrapper::new(gate, RetrySettings::from(&config.retry));

    let bootstrapped = match bootstrapper.bootstrap_detailed(&config.target.url).await {
        Ok(bootstrapped) => bootstrapped,
        Err(e) => {
            tracing::error!(error = %e, "Database connectivity could not be acquired");
            return Err(e.into());
        }
    };
    tracing::info!(
        attempts = bootstrapped.attempts,
        retried = bootstrapped.retried,
        "Database connected"
    );

    if !config.setup.enabled {
        tracing::info!("Setup disabled, exiting");
        return Ok(());
    }

    let mut connection = bootstrapped.connection;
    match provision::create_database(&mut connection, &config.setup.database).await {
        Ok(()) => {}
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "Setup failed");
            return Err(e.into());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Setup step failed");
        }
    }

    Ok(())
}
