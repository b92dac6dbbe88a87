//! Metrics collection.
//!
//! # Metrics
//! - `db_bootstrap_attempts_total` (counter): delegated attempts by outcome
//! - `db_bootstrap_gate_rejections_total` (counter): short-circuited attempts
//! - `db_bootstrap_gate_consecutive_failures` (gauge): current failure streak
//! - `db_bootstrap_duration_seconds` (histogram): time to a usable connection

use std::time::Duration;

/// Record a delegated attempt. `outcome` is `success` or `failure`.
pub fn record_attempt(outcome: &'static str) {
    ::metrics::counter!("db_bootstrap_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_gate_rejection() {
    ::metrics::counter!("db_bootstrap_gate_rejections_total").increment(1);
}

pub fn record_consecutive_failures(failures: u32) {
    ::metrics::gauge!("db_bootstrap_gate_consecutive_failures").set(failures as f64);
}

pub fn record_bootstrap_duration(elapsed: Duration) {
    ::metrics::histogram!("db_bootstrap_duration_seconds").record(elapsed.as_secs_f64());
}
