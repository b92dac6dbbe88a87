//! Post-connection setup work.
//!
//! Runs once, after the bootstrap hands over a connection. Failures here
//! are reported to the caller and never retried.

pub mod database;

pub use database::{create_database, is_valid_identifier, quote_identifier, SetupError};
