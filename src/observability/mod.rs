//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gate and bootstrap loop produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Structured logging, JSON optional for machine parsing
//! - Metrics go through the `metrics` facade; no exporter is bundled,
//!   an embedding process installs its own recorder

pub mod logging;
pub mod metrics;
