//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, config-gated)
//! ```
//!
//! Routing decisions log at debug; forwarding errors at error. Log format
//! is not load-bearing for correctness.

pub mod logging;
pub mod metrics;
