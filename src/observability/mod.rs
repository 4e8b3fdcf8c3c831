//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! executor, relay, http, offline
//!     → logging.rs (tracing events, pretty or JSON)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! Request IDs are attached by the HTTP layer and show up in the trace span
//! of every inbound request.

pub mod logging;
pub mod metrics;
