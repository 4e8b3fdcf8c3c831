//! Generative-AI request relay.
//!
//! A resilient executor for JSON API calls (retry with exponential backoff),
//! a job relay that correlates asynchronous outcomes by job id, and an HTTP
//! front with a pass-through proxy and an offline asset cache.

pub mod config;
pub mod executor;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod offline;
pub mod relay;

pub use config::RelayConfig;
pub use executor::{Executor, ExecutorError, HttpTransport, RequestJob, RetryPolicy};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{JobId, JobOutcome, JobSubmission, RelayClient, RelayError};
