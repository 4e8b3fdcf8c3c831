//! HTTP front subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request ID, tracing, timeout)
//!     → handlers.rs
//!         /              status message
//!         /relay/jobs    → relay → JobOutcome
//!         /v1beta/...    → proxy.rs → upstream, response verbatim
//!         /<asset>       → offline cache, else origin, else 404
//! ```

pub mod handlers;
pub mod proxy;
pub mod server;

use thiserror::Error;

pub use server::{AppState, HttpServer};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
