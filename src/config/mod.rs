//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the executor's retry policy
//! ```
//!
//! Only the retry policy is hot-reloadable; listener and upstream changes
//! need a restart.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, OfflineConfig, RelayConfig, RetryConfig,
    TimeoutConfig, UpstreamConfig,
};
pub use watcher::ConfigWatcher;
