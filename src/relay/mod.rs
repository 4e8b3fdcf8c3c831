//! Job relay: the message boundary in front of the executor.
//!
//! # Data Flow
//! ```text
//! RelayClient::submit
//!     → pending map (job id → waiter)
//!     → JobSubmission over mpsc
//!     → worker.rs (one task per job, Executor::execute)
//!     → JobOutcome over mpsc, in completion order
//!     → dispatcher looks up the job id, wakes the waiter
//! ```

pub mod client;
pub mod message;
pub mod worker;

pub use client::{RelayClient, RelayError};
pub use message::{JobId, JobOutcome, JobSubmission};
pub use worker::{RelayChannels, RelayWorker};
