//! apiqueue - quota-paced dispatch for rate-limited APIs
//!
//! Calls are queued and run strictly one at a time. A checkpoint job that
//! lives inside the queue reads the remote quota, moves itself so that only
//! `remaining` calls run before the next check, stops the queue when idle and
//! holds it until the quota resets when nothing is left. Calls the server
//! rejects for quota exhaustion are quietly resubmitted.
//!
//! # Modules
//!
//! - [`queue`] - Dispatch queue, rate-limited queue and pagination
//! - [`quota`] - Quota snapshots and the source trait
//! - [`api`] - HTTP client and the queue-paced facade
//! - [`error`] - Error type shared by calls and the queue
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod queue;
pub mod quota;

// Re-export commonly used types
pub use api::{HttpApi, PacedClient};
pub use config::{ApiConfig, Config};
pub use error::ApiError;
pub use queue::{DispatchQueue, Job, JobKind, Page, QueueConfig, RateLimitedQueue};
pub use quota::{QuotaSnapshot, QuotaSource};
