//! Quota-paced dispatch queue
//!
//! A serial [`DispatchQueue`] drained by one dispatch loop, wrapped by
//! [`RateLimitedQueue`] which keeps a checkpoint job inside the queue to pace
//! calls against the remote quota.

mod config;
mod dispatch;
mod limited;
mod pages;

pub use config::QueueConfig;
pub use dispatch::{DispatchQueue, Job, JobKind};
pub use limited::RateLimitedQueue;
pub use pages::Page;
