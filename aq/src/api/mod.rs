//! HTTP API client and its queue-paced facade

mod http;
mod paced;

pub use http::HttpApi;
pub use paced::PacedClient;
