//! Dashboard REST api

mod client;
mod error;
pub mod types;

pub(crate) use client::APP_USER_AGENT;
pub use client::Client;
pub use error::Error;

/// Result type for api module
pub type Result<T> = std::result::Result<T, Error>;
