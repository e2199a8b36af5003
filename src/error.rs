//! crate error types

use snafu::prelude::*;

use super::api::Error as APIError;
use super::config::ParseDashboardURLError;
use super::sse::ConnectError;

/// crate result type
pub type Result<T> = std::result::Result<T, Error>;

/// crate error type
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    /// Received invalid dashboard url
    #[snafu(display("invalid dashboard url {url}"))]
    InvalidBaseURL {
        /// received url
        url: String,
        /// source error
        source: ParseDashboardURLError,
    },

    /// Create dashboard api client failed
    #[snafu(display("create dashboard api client failed: {source}"))]
    CreateAPIClientFailed {
        /// source error
        source: APIError,
    },

    /// Call dashboard api failed
    #[snafu(display("call dashboard api failed: {source}"))]
    CallAPIFailed {
        /// source error
        source: APIError,
    },

    /// Create update stream connector failed
    #[snafu(display("create update stream connector failed: {source}"))]
    CreateConnectorFailed {
        /// source error
        source: ConnectError,
    },
}
