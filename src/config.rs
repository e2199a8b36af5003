//! Client configuration

use std::{fmt::Display, str::FromStr, time::Duration};

use snafu::prelude::*;

/// Path of the server-sent update stream, relative to the dashboard base url
pub static STREAM_PATH: &str = "/stream";

/// Parse string as dashboard url error
#[derive(Debug, Snafu)]
#[snafu(
    visibility(pub(crate)),
    module(parse_dashboard_url_error_variant),
    context(suffix(false))
)]
pub enum ParseDashboardURLError {
    /// the str is not a valid url
    #[snafu(display("{s} is an invalid url: {source}"))]
    InvalidURL {
        /// string be parsed
        s: String,
        /// source error
        source: url::ParseError,
    },

    /// the parsed url schema is not http(s)
    #[snafu(display("the url {s} has invalid schema {schema}, only http or https is ok"))]
    InvalidSchema {
        /// the url
        s: String,
        /// invalid schema
        schema: String,
    },

    /// the parsed url has no host
    #[snafu(display("the dashboard url {s} has no host"))]
    NoHost {
        /// the url
        s: String,
    },
}

/// Base address of the dashboard server, every endpoint is resolved under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardURL {
    base: url::Url,
}

impl DashboardURL {
    /// resolve an absolute endpoint path (like `/api/roadmap`) under the base url
    pub fn endpoint(&self, path: &str) -> url::Url {
        let mut u = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        u.set_path(&format!("{}{}", prefix, path));
        u
    }

    /// url of the server-sent update stream
    pub fn stream(&self) -> url::Url {
        self.endpoint(STREAM_PATH)
    }
}

impl FromStr for DashboardURL {
    type Err = ParseDashboardURLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut url = url::Url::parse(s)
            .with_context(|_| parse_dashboard_url_error_variant::InvalidURL { s })?;

        ensure!(
            url.scheme() == "http" || url.scheme() == "https",
            parse_dashboard_url_error_variant::InvalidSchema {
                s,
                schema: url.scheme(),
            }
        );

        ensure!(
            url.host().is_some(),
            parse_dashboard_url_error_variant::NoHost { s }
        );

        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { base: url })
    }
}

impl Display for DashboardURL {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.base.fmt(f)
    }
}

/// Reconnect policy of the realtime client
///
/// The delay before the n-th consecutive reconnect is `2^n * base_delay`,
/// with n clamped to `max_attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// attempt counter ceiling
    pub max_attempt: u32,
    /// delay unit
    pub base_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempt: 6,
            base_delay: Duration::from_millis(1000),
        }
    }
}
