//! # skillmatch-live
//!
//! Client side of the skill matcher dashboard: typed access to its REST api
//! and a realtime update client that keeps one server-sent event connection
//! alive, reconnecting with capped exponential backoff.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations, missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod notify;
pub mod realtime;
pub mod sse;

mod error;
pub use error::{Error, Result};

#[cfg(test)]
mod testing;

use std::sync::Arc;

use snafu::prelude::*;

use config::{DashboardURL, ReconnectConfig};
use notify::Hooks;
use realtime::RealtimeClient;

/// Dashboard client instance
#[derive(Debug)]
pub struct Dashboard {
    api_client: api::Client,
    reconnect: ReconnectConfig,
}

impl Dashboard {
    /// Create a client for the dashboard served at `base_url`
    pub fn new<S: AsRef<str> + ?Sized>(base_url: &S) -> Result<Self> {
        let url = base_url.as_ref();
        let base: DashboardURL = url
            .parse()
            .with_context(|_| error::InvalidBaseURL { url })?;

        let api_client = api::Client::new(base).context(error::CreateAPIClientFailed)?;

        log::info!("Create dashboard client for {} success", api_client.base());

        Ok(Self {
            api_client,
            reconnect: ReconnectConfig::default(),
        })
    }

    /// Replace the reconnect policy used by [`start_realtime`](Self::start_realtime)
    pub fn with_reconnect(mut self, config: ReconnectConfig) -> Self {
        self.reconnect = config;
        self
    }

    /// dashboard REST api
    pub fn api(&self) -> &api::Client {
        &self.api_client
    }

    /// Fetch the career roadmap
    pub async fn roadmap(&self) -> Result<api::types::Roadmap> {
        self.api_client
            .roadmap()
            .await
            .context(error::CallAPIFailed)
    }

    /// Fetch interview preparation questions
    pub async fn interview_questions(&self) -> Result<api::types::InterviewQuestions> {
        self.api_client
            .interview_questions()
            .await
            .context(error::CallAPIFailed)
    }

    /// Start the realtime client on the dashboard `/stream` endpoint and connect it.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start_realtime(&self, hooks: Hooks) -> Result<RealtimeClient> {
        let connector = sse::HttpConnector::new(self.api_client.base().stream())
            .context(error::CreateConnectorFailed)?;

        log::debug!("Realtime stream url: {}", connector.url());

        let client = RealtimeClient::spawn(Arc::new(connector), hooks, self.reconnect);
        client.connect();

        Ok(client)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_invalid_base_url() {
        let err = Dashboard::new("ftp://example.com").unwrap_err();
        assert!(matches!(err, Error::InvalidBaseURL { ref url, .. } if url == "ftp://example.com"));
    }

    #[tokio::test]
    async fn test_start_realtime_connects() {
        let dashboard = Dashboard::new("http://127.0.0.1:9").unwrap();
        assert_eq!(
            dashboard.api().base().stream().as_str(),
            "http://127.0.0.1:9/stream"
        );

        let hooks = Hooks::new(
            Arc::new(notify::NotificationBoard::default()),
            Arc::new(|| {}),
        );
        let client = dashboard.start_realtime(hooks).unwrap();

        let mut state = client.watch_state();
        state
            .wait_for(|s| *s != realtime::ConnectionState::Disconnected)
            .await
            .unwrap();
    }
}
