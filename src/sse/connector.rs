use std::time::Duration;

use futures_util::{stream::BoxStream, StreamExt};
use reqwest::{header, StatusCode};
use snafu::prelude::*;

use super::{Frame, FrameStream, FrameStreamError};
use crate::api::APP_USER_AGENT;

/// Stream of frames produced by one connection
pub type FrameSource = BoxStream<'static, Result<Frame, FrameStreamError>>;

static EVENT_STREAM_MIME: &str = "text/event-stream";

/// Error when open an event stream connection
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum ConnectError {
    /// create HTTP client failed
    #[snafu(display("create stream client failed: {source}"))]
    ClientCreateFailed {
        /// source error
        source: reqwest::Error,
    },

    /// build stream request failed
    #[snafu(display("build request for {url} failed: {source}"))]
    BuildRequestFailed {
        /// target url
        url: String,
        /// source error
        source: reqwest::Error,
    },

    /// send stream request failed
    #[snafu(display("GET url {url} failed: {source}"))]
    RequestFailed {
        /// target url
        url: String,
        /// source http error
        source: reqwest::Error,
    },

    /// http response is not OK(200)
    #[snafu(display("GET url {url} got http status code {status_code}"))]
    HTTPStatusNotOK {
        /// request url
        url: String,
        /// received http status code
        status_code: StatusCode,
    },

    /// http response is not an event stream
    #[snafu(display("GET url {url} returned content type {content_type:?}, not an event stream"))]
    NotEventStream {
        /// request url
        url: String,
        /// received content type
        content_type: String,
    },
}

impl ConnectError {
    /// Check if the connection object could not even be created,
    /// as opposed to a transport failure while establishing it
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::ClientCreateFailed { .. } | Self::BuildRequestFailed { .. }
        )
    }
}

/// Opens connections to an event stream.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection, resuming after `last_event_id` if the server supports it.
    ///
    /// `id` of every yielded frame is the last event id of the stream, starting
    /// from `last_event_id`.
    async fn open(&self, last_event_id: Option<&str>) -> Result<FrameSource, ConnectError>;
}

/// [`Connector`] speaking `text/event-stream` over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    url: url::Url,
}

impl HttpConnector {
    /// Create a connector for the stream at `url`
    pub fn new(url: url::Url) -> Result<Self, ConnectError> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context(error::ClientCreateFailed)?;

        Ok(Self { client, url })
    }

    /// stream address
    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl Connector for HttpConnector {
    async fn open(&self, last_event_id: Option<&str>) -> Result<FrameSource, ConnectError> {
        let url = self.url.as_str();

        let mut req = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, EVENT_STREAM_MIME)
            .header(header::CACHE_CONTROL, "no-cache");

        if let Some(id) = last_event_id {
            log::debug!("Resume stream after event id {}", id);
            req = req.header("Last-Event-ID", id);
        }

        let req = req
            .build()
            .with_context(|_| error::BuildRequestFailed { url })?;

        log::debug!("Connecting stream: {}", url);

        let resp = self
            .client
            .execute(req)
            .await
            .with_context(|_| error::RequestFailed { url })?;

        ensure!(
            resp.status() == StatusCode::OK,
            error::HTTPStatusNotOK {
                url,
                status_code: resp.status()
            }
        );

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        ensure!(
            content_type.starts_with(EVENT_STREAM_MIME),
            error::NotEventStream { url, content_type }
        );

        Ok(FrameStream::resume(resp.bytes_stream(), last_event_id.map(str::to_string)).boxed())
    }
}
