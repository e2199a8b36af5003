use reqwest::StatusCode;
use snafu::prelude::*;

use super::error::variant::*;
use super::types::*;
use super::Result;
use crate::config::DashboardURL;

pub(crate) static APP_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

static ROADMAP_PATH: &str = "/api/roadmap";
static INTERVIEW_QUESTIONS_PATH: &str = "/api/interview-questions";

/// Dashboard HTTP API Client
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    base: DashboardURL,
}

impl Client {
    /// create a new api client for the dashboard at `base`
    pub fn new(base: DashboardURL) -> Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .deflate(true)
            .user_agent(APP_USER_AGENT)
            .build()
            .context(ClientCreateFailed)?;

        Ok(Self { client, base })
    }

    /// dashboard address this client talks to
    pub fn base(&self) -> &DashboardURL {
        &self.base
    }

    /// GET `path` and decode the json body, a `null` body decodes as `R::default()`
    async fn request<R>(&self, path: &str) -> Result<R>
    where
        R: serde::de::DeserializeOwned + Default,
    {
        let url = self.base.endpoint(path).to_string();

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|_| RequestFailed { url: &url })?;

        ensure!(
            resp.status() == StatusCode::OK,
            HTTPStatusNotOK {
                url: &url,
                status_code: resp.status()
            }
        );

        let body = resp
            .bytes()
            .await
            .with_context(|_| RequestFailed { url: &url })?;

        log::trace!("GET {} returned {} bytes", url, body.len());

        serde_json::from_slice::<Option<R>>(&body)
            .map(Option::unwrap_or_default)
            .with_context(|_| ParseBodyFailed { body })
    }

    /// Call /api/roadmap, get career roadmap phases
    pub async fn roadmap(&self) -> Result<Roadmap> {
        self.request(ROADMAP_PATH).await
    }

    /// Call /api/interview-questions, get interview preparation questions
    pub async fn interview_questions(&self) -> Result<InterviewQuestions> {
        self.request(INTERVIEW_QUESTIONS_PATH).await
    }
}
