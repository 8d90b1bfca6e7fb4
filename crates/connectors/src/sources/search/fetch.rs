//! Blocking HTTP access to the search endpoint.

use std::fmt;
use std::io::Read;
use std::sync::OnceLock;
use std::time::Duration;

use chirp_common::config::SearchSourceConfig;
use reqwest::header::ACCEPT;

use super::error::ScanError;

/// Status line and a streaming body. The body is read lazily by the parser.
pub struct FetchResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Performs one blocking GET per call.
pub trait HttpFetcher: Send + Sync + fmt::Debug {
    fn fetch(&self, url: &str) -> Result<FetchResponse, ScanError>;
}

/// [`HttpFetcher`] backed by `reqwest`'s blocking client.
///
/// Must be called from a thread that may block (e.g. inside
/// `tokio::task::spawn_blocking`), never directly on an async worker.
/// The client is built on the first fetch and shared by every later one.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    timeout: Duration,
    user_agent: String,
    // a blocking client cannot be built on an async worker, where
    // fetchers are usually constructed
    client: OnceLock<reqwest::blocking::Client>,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
            client: OnceLock::new(),
        }
    }

    pub fn from_config(config: &SearchSourceConfig) -> Self {
        Self::new(config.timeout(), config.user_agent.clone())
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, reqwest::Error> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, ScanError> {
        let client = self.client().map_err(|e| transport_error(url, e))?;

        tracing::debug!(url, "Sending search request");
        let response = client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| transport_error(url, e))?;

        let status = response.status().as_u16();
        tracing::debug!(url, status, "Search endpoint responded");
        Ok(FetchResponse::new(status, response))
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> ScanError {
    ScanError::Transport {
        url: url.to_string(),
        timed_out: err.is_timeout(),
        source: Box::new(err),
    }
}
