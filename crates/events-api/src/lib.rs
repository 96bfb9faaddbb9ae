//! Event service HTTP adapter.
//!
//! Implements the [`pipeline::EventSource`] trait over HTTP:
//! `GET {base_url}/events?start_date=..&end_date=..`. The response body is
//! returned untouched; parsing belongs to the `calculate_stats` task.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, the HTTP client, timeouts, and
//! status handling live here. The [`pipeline`] crate sees only
//! [`pipeline::EventSource`].

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{EventQuery, EventSource, EventSourceError};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Connection settings for [`HttpEventSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpEventSourceConfig {
    /// Service root, e.g. `http://localhost:5000`. A path prefix is kept.
    pub base_url: String,
    /// Path of the events endpoint relative to `base_url`.
    pub endpoint: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpEventSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            endpoint: "events".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Downloads raw event documents with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpEventSource {
    /// Builds the client and validates the endpoint URL.
    pub fn new(config: &HttpEventSourceConfig) -> Result<Self, EventSourceError> {
        if config.timeout_secs == 0 {
            return Err(EventSourceError::InvalidRequest {
                message: "timeout_secs must be at least 1".to_owned(),
            });
        }
        let endpoint = endpoint_url(&config.base_url, &config.endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("event-stats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EventSourceError::InvalidRequest {
                message: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self { client, endpoint })
    }

    /// The full request URL for `query`.
    pub fn request_url(&self, query: &EventQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("start_date", &query.start_date)
            .append_pair("end_date", &query.end_date);
        url
    }
}

fn endpoint_url(base_url: &str, endpoint: &str) -> Result<Url, EventSourceError> {
    let invalid = |detail: String| EventSourceError::InvalidRequest {
        message: format!("invalid event service URL '{base_url}': {detail}"),
    };
    let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(invalid("URL cannot carry a path".to_owned()));
    }
    // Without a trailing slash `join` would replace the last path segment.
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(endpoint.trim_start_matches('/'))
        .map_err(|e| invalid(e.to_string()))
}

#[async_trait]
impl EventSource for HttpEventSource {
    #[instrument(skip_all, fields(start_date = %query.start_date, end_date = %query.end_date))]
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<u8>, EventSourceError> {
        let url = self.request_url(query);
        debug!(%url, "Requesting events");

        let transport = |e: reqwest::Error| EventSourceError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url.clone()).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EventSourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received events");
        Ok(body.to_vec())
    }
}
