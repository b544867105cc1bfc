//! HTTP client for the results API.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{Backend, ResultMetadata, SeriesPayload, SeriesRequest};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::viewer::data::{Direction, FetchOutcome, MetricType};

/// Results API client backed by `reqwest`.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a new client with the given base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ViewerError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &ViewerConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Download link for one raw log as CSV.
    pub fn csv_url(
        &self,
        result_id: &str,
        job_id: &str,
        metric: MetricType,
        direction: Direction,
    ) -> String {
        format!(
            "{}/api/{}/{}/{}.csv?io_type={}",
            self.base_url,
            urlencoding::encode(result_id),
            urlencoding::encode(job_id),
            metric,
            direction
        )
    }

    /// Download link for the whole result directory as `.tar.gz`.
    pub fn archive_url(&self, result_id: &str) -> String {
        format!("{}/api/{}/targz", self.base_url, urlencoding::encode(result_id))
    }

    /// Link to the per-job summary statistics.
    pub fn summary_url(&self, result_id: &str) -> String {
        format!("{}/api/{}/json", self.base_url, urlencoding::encode(result_id))
    }

    fn result_url(&self, result_id: &str) -> String {
        format!("{}/api/{}", self.base_url, urlencoding::encode(result_id))
    }
}

#[derive(Serialize)]
struct RenameBody<'a> {
    name: &'a str,
}

fn transport_error(url: &str, e: reqwest::Error) -> ViewerError {
    if e.is_decode() {
        ViewerError::Decode(format!("{}: {}", url, e))
    } else {
        ViewerError::Network(format!("{}: {}", url, e))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_metadata(&self, result_id: &str) -> Result<ResultMetadata> {
        let url = self.result_url(result_id);
        debug!(url = %url, "Fetching result metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ViewerError::NotFound(format!("result {}", result_id)));
        }
        if !status.is_success() {
            return Err(ViewerError::Network(format!("{} returned {}", url, status)));
        }

        response
            .json::<ResultMetadata>()
            .await
            .map_err(|e| transport_error(&url, e))
    }

    async fn fetch_series(&self, request: &SeriesRequest) -> Result<FetchOutcome> {
        let url = format!("{}{}", self.base_url, request.path_and_query());
        debug!(url = %url, "Fetching series");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::Network(format!("{} returned {}", url, status)));
        }

        let payload = response
            .json::<SeriesPayload>()
            .await
            .map_err(|e| transport_error(&url, e))?;
        payload.into_outcome()
    }

    async fn rename(&self, result_id: &str, name: &str) -> Result<()> {
        let url = self.result_url(result_id);
        debug!(url = %url, name = %name, "Renaming result");

        let response = self
            .client
            .put(&url)
            .json(&RenameBody { name })
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ViewerError::RenameRejected {
            status: status.as_u16(),
            body,
        })
    }
}
