//! Results API collaborator.
//!
//! `Backend` is the seam between the pipeline and the results API:
//!
//! - `GET /api/{result}` - result metadata
//! - `GET /api/{result}/{metric}.json?...` - aggregated series
//! - `GET /api/{result}/{job}/{metric}.json?...` - per-job series
//! - `PUT /api/{result}` - rename
//!
//! `HttpBackend` talks to a running server, `MockBackend` serves canned
//! data from memory.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use super::data::{Direction, FetchOutcome, MetricType, Series, TimeWindow};
use super::granularity::granularity_param;
use crate::error::{Result, ViewerError};

pub use http::HttpBackend;
pub use mock::MockBackend;

/// Access to the results API.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch metadata for one result.
    async fn fetch_metadata(&self, result_id: &str) -> Result<ResultMetadata>;

    /// Fetch one aggregated series. A missing log is `Ok(FetchOutcome::NotFound)`.
    async fn fetch_series(&self, request: &SeriesRequest) -> Result<FetchOutcome>;

    /// Rename a result.
    async fn rename(&self, result_id: &str, name: &str) -> Result<()>;
}

// --- Requests ---

/// Parameters of a single series fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesRequest {
    pub result_id: String,
    /// `None` requests the result-wide aggregate.
    pub job_id: Option<String>,
    pub metric: MetricType,
    /// Resolved window, never the sentinel.
    pub window: TimeWindow,
    pub bucket_seconds: u32,
    pub direction: Direction,
}

impl SeriesRequest {
    /// Path relative to the API root.
    pub fn path(&self) -> String {
        let result = urlencoding::encode(&self.result_id);
        match &self.job_id {
            Some(job) => format!(
                "/api/{}/{}/{}.json",
                result,
                urlencoding::encode(job),
                self.metric
            ),
            None => format!("/api/{}/{}.json", result, self.metric),
        }
    }

    pub fn query(&self) -> String {
        format!(
            "start_frame={}&end_frame={}&granularity={}&io_type={}",
            self.window.left_ms,
            self.window.right_ms,
            granularity_param(self.bucket_seconds),
            self.direction
        )
    }

    pub fn path_and_query(&self) -> String {
        format!("{}?{}", self.path(), self.query())
    }
}

// --- Responses ---

/// Body of `GET /api/{result}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResultMetadata {
    pub id: String,
    pub name: String,
    /// Longest of read/write runtime in milliseconds. `null` when fio
    /// reported no group runtime.
    #[serde(default)]
    pub runtime: Option<f64>,
    /// Job id -> log types present for that job.
    #[serde(default)]
    pub jobs: BTreeMap<String, Vec<String>>,
    #[serde(default, rename = "fio-userargs")]
    pub user_args: Option<String>,
    #[serde(default, rename = "fio-output")]
    pub output: Option<String>,
}

/// Body of a series fetch: samples, or the `{"error": "404"}` marker the
/// backend sends with status 200.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SeriesPayload {
    Error {
        error: String,
    },
    Data {
        x: Vec<f64>,
        #[serde(deserialize_with = "deserialize_gaps")]
        y: Vec<Option<f64>>,
    },
}

impl SeriesPayload {
    pub fn into_outcome(self) -> Result<FetchOutcome> {
        match self {
            SeriesPayload::Error { error } if error == "404" => Ok(FetchOutcome::NotFound),
            SeriesPayload::Error { error } => Err(ViewerError::Backend(error)),
            SeriesPayload::Data { x, y } => {
                if x.len() != y.len() {
                    return Err(ViewerError::Decode(format!(
                        "series has {} x values but {} y values",
                        x.len(),
                        y.len()
                    )));
                }
                Ok(FetchOutcome::Success(Series::unlabeled(x, y)))
            }
        }
    }
}

/// Empty buckets come back as `"None"` or `null`; both become gaps.
fn deserialize_gaps<'de, D>(deserializer: D) -> std::result::Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.iter().map(serde_json::Value::as_f64).collect())
}
