//! In-memory backend for tests and offline runs.
//!
//! Series without a canned response answer with the not-found marker, the
//! way the real backend does for missing logs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::{Backend, ResultMetadata, SeriesRequest};
use crate::error::{Result, ViewerError};
use crate::viewer::data::{Direction, FetchOutcome, MetricType, Series, TimeWindow};

/// Canned answer for one series.
#[derive(Debug, Clone)]
pub enum MockSeries {
    Data(Series),
    NotFound,
    /// Transport-level failure.
    Fail(String),
}

type SeriesKey = (String, Option<String>, MetricType, Direction);

#[derive(Default)]
struct MockState {
    metadata: HashMap<String, ResultMetadata>,
    series: HashMap<SeriesKey, MockSeries>,
    requests: Vec<SeriesRequest>,
    metadata_requests: Vec<String>,
    renames: Vec<(String, String)>,
    rename_status: Option<u16>,
    gates: HashMap<TimeWindow, watch::Sender<bool>>,
    metadata_gates: HashMap<String, watch::Sender<bool>>,
}

/// In-memory mock backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register result metadata.
    pub fn insert_result(&self, metadata: ResultMetadata) {
        self.lock().metadata.insert(metadata.id.clone(), metadata);
    }

    /// Register the answer for one (result, job, metric, direction).
    pub fn set_series(
        &self,
        result_id: &str,
        job_id: Option<&str>,
        metric: MetricType,
        direction: Direction,
        answer: MockSeries,
    ) {
        self.lock().series.insert(
            (
                result_id.to_string(),
                job_id.map(String::from),
                metric,
                direction,
            ),
            answer,
        );
    }

    /// Make `rename` answer with the given HTTP status.
    pub fn set_rename_status(&self, status: u16) {
        self.lock().rename_status = Some(status);
    }

    /// Hold every series fetch for `window` until `release` is called.
    pub fn hold(&self, window: TimeWindow) {
        let (tx, _rx) = watch::channel(false);
        self.lock().gates.insert(window, tx);
    }

    pub fn release(&self, window: TimeWindow) {
        if let Some(tx) = self.lock().gates.get(&window) {
            tx.send_replace(true);
        }
    }

    /// Hold the metadata fetch for `result_id` until `release_metadata`.
    pub fn hold_metadata(&self, result_id: &str) {
        let (tx, _rx) = watch::channel(false);
        self.lock().metadata_gates.insert(result_id.to_string(), tx);
    }

    pub fn release_metadata(&self, result_id: &str) {
        if let Some(tx) = self.lock().metadata_gates.get(result_id) {
            tx.send_replace(true);
        }
    }

    /// Series requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<SeriesRequest> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    pub fn metadata_requests(&self) -> Vec<String> {
        self.lock().metadata_requests.clone()
    }

    pub fn renames(&self) -> Vec<(String, String)> {
        self.lock().renames.clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn fetch_metadata(&self, result_id: &str) -> Result<ResultMetadata> {
        let gate = {
            let mut state = self.lock();
            state.metadata_requests.push(result_id.to_string());
            state.metadata_gates.get(result_id).map(|tx| tx.subscribe())
        };

        if let Some(mut rx) = gate {
            rx.wait_for(|open| *open)
                .await
                .map_err(|e| ViewerError::Network(e.to_string()))?;
        }

        self.lock()
            .metadata
            .get(result_id)
            .cloned()
            .ok_or_else(|| ViewerError::NotFound(format!("result {}", result_id)))
    }

    async fn fetch_series(&self, request: &SeriesRequest) -> Result<FetchOutcome> {
        let gate = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.gates.get(&request.window).map(|tx| tx.subscribe())
        };

        if let Some(mut rx) = gate {
            rx.wait_for(|open| *open)
                .await
                .map_err(|e| ViewerError::Network(e.to_string()))?;
        }

        let key = (
            request.result_id.clone(),
            request.job_id.clone(),
            request.metric,
            request.direction,
        );
        match self.lock().series.get(&key).cloned() {
            Some(MockSeries::Data(series)) => Ok(FetchOutcome::Success(series)),
            Some(MockSeries::Fail(reason)) => Err(ViewerError::Network(reason)),
            Some(MockSeries::NotFound) | None => Ok(FetchOutcome::NotFound),
        }
    }

    async fn rename(&self, result_id: &str, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.renames.push((result_id.to_string(), name.to_string()));
        match state.rename_status.unwrap_or(200) {
            status if (200..300).contains(&status) => Ok(()),
            status => Err(ViewerError::RenameRejected {
                status,
                body: "Bad Request".to_string(),
            }),
        }
    }
}
