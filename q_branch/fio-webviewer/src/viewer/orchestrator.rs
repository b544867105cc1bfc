//! Fetch planning and execution for chart units.
//!
//! For one chart unit and window the orchestrator picks a bucket size,
//! issues one request per (result, direction), waits for all of them and
//! returns the outcomes in a fixed order: results in catalog order, read
//! before write. Arrival order never affects the merge.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::backend::{Backend, SeriesRequest};
use super::catalog::ResultCatalog;
use super::data::{ChartUnit, Direction, FetchOutcome, Series, TimeWindow, ViewMode};
use super::granularity;
use crate::error::Result;

/// One constituent fetch of a chart unit and how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSlot {
    pub request: SeriesRequest,
    pub outcome: FetchOutcome,
}

/// Everything fetched for one chart unit in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub unit: ChartUnit,
    /// Resolved window the fetches covered.
    pub window: TimeWindow,
    pub bucket_seconds: u32,
    pub slots: Vec<SeriesSlot>,
}

impl ChartData {
    /// Successful series in merge order.
    pub fn series(&self) -> impl Iterator<Item = &Series> {
        self.slots.iter().filter_map(|slot| match &slot.outcome {
            FetchOutcome::Success(series) => Some(series),
            FetchOutcome::NotFound => None,
        })
    }

    pub fn not_found_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.outcome.is_not_found())
            .count()
    }

    /// True when no constituent fetch produced data. An empty slot list
    /// counts as all-missing.
    pub fn all_not_found(&self) -> bool {
        self.slots.iter().all(|slot| slot.outcome.is_not_found())
    }
}

/// Resolved parameters of one chart-unit fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub window: TimeWindow,
    pub bucket_seconds: u32,
    pub requests: Vec<SeriesRequest>,
}

pub struct FetchOrchestrator {
    backend: Arc<dyn Backend>,
    mode: ViewMode,
}

impl FetchOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, mode: ViewMode) -> Self {
        Self { backend, mode }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Resolve the window, pick the bucket size and list the requests.
    pub fn plan(
        &self,
        catalog: &ResultCatalog,
        unit: &ChartUnit,
        window: TimeWindow,
        pixel_width: u32,
    ) -> Result<FetchPlan> {
        let window = window.resolve(catalog.rmax()?);
        let bucket_seconds = granularity::estimate(pixel_width, window.span_ms() as f64)?.max(1);

        // Aggregated units carry no job, so their requests omit it.
        let job_id = match self.mode {
            ViewMode::Aggregated => None,
            ViewMode::Detailed => unit.job_id.clone(),
        };

        let requests = catalog
            .results()
            .iter()
            .flat_map(|result| {
                let job_id = job_id.clone();
                Direction::ALL.into_iter().map(move |direction| SeriesRequest {
                    result_id: result.id.clone(),
                    job_id: job_id.clone(),
                    metric: unit.metric,
                    window,
                    bucket_seconds,
                    direction,
                })
            })
            .collect();

        Ok(FetchPlan {
            window,
            bucket_seconds,
            requests,
        })
    }

    /// Fetch every constituent series of `unit` concurrently.
    ///
    /// Resolves only after all requests settle. Any transport failure fails
    /// the whole unit so that it is never drawn from partial data;
    /// not-found markers are kept as slots.
    pub async fn fetch(
        &self,
        catalog: &ResultCatalog,
        unit: &ChartUnit,
        window: TimeWindow,
        pixel_width: u32,
    ) -> Result<ChartData> {
        let plan = self.plan(catalog, unit, window, pixel_width)?;

        debug!(
            unit = %unit,
            window = %plan.window,
            bucket_seconds = plan.bucket_seconds,
            requests = plan.requests.len(),
            "Fetching chart unit"
        );

        let outcomes = join_all(
            plan.requests
                .iter()
                .map(|request| self.backend.fetch_series(request)),
        )
        .await;

        let mut slots = Vec::with_capacity(plan.requests.len());
        for (request, outcome) in plan.requests.into_iter().zip(outcomes) {
            let outcome = match outcome {
                Ok(FetchOutcome::Success(series)) => {
                    let label = self.series_label(catalog, &request);
                    FetchOutcome::Success(series.with_label(label))
                }
                Ok(FetchOutcome::NotFound) => {
                    debug!(
                        unit = %unit,
                        result = %request.result_id,
                        direction = %request.direction,
                        "Series not found"
                    );
                    FetchOutcome::NotFound
                }
                Err(e) => {
                    warn!(
                        unit = %unit,
                        result = %request.result_id,
                        direction = %request.direction,
                        error = %e,
                        "Series fetch failed"
                    );
                    return Err(e);
                }
            };
            slots.push(SeriesSlot { request, outcome });
        }

        Ok(ChartData {
            unit: unit.clone(),
            window: plan.window,
            bucket_seconds: plan.bucket_seconds,
            slots,
        })
    }

    /// Legend label: `read seq-run`, or `read Job:1 seq-run` in detailed mode.
    fn series_label(&self, catalog: &ResultCatalog, request: &SeriesRequest) -> String {
        let result_name = catalog
            .result(&request.result_id)
            .map(|r| r.name.as_str())
            .unwrap_or(request.result_id.as_str());

        match (self.mode, &request.job_id) {
            (ViewMode::Detailed, Some(job)) => {
                format!("{} Job:{} {}", request.direction, job, result_name)
            }
            _ => format!("{} {}", request.direction, result_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use crate::viewer::backend::mock::MockSeries;
    use crate::viewer::backend::{MockBackend, ResultMetadata};
    use crate::viewer::data::MetricType;

    fn meta(id: &str, name: &str, runtime: f64) -> ResultMetadata {
        ResultMetadata {
            id: id.to_string(),
            name: name.to_string(),
            runtime: Some(runtime),
            jobs: [("0".to_string(), vec!["bw".to_string()])]
                .into_iter()
                .collect(),
            user_args: None,
            output: None,
        }
    }

    fn series(points: &[(f64, f64)]) -> MockSeries {
        MockSeries::Data(Series::unlabeled(
            points.iter().map(|p| p.0).collect(),
            points.iter().map(|p| Some(p.1)).collect(),
        ))
    }

    fn setup() -> (Arc<MockBackend>, ResultCatalog) {
        let backend = Arc::new(MockBackend::new());
        let catalog = ResultCatalog::from_metadata(vec![
            meta("r1", "first", 60_000.0),
            meta("r2", "second", 30_000.0),
        ]);
        (backend, catalog)
    }

    #[test]
    fn test_plan_resolves_sentinel_and_orders_requests() {
        let (backend, catalog) = setup();
        let orchestrator = FetchOrchestrator::new(backend, ViewMode::Aggregated);
        let unit = ChartUnit::aggregated(MetricType::Bandwidth);

        let plan = orchestrator
            .plan(&catalog, &unit, TimeWindow::FULL_VIEW, 800)
            .unwrap();

        assert_eq!(plan.window, TimeWindow::new(0, 60_000));
        assert_eq!(plan.bucket_seconds, 1);
        let order: Vec<(&str, Direction)> = plan
            .requests
            .iter()
            .map(|r| (r.result_id.as_str(), r.direction))
            .collect();
        assert_eq!(
            order,
            vec![
                ("r1", Direction::Read),
                ("r1", Direction::Write),
                ("r2", Direction::Read),
                ("r2", Direction::Write),
            ]
        );
        assert!(plan.requests.iter().all(|r| r.job_id.is_none()));
    }

    #[test]
    fn test_plan_detailed_includes_job() {
        let (backend, catalog) = setup();
        let orchestrator = FetchOrchestrator::new(backend, ViewMode::Detailed);
        let unit = ChartUnit::detailed(MetricType::Bandwidth, "0");

        let plan = orchestrator
            .plan(&catalog, &unit, TimeWindow::new(5_000, 10_000), 800)
            .unwrap();
        assert_eq!(plan.window, TimeWindow::new(5_000, 10_000));
        assert!(plan
            .requests
            .iter()
            .all(|r| r.job_id.as_deref() == Some("0")));
    }

    #[test]
    fn test_plan_requires_rmax() {
        let backend = Arc::new(MockBackend::new());
        let orchestrator = FetchOrchestrator::new(backend, ViewMode::Aggregated);
        let err = orchestrator
            .plan(
                &ResultCatalog::default(),
                &ChartUnit::aggregated(MetricType::Iops),
                TimeWindow::FULL_VIEW,
                800,
            )
            .unwrap_err();
        assert_eq!(err, ViewerError::EmptyCatalog);
    }

    #[tokio::test]
    async fn test_fetch_labels_and_keeps_not_found_slots() {
        let (backend, catalog) = setup();
        backend.set_series(
            "r1",
            None,
            MetricType::Bandwidth,
            Direction::Write,
            series(&[(1.0, 10.0), (2.0, 12.0)]),
        );
        let orchestrator = FetchOrchestrator::new(backend.clone(), ViewMode::Aggregated);
        let unit = ChartUnit::aggregated(MetricType::Bandwidth);

        let data = orchestrator
            .fetch(&catalog, &unit, TimeWindow::FULL_VIEW, 800)
            .await
            .unwrap();

        assert_eq!(data.slots.len(), 4);
        assert_eq!(data.not_found_count(), 3);
        assert!(!data.all_not_found());
        let labels: Vec<&str> = data.series().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["write first"]);
        assert_eq!(backend.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_detailed_label_names_job() {
        let (backend, catalog) = setup();
        backend.set_series(
            "r2",
            Some("0"),
            MetricType::Bandwidth,
            Direction::Read,
            series(&[(1.0, 1.0)]),
        );
        let orchestrator = FetchOrchestrator::new(backend, ViewMode::Detailed);
        let data = orchestrator
            .fetch(
                &catalog,
                &ChartUnit::detailed(MetricType::Bandwidth, "0"),
                TimeWindow::FULL_VIEW,
                800,
            )
            .await
            .unwrap();
        let labels: Vec<&str> = data.series().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["read Job:0 second"]);
    }

    #[tokio::test]
    async fn test_fetch_transport_failure_fails_unit() {
        let (backend, catalog) = setup();
        backend.set_series(
            "r1",
            None,
            MetricType::Bandwidth,
            Direction::Read,
            series(&[(1.0, 1.0)]),
        );
        backend.set_series(
            "r2",
            None,
            MetricType::Bandwidth,
            Direction::Write,
            MockSeries::Fail("timeout".to_string()),
        );
        let orchestrator = FetchOrchestrator::new(backend.clone(), ViewMode::Aggregated);
        let err = orchestrator
            .fetch(
                &catalog,
                &ChartUnit::aggregated(MetricType::Bandwidth),
                TimeWindow::FULL_VIEW,
                800,
            )
            .await
            .unwrap_err();
        assert_eq!(err, ViewerError::Network("timeout".to_string()));
        // All siblings were still issued.
        assert_eq!(backend.requests().len(), 4);
    }
}
