//! Results and jobs discovered at session start.
//!
//! Metadata for all requested results is fetched concurrently; records keep
//! the order of the requested ids regardless of arrival order. The catalog
//! is read-only afterwards.

use futures::future::try_join_all;
use std::cmp::Ordering;
use tracing::{info, warn};

use super::backend::{Backend, ResultMetadata};
use super::data::{BenchmarkResult, ChartUnit, Job, MetricType, ViewMode};
use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, Default)]
pub struct ResultCatalog {
    results: Vec<BenchmarkResult>,
    jobs: Vec<Job>,
}

impl ResultCatalog {
    /// Fetch metadata for every id and build the catalog.
    pub async fn load(backend: &dyn Backend, result_ids: &[String]) -> Result<Self> {
        let metadata =
            try_join_all(result_ids.iter().map(|id| backend.fetch_metadata(id))).await?;
        let catalog = Self::from_metadata(metadata);

        info!(
            results = catalog.results.len(),
            jobs = catalog.jobs.len(),
            "Loaded result catalog"
        );
        Ok(catalog)
    }

    pub fn from_metadata(metadata: Vec<ResultMetadata>) -> Self {
        let mut results = Vec::with_capacity(metadata.len());
        let mut jobs = Vec::new();

        for meta in metadata {
            let mut job_ids: Vec<&String> = meta.jobs.keys().collect();
            job_ids.sort_by(|a, b| compare_job_ids(a, b));

            for job_id in job_ids {
                let mut metric_types = Vec::new();
                for log_type in &meta.jobs[job_id] {
                    match MetricType::from_wire(log_type) {
                        Some(metric) if !metric_types.contains(&metric) => {
                            metric_types.push(metric)
                        }
                        Some(_) => {}
                        None => warn!(
                            result = %meta.id,
                            job = %job_id,
                            log_type = %log_type,
                            "Skipping unknown log type"
                        ),
                    }
                }
                jobs.push(Job {
                    id: job_id.clone(),
                    result_id: meta.id.clone(),
                    metric_types,
                });
            }

            let total_runtime_ms = match meta.runtime {
                Some(ms) if ms.is_finite() && ms > 0.0 => ms as i64,
                _ => 0,
            };
            results.push(BenchmarkResult {
                id: meta.id,
                name: meta.name,
                total_runtime_ms,
                user_args: meta.user_args,
                output: meta.output,
            });
        }

        Self { results, jobs }
    }

    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn result(&self, result_id: &str) -> Option<&BenchmarkResult> {
        self.results.iter().find(|r| r.id == result_id)
    }

    /// Longest runtime across all results. Undefined for an empty catalog.
    pub fn rmax(&self) -> Result<i64> {
        self.results
            .iter()
            .map(|r| r.total_runtime_ms)
            .max()
            .ok_or(ViewerError::EmptyCatalog)
    }

    /// First job of the first result; its metrics decide which charts exist.
    pub fn representative_job(&self) -> Option<&Job> {
        self.jobs.first()
    }

    /// Chart units to draw in `mode`.
    ///
    /// Aggregated: one unit per metric of the representative job.
    /// Detailed: one unit per (metric, distinct job id), metric-major.
    pub fn chart_units(&self, mode: ViewMode) -> Vec<ChartUnit> {
        let Some(representative) = self.representative_job() else {
            return Vec::new();
        };

        match mode {
            ViewMode::Aggregated => representative
                .metric_types
                .iter()
                .map(|&metric| ChartUnit::aggregated(metric))
                .collect(),
            ViewMode::Detailed => {
                let mut job_ids: Vec<&str> = Vec::new();
                for job in &self.jobs {
                    if !job_ids.contains(&job.id.as_str()) {
                        job_ids.push(&job.id);
                    }
                }
                representative
                    .metric_types
                    .iter()
                    .flat_map(|&metric| {
                        job_ids
                            .iter()
                            .map(move |job| ChartUnit::detailed(metric, *job))
                    })
                    .collect()
            }
        }
    }
}

/// Numeric job ids sort numerically, anything else after them by text.
fn compare_job_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::backend::MockBackend;
    use std::collections::BTreeMap;

    fn meta(id: &str, runtime: Option<f64>, jobs: &[(&str, &[&str])]) -> ResultMetadata {
        ResultMetadata {
            id: id.to_string(),
            name: format!("{} name", id),
            runtime,
            jobs: jobs
                .iter()
                .map(|(job, types)| {
                    (
                        job.to_string(),
                        types.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect::<BTreeMap<_, _>>(),
            user_args: None,
            output: None,
        }
    }

    #[tokio::test]
    async fn test_load_preserves_requested_order() {
        let backend = MockBackend::new();
        backend.insert_result(meta("a", Some(1000.0), &[("0", &["bw"])]));
        backend.insert_result(meta("b", Some(5000.0), &[("0", &["bw"])]));
        backend.insert_result(meta("c", Some(3000.0), &[("0", &["bw"])]));

        // "c" is requested first but settles last.
        backend.hold_metadata("c");
        let ids = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let release = async {
            while backend.metadata_requests().len() < ids.len() {
                tokio::task::yield_now().await;
            }
            backend.release_metadata("c");
        };
        let (catalog, ()) = tokio::join!(ResultCatalog::load(&backend, &ids), release);
        let catalog = catalog.unwrap();

        let order: Vec<&str> = catalog.results().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert_eq!(catalog.rmax(), Ok(5000));
    }

    #[tokio::test]
    async fn test_load_fails_on_missing_result() {
        let backend = MockBackend::new();
        backend.insert_result(meta("a", Some(1000.0), &[]));
        let ids = vec!["a".to_string(), "missing".to_string()];
        let err = ResultCatalog::load(&backend, &ids).await.unwrap_err();
        assert!(matches!(err, ViewerError::NotFound(_)));
    }

    #[test]
    fn test_empty_catalog_has_no_rmax() {
        let catalog = ResultCatalog::from_metadata(vec![]);
        assert_eq!(catalog.rmax(), Err(ViewerError::EmptyCatalog));
        assert!(catalog.chart_units(ViewMode::Aggregated).is_empty());
    }

    #[test]
    fn test_null_runtime_counts_as_zero() {
        let catalog = ResultCatalog::from_metadata(vec![meta("a", None, &[])]);
        assert_eq!(catalog.results()[0].total_runtime_ms, 0);
        assert_eq!(catalog.rmax(), Ok(0));
    }

    #[test]
    fn test_jobs_sorted_numerically_and_unknown_types_skipped() {
        let catalog = ResultCatalog::from_metadata(vec![meta(
            "a",
            Some(1.0),
            &[("10", &["bw"]), ("2", &["iops", "p99", "iops"]), ("0", &["lat"])],
        )]);
        let ids: Vec<&str> = catalog.jobs().iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "2", "10"]);
        assert_eq!(catalog.jobs()[1].metric_types, vec![MetricType::Iops]);
    }

    #[test]
    fn test_chart_units_per_mode() {
        let catalog = ResultCatalog::from_metadata(vec![
            meta("a", Some(1.0), &[("0", &["bw", "iops"]), ("1", &["bw", "iops"])]),
            meta("b", Some(1.0), &[("0", &["bw", "iops"])]),
        ]);

        assert_eq!(
            catalog.chart_units(ViewMode::Aggregated),
            vec![
                ChartUnit::aggregated(MetricType::Bandwidth),
                ChartUnit::aggregated(MetricType::Iops),
            ]
        );
        assert_eq!(
            catalog.chart_units(ViewMode::Detailed),
            vec![
                ChartUnit::detailed(MetricType::Bandwidth, "0"),
                ChartUnit::detailed(MetricType::Bandwidth, "1"),
                ChartUnit::detailed(MetricType::Iops, "0"),
                ChartUnit::detailed(MetricType::Iops, "1"),
            ]
        );
        assert_eq!(
            catalog
                .jobs()
                .iter()
                .filter(|job| job.result_id == "b")
                .count(),
            1
        );
    }
}
