//! Core data types for the benchmark viewer.
//!
//! These types are shared between the catalog, the fetch pipeline and the
//! renderer. Results and jobs are read-only once the catalog is loaded;
//! series are created fresh for every fetch cycle.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Metric types
// ============================================================================

/// Measurement recorded by a fio job log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricType {
    Bandwidth,
    Iops,
    Latency,
    SubmissionLatency,
    CompletionLatency,
}

impl MetricType {
    pub const ALL: [MetricType; 5] = [
        MetricType::Bandwidth,
        MetricType::Iops,
        MetricType::Latency,
        MetricType::SubmissionLatency,
        MetricType::CompletionLatency,
    ];

    /// Log type name used in API paths: bw, iops, lat, slat, clat.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Bandwidth => "bw",
            MetricType::Iops => "iops",
            MetricType::Latency => "lat",
            MetricType::SubmissionLatency => "slat",
            MetricType::CompletionLatency => "clat",
        }
    }

    /// Display unit for the Y axis.
    pub fn unit(&self) -> &'static str {
        match self {
            MetricType::Bandwidth => "MB/s",
            MetricType::Iops => "iops",
            MetricType::Latency | MetricType::SubmissionLatency | MetricType::CompletionLatency => {
                "ms"
            }
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        MetricType::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MetricType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetricType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MetricType::from_wire(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown metric type: {}, expected bw, iops, lat, slat or clat",
                s
            ))
        })
    }
}

// ============================================================================
// I/O direction
// ============================================================================

/// Every series fetch is split by direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// Fetch order within a chart unit. Merge order follows it.
    pub const ALL: [Direction; 2] = [Direction::Read, Direction::Write];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// View mode
// ============================================================================

/// How chart units are formed from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// One chart per metric, all results combined, one representative job.
    #[default]
    Aggregated,
    /// One chart per (metric, job), all results combined.
    Detailed,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Aggregated => "aggregated",
            ViewMode::Detailed => "detailed",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aggregated" => Ok(ViewMode::Aggregated),
            "detailed" => Ok(ViewMode::Detailed),
            _ => Err(format!(
                "unknown view mode: {}, expected aggregated or detailed",
                s
            )),
        }
    }
}

// ============================================================================
// Catalog records
// ============================================================================

/// One completed benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub id: String,
    pub name: String,
    pub total_runtime_ms: i64,
    /// Command line the run was started with, if the backend reports it.
    pub user_args: Option<String>,
    /// Raw fio output, if the backend reports it.
    pub output: Option<String>,
}

/// One fio job inside a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    /// Id of the owning result.
    pub result_id: String,
    /// Metrics this job produced, in metadata order, without duplicates.
    pub metric_types: Vec<MetricType>,
}

// ============================================================================
// Time window
// ============================================================================

/// Requested time range in milliseconds from the start of the run.
///
/// `(0, 0)` is the full-view sentinel and resolves to `[0, rmax]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeWindow {
    pub left_ms: i64,
    pub right_ms: i64,
}

impl TimeWindow {
    pub const FULL_VIEW: TimeWindow = TimeWindow {
        left_ms: 0,
        right_ms: 0,
    };

    pub fn new(left_ms: i64, right_ms: i64) -> Self {
        Self { left_ms, right_ms }
    }

    pub fn is_full_view(&self) -> bool {
        *self == Self::FULL_VIEW
    }

    pub fn span_ms(&self) -> i64 {
        self.right_ms - self.left_ms
    }

    /// Substitute the sentinel with `[0, rmax]`.
    pub fn resolve(self, rmax_ms: i64) -> TimeWindow {
        if self.is_full_view() {
            TimeWindow::new(0, rmax_ms)
        } else {
            self
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}ms, {}ms]", self.left_ms, self.right_ms)
    }
}

// ============================================================================
// Series
// ============================================================================

/// Aggregated samples for one (result, job, metric, direction) fetch.
///
/// `x` holds bucket end offsets in seconds. `None` in `y` marks a bucket
/// with no samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<Option<f64>>,
    pub label: String,
}

impl Series {
    pub fn unlabeled(x: Vec<f64>, y: Vec<Option<f64>>) -> Self {
        Self {
            x,
            y,
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Result of one series fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Series),
    /// The backend has no log for this combination.
    NotFound,
}

impl FetchOutcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchOutcome::NotFound)
    }
}

// ============================================================================
// Chart units
// ============================================================================

/// Smallest independently fetched and drawn chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartUnit {
    pub metric: MetricType,
    /// Set in detailed mode only. Aggregated fetches omit the job.
    pub job_id: Option<String>,
}

impl ChartUnit {
    pub fn aggregated(metric: MetricType) -> Self {
        Self {
            metric,
            job_id: None,
        }
    }

    pub fn detailed(metric: MetricType, job_id: impl Into<String>) -> Self {
        Self {
            metric,
            job_id: Some(job_id.into()),
        }
    }

    /// Stable identifier for the plot area, e.g. `plotbw` or `plotbw-job0`.
    pub fn element_id(&self) -> String {
        match &self.job_id {
            Some(job) => format!("plot{}-job{}", self.metric, job),
            None => format!("plot{}", self.metric),
        }
    }
}

impl fmt::Display for ChartUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.job_id {
            Some(job) => write!(f, "{} (job {})", self.metric, job),
            None => write!(f, "{}", self.metric),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_wire_names_round_trip() {
        for metric in MetricType::ALL {
            assert_eq!(MetricType::from_wire(metric.as_str()), Some(metric));
        }
        assert_eq!(MetricType::from_wire("bogus"), None);
    }

    #[test]
    fn test_metric_units() {
        assert_eq!(MetricType::Bandwidth.unit(), "MB/s");
        assert_eq!(MetricType::Iops.unit(), "iops");
        assert_eq!(MetricType::Latency.unit(), "ms");
        assert_eq!(MetricType::CompletionLatency.unit(), "ms");
    }

    #[test]
    fn test_metric_deserialize_rejects_unknown() {
        let ok: MetricType = serde_json::from_str("\"clat\"").unwrap();
        assert_eq!(ok, MetricType::CompletionLatency);
        assert!(serde_json::from_str::<MetricType>("\"p99\"").is_err());
    }

    #[test]
    fn test_full_view_sentinel_resolves_to_rmax() {
        assert!(TimeWindow::FULL_VIEW.is_full_view());
        assert_eq!(TimeWindow::FULL_VIEW.resolve(60_000), TimeWindow::new(0, 60_000));
        assert_eq!(
            TimeWindow::new(5_000, 10_000).resolve(60_000),
            TimeWindow::new(5_000, 10_000)
        );
    }

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("detailed".parse::<ViewMode>(), Ok(ViewMode::Detailed));
        assert_eq!("aggregated".parse::<ViewMode>(), Ok(ViewMode::Aggregated));
        assert!("both".parse::<ViewMode>().is_err());
    }

    #[test]
    fn test_element_ids() {
        assert_eq!(ChartUnit::aggregated(MetricType::Iops).element_id(), "plotiops");
        assert_eq!(
            ChartUnit::detailed(MetricType::Latency, "3").element_id(),
            "plotlat-job3"
        );
    }
}
