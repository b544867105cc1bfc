//! Chart pipeline for fio result time series.
//!
//! # Architecture
//!
//! - `data` - Core types (metrics, windows, series, chart units)
//! - `granularity` - Bucket size for a pixel width and time span
//! - `backend` - Results API seam with HTTP and in-memory implementations
//! - `catalog` - Results and jobs loaded at session start
//! - `orchestrator` - Concurrent per-unit fetch with deterministic merge
//! - `renderer` - Draw decision and the charting surface boundary
//! - `zoom` - View window state machine
//! - `session` - Gesture handling and draw cycles

pub mod backend;
pub mod catalog;
pub mod data;
pub mod granularity;
pub mod orchestrator;
pub mod renderer;
pub mod session;
pub mod zoom;

pub use backend::{Backend, HttpBackend, MockBackend};
pub use catalog::ResultCatalog;
pub use orchestrator::{ChartData, FetchOrchestrator};
pub use renderer::{ChartSurface, Figure, PlotRenderer, PlotState, RecordingSurface};
pub use session::{CycleReport, GestureEvent, RenameOutcome, UnitOutcome, ViewerSession};
pub use zoom::ZoomController;
