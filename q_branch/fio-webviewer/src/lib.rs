//! Interactive time-series charts for fio benchmark results.
//!
//! Given a set of benchmark results, this crate fetches per-metric
//! bandwidth, IOPS and latency series from a results API, re-aggregated on
//! the server so that roughly one point lands on each horizontal pixel, and
//! turns them into chart figures. Zoom gestures narrow or widen the time
//! window and trigger a refetch at a finer or coarser granularity.
//!
//! ## Architecture
//!
//! 1. **Catalog** (`viewer::catalog`) - Loads result metadata and derives the
//!    chart units for the current view mode.
//!
//! 2. **Fetch** (`viewer::orchestrator`, `viewer::granularity`) - Picks a bucket
//!    size and fetches every (result, direction) series of a chart unit.
//!
//! 3. **Render and zoom** (`viewer::renderer`, `viewer::zoom`,
//!    `viewer::session`) - Draws or shows the error panel and reacts to
//!    gestures.
//!
//! ## Usage
//!
//! ```bash
//! fio-plot 12 15 --url http://127.0.0.1:5000 --width 1000
//! fio-plot 12 --mode detailed --window 5 10 --output-dir plots/
//! ```

pub mod config;
pub mod error;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
