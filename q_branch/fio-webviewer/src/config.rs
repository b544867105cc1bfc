//! Viewer configuration.

use std::time::Duration;

use crate::viewer::data::ViewMode;

/// Viewer configuration.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Root of the results API, without the `/api` suffix.
    pub base_url: String,
    pub mode: ViewMode,
    /// Plot width used when the surface cannot measure one.
    pub pixel_width: u32,
    /// Per-request timeout for the HTTP backend.
    pub request_timeout: Duration,
    /// Results to compare, in display order.
    pub result_ids: Vec<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            mode: ViewMode::Aggregated,
            pixel_width: 800,
            request_timeout: Duration::from_secs(30),
            result_ids: Vec::new(),
        }
    }
}

impl ViewerConfig {
    pub fn with_results<I, S>(mut self, result_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.result_ids = result_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mode(mut self, mode: ViewMode) -> Self {
        self.mode = mode;
        self
    }
}
