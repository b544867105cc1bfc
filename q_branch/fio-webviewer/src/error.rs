//! Viewer errors.
//!
//! None of these is fatal to a session: chart-unit errors end up as an
//! error panel for that unit, rename errors as an inline message.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViewerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no bucket size below 3600s fits {span_ms}ms into {pixel_width}px")]
    GranularityUnresolvable { pixel_width: u32, span_ms: f64 },

    #[error("rename rejected, backend responded with {status}")]
    RenameRejected { status: u16, body: String },

    #[error("result name must not be empty")]
    EmptyName,

    #[error("request failed: {0}")]
    Network(String),

    #[error("backend reported error: {0}")]
    Backend(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("catalog has no results, the time bound is undefined")]
    EmptyCatalog,
}

pub type Result<T> = std::result::Result<T, ViewerError>;
