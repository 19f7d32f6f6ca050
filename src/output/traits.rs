//! Output sink trait and error types
//!
//! This module defines the interface page results are written through while
//! the crawl runs.

use crate::crawler::PageResult;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination of page results during a crawl
///
/// Called from the session loop only, one result at a time.
pub trait PageSink: Send {
    /// Writes one page result
    fn write(&mut self, page: &PageResult) -> OutputResult<()>;

    /// Flushes buffered results
    fn flush(&mut self) -> OutputResult<()>;
}
