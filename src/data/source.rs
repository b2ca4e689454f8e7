//! The upstream contract: a single fallible fetch

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching a record from upstream
///
/// The cache treats every variant the same way; the variants exist so the
/// final error message can say what actually went wrong.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The resource does not exist
    #[error("Upstream resource not found: {0}")]
    NotFound(String),

    /// Reading the resource failed
    #[error("Upstream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The resource was read but is not a usable record
    #[error("Malformed upstream data: {0}")]
    Malformed(String),

    /// The fetch did not finish in time
    #[error("Upstream fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Produces a fresh, fully-populated record or fails
///
/// Implementations must surface failures instead of returning partial data.
pub trait UpstreamSource: Send + Sync + 'static {
    /// The record type this source yields
    type Record;

    /// Fetches the current record
    fn fetch(&self) -> impl Future<Output = Result<Self::Record, SourceError>> + Send;
}
