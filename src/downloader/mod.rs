//! Concurrent speech text download
//!
//! Every [`DownloadTask`](crate::DownloadTask) produced by column
//! reconciliation is handed to an [`AssetFetcher`]; the [`AssetDownloader`]
//! runs them through a bounded worker pool and guarantees exactly one
//! [`DownloadResult`](crate::DownloadResult) per task.
//!
//! # Components
//!
//! - [`executor`] - bounded-concurrency dispatcher with per-task failure isolation
//! - [`asset`] - HTTP text fetcher: status classification, whitespace normalization, persistence
//! - [`config`] - defaults for retry, timeouts and concurrency
//!
//! # Error Handling
//!
//! Expected outcomes (404, 204, empty body, exhausted retries) are reported as
//! `ok = false` results by the fetcher itself. Anything else a task raises,
//! including a panic, is converted into a failed result at the task boundary
//! and never reaches sibling tasks.

use async_trait::async_trait;

use crate::fetcher::FetcherError;
use crate::{DownloadResult, DownloadTask};

pub mod asset;
pub mod config;
pub mod executor;

pub use asset::{normalize_text, HttpAssetFetcher};
pub use executor::AssetDownloader;

/// Per-task download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Request failed at the HTTP layer
    #[error("request error: {0}")]
    RequestError(#[from] FetcherError),

    /// Text could not be written
    #[error("IO error: {0}")]
    IoError(String),

    /// Task panicked
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// Task was cancelled by the runtime
    #[error("task cancelled")]
    TaskCancelled,
}

impl DownloadError {
    /// HTTP status associated with the failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RequestError(e) => e.status_code(),
            _ => None,
        }
    }

    /// Convert a join failure of a spawned task
    pub fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            return Self::TaskCancelled;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::TaskPanicked(message)
    }
}

/// Fetches the text for one task
///
/// Implementations return `Ok` with `ok = false` for expected negative
/// outcomes and reserve `Err` for unexpected failures.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download and persist the text behind `task.url`
    async fn fetch_one(&self, task: &DownloadTask) -> Result<DownloadResult, DownloadError>;
}
