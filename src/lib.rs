//! # Plenary Speech Downloader Library
//!
//! Bulk retrieval of plenary speech metadata from a paginated legislative
//! open-data API, followed by a per-record download of each speech's full text
//! and a reconciliation of both into one flat table.
//!
//! ## Pipeline
//!
//! 1. [`window`] splits the requested date range into bounded windows.
//! 2. [`fetcher::listing::ListFetcher`] requests each window sequentially through
//!    the retrying [`fetcher::http::RetryingClient`] and pulls the speech records out
//!    of whatever envelope the API wraps them in ([`fetcher::envelope`]).
//! 3. [`reconcile`] finds the id and text-URL columns despite schema drift and
//!    builds one [`DownloadTask`] per downloadable record.
//! 4. [`downloader::AssetDownloader`] fetches every text with bounded
//!    concurrency, producing exactly one [`DownloadResult`] per task.
//! 5. [`merge`] left-joins the results back onto the listing by id and
//!    [`output`] writes the final `;`-separated CSV.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use plenary_speech_downloader::pipeline::{Pipeline, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::new(
//!     NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2019, 3, 31).unwrap(),
//! )
//! .with_concurrency(8);
//!
//! let summary = Pipeline::new(config)?.run().await?;
//! println!("{} records, {} texts saved", summary.records, summary.assets_ok);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI command implementations
pub mod cli;

/// Concurrent full-text download
pub mod downloader;

/// Listing retrieval: HTTP client, envelope extraction, window iteration
pub mod fetcher;

/// Left join of download outcomes onto the listing table
pub mod merge;

/// Metrics emission
pub mod metrics;

/// Output writers and asset paths
pub mod output;

/// End-to-end orchestration
pub mod pipeline;

/// Column resolution across schema drift
pub mod reconcile;

/// In-memory tabular model
pub mod table;

/// Date-range windowing
pub mod window;

pub use table::{Record, Table};
pub use window::{plan_windows, DateWindow};

/// URI schemes a text URL must start with to be downloaded
pub const ALLOWED_URL_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Whether `url` starts with one of [`ALLOWED_URL_SCHEMES`] (case-insensitive)
pub fn has_allowed_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ALLOWED_URL_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// One unit of full-text download work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Speech identifier
    pub id: String,
    /// Absolute `http(s)` URL of the text asset
    pub url: String,
}

impl DownloadTask {
    /// Build a task, returning `None` when the URL has no allowed scheme
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        if !has_allowed_scheme(&url) {
            return None;
        }
        Some(Self { id: id.into(), url })
    }
}

/// Outcome of a single [`DownloadTask`]
///
/// Exactly one result exists for every submitted task, whatever happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    /// Speech identifier the task was created for
    pub id: String,
    /// Where the normalized text was written (successful downloads only)
    pub local_path: Option<PathBuf>,
    /// Whether a non-empty text was saved
    pub ok: bool,
    /// Last HTTP status observed, if any response arrived
    pub status_code: Option<u16>,
    /// Human-readable outcome
    pub message: String,
}

impl DownloadResult {
    /// Successful download saved at `local_path`
    pub fn saved(id: impl Into<String>, local_path: PathBuf, status_code: u16) -> Self {
        Self {
            id: id.into(),
            local_path: Some(local_path),
            ok: true,
            status_code: Some(status_code),
            message: "ok".to_string(),
        }
    }

    /// Failed download
    pub fn failed(
        id: impl Into<String>,
        status_code: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            local_path: None,
            ok: false,
            status_code,
            message: message.into(),
        }
    }
}
