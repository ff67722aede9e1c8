//! End-to-end run: listing, reconciliation, text download, merge, output
//!
//! ```text
//! plan_windows ─▶ ListFetcher (sequential) ─▶ listing CSV
//!                        │
//!                        ▼
//!              ColumnReconciler ─▶ AssetDownloader (bounded pool)
//!                        │                 │
//!                        ▼                 ▼
//!                     merge_results ◀── DownloadResults ─▶ final CSV
//! ```
//!
//! Listing failures and column resolution failures abort the run before any
//! text is requested. Per-text failures only show up as `ok = false` rows.

use chrono::NaiveDate;
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::downloader::config::{
    DEFAULT_ASSET_TIMEOUT, DEFAULT_CONCURRENCY, DEFAULT_LISTING_TIMEOUT, MAX_CONCURRENCY,
};
use crate::downloader::{AssetDownloader, HttpAssetFetcher};
use crate::fetcher::listing::{DEFAULT_BASE_URL, WINDOW_END_FIELD, WINDOW_START_FIELD};
use crate::fetcher::{FetcherError, ListFetcher, RetryPolicy, RetryingClient};
use crate::merge::{merge_results, RESULT_FIELDS};
use crate::output::{write_table, OutputError, OutputPaths};
use crate::reconcile::{ColumnReconciler, ColumnResolutionError, LogicalField};
use crate::table::Table;
use crate::window::{plan_windows, WindowError, DEFAULT_MAX_DAYS_PER_WINDOW};
use crate::DownloadResult;

/// Default directory for the tables
pub const DEFAULT_OUTPUT_DIR: &str = "_data";

/// Default directory for the texts
pub const DEFAULT_TEXT_DIR: &str = "_data/textos";

/// Fatal run errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Date range cannot be windowed
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Listing phase failed
    #[error(transparent)]
    Fetch(#[from] FetcherError),

    /// Required column missing from the listing
    #[error(transparent)]
    Columns(#[from] ColumnResolutionError),

    /// Output could not be written
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Settings for one run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// API root
    pub base_url: String,
    /// First day requested
    pub start: NaiveDate,
    /// Last day requested
    pub end: NaiveDate,
    /// Maximum window length
    pub max_days_per_window: u32,
    /// Simultaneous text downloads
    pub concurrency: usize,
    /// Timeout per listing request
    pub listing_timeout: Duration,
    /// Timeout per text request
    pub asset_timeout: Duration,
    /// Retry budget shared by both phases
    pub retry: RetryPolicy,
    /// Pause between listing windows
    pub window_delay: Duration,
    /// Directory for the tables
    pub output_dir: PathBuf,
    /// Directory for the texts
    pub text_dir: PathBuf,
    /// Id field to resolve
    pub id_field: LogicalField,
    /// Text URL field to resolve
    pub url_field: LogicalField,
}

impl PipelineConfig {
    /// Defaults for `[start, end]`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            start,
            end,
            max_days_per_window: DEFAULT_MAX_DAYS_PER_WINDOW,
            concurrency: DEFAULT_CONCURRENCY,
            listing_timeout: DEFAULT_LISTING_TIMEOUT,
            asset_timeout: DEFAULT_ASSET_TIMEOUT,
            retry: RetryPolicy::default(),
            window_delay: Duration::ZERO,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            text_dir: PathBuf::from(DEFAULT_TEXT_DIR),
            id_field: LogicalField::speech_id(),
            url_field: LogicalField::speech_text_url(),
        }
    }

    /// Set the API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the maximum window length
    pub fn with_max_days_per_window(mut self, days: u32) -> Self {
        self.max_days_per_window = days;
        self
    }

    /// Set download concurrency (clamped to `1..=MAX_CONCURRENCY`)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set both request timeouts
    pub fn with_timeouts(mut self, listing: Duration, asset: Duration) -> Self {
        self.listing_timeout = listing;
        self.asset_timeout = asset;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pause between listing windows
    pub fn with_window_delay(mut self, delay: Duration) -> Self {
        self.window_delay = delay;
        self
    }

    /// Set output and text directories
    pub fn with_output_dirs(
        mut self,
        output_dir: impl Into<PathBuf>,
        text_dir: impl Into<PathBuf>,
    ) -> Self {
        self.output_dir = output_dir.into();
        self.text_dir = text_dir.into();
        self
    }

    /// Output layout for these settings
    pub fn paths(&self) -> OutputPaths {
        OutputPaths::new(&self.output_dir, &self.text_dir)
    }
}

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// First day requested
    pub start: NaiveDate,
    /// Last day requested
    pub end: NaiveDate,
    /// Listing windows fetched
    pub windows: usize,
    /// Listing records
    pub records: usize,
    /// Rows skipped for a missing id or unusable URL
    pub excluded: usize,
    /// Texts attempted
    pub tasks: usize,
    /// Texts saved
    pub assets_ok: usize,
    /// Texts not saved
    pub assets_failed: usize,
    /// Rows in the merged table
    pub merged_rows: usize,
    /// Raw listing table
    pub listing_path: PathBuf,
    /// Merged final table
    pub output_path: PathBuf,
    /// Text directory
    pub text_dir: PathBuf,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

/// Summary plus the in-memory tables of a run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Counters and paths
    pub summary: RunSummary,
    /// Listing table as fetched
    pub listing: Table,
    /// One entry per download task, completion order
    pub results: Vec<DownloadResult>,
    /// Listing joined with the download results
    pub merged: Table,
}

/// A configured run
pub struct Pipeline {
    config: PipelineConfig,
    client: RetryingClient,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    /// Validate `config` and build the shared HTTP client
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        plan_windows(config.start, config.end, config.max_days_per_window)?;
        let client = RetryingClient::new(config.retry)?;
        Ok(Self {
            config,
            client,
            progress: None,
        })
    }

    /// Report text download progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run and return the summary
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        Ok(self.execute().await?.summary)
    }

    /// Run and return summary and tables
    pub async fn execute(&self) -> Result<PipelineOutcome, PipelineError> {
        let started = Instant::now();
        let config = &self.config;
        let paths = config.paths();

        let windows = plan_windows(config.start, config.end, config.max_days_per_window)?;
        paths.ensure_directories()?;

        info!(
            start = %config.start,
            end = %config.end,
            windows = windows.len(),
            "Starting listing phase"
        );

        let listing = ListFetcher::new(&self.client, config.base_url.as_str())
            .with_timeout(config.listing_timeout)
            .with_max_days_per_window(config.max_days_per_window)
            .with_window_delay(config.window_delay)
            .fetch_windows(&windows)
            .await?;

        let listing_path = paths.listing_table(config.start, config.end);
        write_table(&listing_path, &listing)?;

        let (results, merged, excluded, tasks) = if listing.is_empty() {
            info!("Listing is empty, skipping text download");
            let header = [WINDOW_START_FIELD, WINDOW_END_FIELD]
                .into_iter()
                .chain(RESULT_FIELDS);
            (Vec::new(), Table::with_columns(header), 0, 0)
        } else {
            let reconciler =
                ColumnReconciler::new(config.id_field.clone(), config.url_field.clone());
            let reconciled = reconciler.reconcile(&listing)?;
            let tasks = reconciler.tasks(&reconciled);
            let task_count = tasks.len();

            let fetcher = HttpAssetFetcher::new(self.client.clone(), &config.text_dir)
                .with_timeout(config.asset_timeout);
            let mut downloader =
                AssetDownloader::new(Arc::new(fetcher)).with_concurrency(config.concurrency);
            if let Some(pb) = &self.progress {
                downloader = downloader.with_progress(pb.clone());
            }

            let results = downloader.download_all(tasks).await;
            if let Some(pb) = &self.progress {
                pb.finish_and_clear();
            }

            let merged = merge_results(&listing, &reconciled.columns.id_column, &results);
            (results, merged, reconciled.excluded, task_count)
        };

        let output_path = paths.final_table(config.start, config.end);
        write_table(&output_path, &merged)?;

        let assets_ok = results.iter().filter(|r| r.ok).count();
        let summary = RunSummary {
            start: config.start,
            end: config.end,
            windows: windows.len(),
            records: listing.len(),
            excluded,
            tasks,
            assets_ok,
            assets_failed: results.len() - assets_ok,
            merged_rows: merged.len(),
            listing_path,
            output_path,
            text_dir: config.text_dir.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            records = summary.records,
            saved = summary.assets_ok,
            failed = summary.assets_failed,
            "Run complete: {}",
            summary.output_path.display()
        );

        Ok(PipelineOutcome {
            summary,
            listing,
            results,
            merged,
        })
    }
}
