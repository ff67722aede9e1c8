//! Bounded-concurrency text download
//!
//! Tasks are streamed through `buffer_unordered`, so at most `concurrency`
//! downloads are in flight. Each download runs in its own tokio task: an
//! error or a panic inside one is caught at the join point and recorded as a
//! failed [`DownloadResult`] for that task alone.
//!
//! Results come back in completion order. Join them to the listing by id.

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use super::{AssetFetcher, DownloadError};
use crate::metrics::record_asset_outcome;
use crate::{DownloadResult, DownloadTask};

/// Runs [`AssetFetcher::fetch_one`] over many tasks
#[derive(Clone)]
pub struct AssetDownloader {
    fetcher: Arc<dyn AssetFetcher>,
    concurrency: usize,
    progress: Option<ProgressBar>,
}

impl AssetDownloader {
    /// Downloader with the default concurrency
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
            progress: None,
        }
    }

    /// Set the number of simultaneous downloads (clamped to `1..=MAX_CONCURRENCY`)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Advance `progress` once per finished task
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Effective concurrency
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Download every task; returns exactly one result per task
    pub async fn download_all(&self, tasks: Vec<DownloadTask>) -> Vec<DownloadResult> {
        let total = tasks.len();
        info!(
            "Downloading {} texts with concurrency {}",
            total, self.concurrency
        );

        if let Some(pb) = &self.progress {
            pb.set_length(total as u64);
        }

        let results: Vec<DownloadResult> = stream::iter(tasks)
            .map(|task| {
                let fetcher = Arc::clone(&self.fetcher);
                let progress = self.progress.clone();
                async move {
                    let result = run_isolated(fetcher, task).await;
                    record(&result);
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    result
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let saved = results.iter().filter(|r| r.ok).count();
        info!(
            "Text download finished: {} saved, {} failed",
            saved,
            results.len() - saved
        );

        results
    }
}

/// Run one task in its own tokio task and fold every failure into a result
async fn run_isolated(fetcher: Arc<dyn AssetFetcher>, task: DownloadTask) -> DownloadResult {
    let id = task.id.clone();
    let handle = tokio::spawn(async move { fetcher.fetch_one(&task).await });

    let mut result = match handle.await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => DownloadResult::failed(&id, e.status_code(), e.to_string()),
        Err(join_error) => {
            let e = DownloadError::from_join(join_error);
            DownloadResult::failed(&id, None, e.to_string())
        }
    };

    if result.id != id {
        debug!(task_id = %id, result_id = %result.id, "Fetcher returned a foreign id; rekeying");
        result.id = id;
    }
    result
}

fn record(result: &DownloadResult) {
    if result.ok {
        record_asset_outcome("saved");
        return;
    }

    let outcome = match result.status_code {
        Some(404) => "not_found",
        Some(status) if (200..300).contains(&status) => "empty",
        _ => "failed",
    };
    record_asset_outcome(outcome);

    warn!(
        id = %result.id,
        status = ?result.status_code,
        "Text not saved: {}",
        result.message
    );
}
