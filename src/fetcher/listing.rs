//! Sequential window-by-window listing fetch
//!
//! Windows are requested one at a time, in planned order, so the provenance
//! tags on every record are deterministic and the upstream API never sees
//! more than one listing request in flight.

use chrono::NaiveDate;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::downloader::config::{DEFAULT_LISTING_TIMEOUT, LISTING_ACCEPT};
use crate::fetcher::envelope::{extract_records, flatten_record, SPEECH_RECORD_KEY};
use crate::fetcher::http::RetryingClient;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics::record_listing_window;
use crate::table::Table;
use crate::window::{plan_windows, DateWindow, DEFAULT_MAX_DAYS_PER_WINDOW};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://legis.senado.leg.br/dadosabertos/";

/// Provenance column: first day of the producing window
pub const WINDOW_START_FIELD: &str = "window_start";

/// Provenance column: last day of the producing window
pub const WINDOW_END_FIELD: &str = "window_end";

/// `{base}/plenario/lista/discursos/{YYYYMMDD}/{YYYYMMDD}.json`
pub fn listing_url(base_url: &str, window: &DateWindow) -> String {
    format!(
        "{}/plenario/lista/discursos/{}/{}.json",
        base_url.trim_end_matches('/'),
        window.start_compact(),
        window.end_compact()
    )
}

/// Builds the primary record table from the listing endpoint
pub struct ListFetcher<'a> {
    client: &'a RetryingClient,
    base_url: String,
    timeout: Duration,
    max_days_per_window: u32,
    window_delay: Duration,
}

impl<'a> ListFetcher<'a> {
    /// Create a fetcher against `base_url` using the shared `client`
    pub fn new(client: &'a RetryingClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout: DEFAULT_LISTING_TIMEOUT,
            max_days_per_window: DEFAULT_MAX_DAYS_PER_WINDOW,
            window_delay: Duration::ZERO,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum window length in days
    pub fn with_max_days_per_window(mut self, days: u32) -> Self {
        self.max_days_per_window = days;
        self
    }

    /// Pause between consecutive windows
    pub fn with_window_delay(mut self, delay: Duration) -> Self {
        self.window_delay = delay;
        self
    }

    /// Listing URL for `window`
    pub fn listing_url(&self, window: &DateWindow) -> String {
        listing_url(&self.base_url, window)
    }

    /// Fetch every window of `[start, end]` and concatenate the records
    ///
    /// # Errors
    /// Fails on an invalid range, or with [`FetcherError::WindowFailed`] on
    /// the first window whose request fails terminally.
    pub async fn fetch_all(&self, start: NaiveDate, end: NaiveDate) -> FetcherResult<Table> {
        let windows = plan_windows(start, end, self.max_days_per_window)?;
        self.fetch_windows(&windows).await
    }

    /// Fetch the given windows in order and concatenate the records
    pub async fn fetch_windows(&self, windows: &[DateWindow]) -> FetcherResult<Table> {
        info!(
            "Fetching listing for {} window(s) of at most {} days",
            windows.len(),
            self.max_days_per_window
        );

        let mut table = Table::new();

        for (index, window) in windows.iter().enumerate() {
            if index > 0 && !self.window_delay.is_zero() {
                tokio::time::sleep(self.window_delay).await;
            }

            let window_table = self.fetch_window(window).await?;

            info!(
                window_start = %window.start,
                window_end = %window.end,
                records = window_table.len(),
                "Window {}/{} fetched",
                index + 1,
                windows.len()
            );

            table.append(window_table);
        }

        info!("Listing complete: {} records", table.len());
        Ok(table)
    }

    /// Fetch a single window and tag its records with the window bounds
    pub async fn fetch_window(&self, window: &DateWindow) -> FetcherResult<Table> {
        self.fetch_window_inner(window)
            .await
            .map_err(|source| FetcherError::WindowFailed {
                window: *window,
                source: Box::new(source),
            })
    }

    async fn fetch_window_inner(&self, window: &DateWindow) -> FetcherResult<Table> {
        let url = self.listing_url(window);
        debug!("Requesting listing: {}", url);

        let response = self
            .client
            .get_accepting(&url, LISTING_ACCEPT, self.timeout)
            .await?;

        if !response.is_success() {
            return Err(FetcherError::UnexpectedStatus {
                url,
                status: response.status,
            });
        }

        let body: Value = response.json()?;
        let elements = extract_records(&body, SPEECH_RECORD_KEY);
        let start = Value::String(window.start.to_string());
        let end = Value::String(window.end.to_string());

        let mut table = Table::new();
        for (position, element) in elements.iter().enumerate() {
            let Some(mut record) = flatten_record(element) else {
                warn!(
                    window = %window,
                    position = position,
                    "Skipping non-object element under '{}'",
                    SPEECH_RECORD_KEY
                );
                continue;
            };
            record.insert(WINDOW_START_FIELD.to_string(), start.clone());
            record.insert(WINDOW_END_FIELD.to_string(), end.clone());
            table.push(record);
        }

        if table.is_empty() {
            debug!("Window {} returned no records", window);
        }
        record_listing_window(table.len());

        Ok(table)
    }
}
