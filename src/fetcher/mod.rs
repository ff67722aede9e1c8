//! Listing retrieval
//!
//! - [`http`] - retrying HTTP GET shared by the listing and text phases
//! - [`envelope`] - locating speech records inside unstable JSON envelopes
//! - [`listing`] - sequential window-by-window listing fetch
//! - [`retry_formatter`] - retry classification and log messages

use crate::window::{DateWindow, WindowError};

pub mod envelope;
pub mod http;
pub mod listing;
pub mod retry_formatter;

pub use http::{HttpResponse, RetryPolicy, RetryingClient};
pub use listing::ListFetcher;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    ClientError(String),

    /// Request could not be built (malformed URL, bad header)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Retry budget exhausted on retryable statuses or network failures
    #[error("retries exhausted after {attempts} attempts for {url}: {last_error}")]
    RetriesExhausted {
        /// Requested URL
        url: String,
        /// Attempts performed
        attempts: u32,
        /// Status of the last response, if one arrived
        last_status: Option<u16>,
        /// Description of the last failure
        last_error: String,
    },

    /// Definitive non-retryable status
    #[error("HTTP status {status} for {url}")]
    UnexpectedStatus {
        /// Requested URL
        url: String,
        /// Status returned
        status: u16,
    },

    /// Requested date range cannot be windowed
    #[error("{0}")]
    InvalidRange(#[from] WindowError),

    /// Response body could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// Listing failure tied to the window that produced it
    #[error("listing failed for window {window}: {source}")]
    WindowFailed {
        /// Window being fetched
        window: DateWindow,
        /// Underlying failure
        #[source]
        source: Box<FetcherError>,
    },
}

impl FetcherError {
    /// Last HTTP status carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RetriesExhausted { last_status, .. } => *last_status,
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::WindowFailed { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Window bounds for listing failures
    pub fn window(&self) -> Option<DateWindow> {
        match self {
            Self::WindowFailed { window, .. } => Some(*window),
            _ => None,
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
