//! Download configuration constants

use std::time::Duration;

/// Maximum number of attempts per GET, first try included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Exponential backoff factor in seconds.
/// The n-th consecutive failure waits `factor * 2^(n-1)` seconds; the first retry is immediate.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.6;

/// Upper bound for a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Status codes worth retrying.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Timeout for listing requests (large JSON bodies).
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(90);

/// Timeout for a single speech text request.
pub const DEFAULT_ASSET_TIMEOUT: Duration = Duration::from_secs(60);

/// TCP connect timeout applied to the shared client.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of concurrent text downloads.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Hard ceiling on concurrent text downloads.
pub const MAX_CONCURRENCY: usize = 32;

/// `Accept` header for listing requests.
pub const LISTING_ACCEPT: &str = "application/json";

/// `Accept` header for text requests.
pub const ASSET_ACCEPT: &str = "text/plain, */*;q=0.1";

/// Whether `status` belongs to [`RETRYABLE_STATUS_CODES`]
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

/// Calculate exponential backoff delay after `consecutive_failures` failures
pub fn calculate_backoff(factor: f64, consecutive_failures: u32, cap: Duration) -> Duration {
    if consecutive_failures <= 1 || factor <= 0.0 || !factor.is_finite() {
        return Duration::ZERO;
    }
    let exponent = (consecutive_failures - 1).min(32) as i32;
    let secs = factor * 2f64.powi(exponent);
    Duration::from_secs_f64(secs.min(cap.as_secs_f64()))
}
