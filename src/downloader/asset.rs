//! HTTP text fetcher

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::config::{ASSET_ACCEPT, DEFAULT_ASSET_TIMEOUT};
use super::{AssetFetcher, DownloadError};
use crate::fetcher::http::RetryingClient;
use crate::output::path::text_path;
use crate::{DownloadResult, DownloadTask};

/// Message for a text URL answering 404
pub const NOT_FOUND_MESSAGE: &str = "not found (no full text)";

/// Message for a text URL answering 204
pub const NO_CONTENT_MESSAGE: &str = "no content";

/// Downloads speech texts and stores them as `{text_dir}/{id}.txt`
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: RetryingClient,
    text_dir: PathBuf,
    timeout: Duration,
}

impl HttpAssetFetcher {
    /// Fetcher sharing `client`'s connection pool
    pub fn new(client: RetryingClient, text_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            text_dir: text_dir.into(),
            timeout: DEFAULT_ASSET_TIMEOUT,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch_one(&self, task: &DownloadTask) -> Result<DownloadResult, DownloadError> {
        let response = match self
            .client
            .get_accepting(&task.url, ASSET_ACCEPT, self.timeout)
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(DownloadResult::failed(&task.id, e.status_code(), e.to_string())),
        };

        let status = response.status;
        match status {
            404 => return Ok(DownloadResult::failed(&task.id, Some(404), NOT_FOUND_MESSAGE)),
            204 => return Ok(DownloadResult::failed(&task.id, Some(204), NO_CONTENT_MESSAGE)),
            s if !(200..300).contains(&s) => {
                return Ok(DownloadResult::failed(
                    &task.id,
                    Some(s),
                    format!("HTTP status {s}"),
                ));
            }
            _ => {}
        }

        let text = normalize_text(&response.body);
        if text.is_empty() {
            let content_type = response.content_type.as_deref().unwrap_or("unknown");
            return Ok(DownloadResult::failed(
                &task.id,
                Some(status),
                format!("empty body (content-type: {content_type})"),
            ));
        }

        let path = text_path(&self.text_dir, &task.id);
        tokio::fs::create_dir_all(&self.text_dir)
            .await
            .map_err(|e| {
                DownloadError::IoError(format!("{}: {}", self.text_dir.display(), e))
            })?;
        tokio::fs::write(&path, text.as_bytes())
            .await
            .map_err(|e| DownloadError::IoError(format!("{}: {}", path.display(), e)))?;

        debug!(id = %task.id, path = %path.display(), bytes = text.len(), "Text saved");
        Ok(DownloadResult::saved(&task.id, path, status))
    }
}

/// Normalize whitespace in a downloaded text
///
/// Horizontal whitespace runs collapse to one space and every line is
/// trimmed; runs of blank lines collapse to one; leading and trailing blank
/// lines are removed. A text with no visible characters becomes empty.
///
/// ```
/// use plenary_speech_downloader::downloader::normalize_text;
///
/// assert_eq!(normalize_text("Hello  \n  World"), "Hello\nWorld");
/// assert_eq!(normalize_text(" \r\n\t "), "");
/// ```
pub fn normalize_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        let blank = collapsed.is_empty();
        if blank && previous_blank {
            continue;
        }
        lines.push(collapsed);
        previous_blank = blank;
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}
