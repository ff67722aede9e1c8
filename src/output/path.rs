//! File layout of a run
//!
//! ```text
//! {output_dir}/discursos_{start}_{end}_lista.csv   raw listing, written before downloads
//! {output_dir}/discursos_{start}_{end}.csv         merged final table
//! {text_dir}/{percent-encoded id}.txt              one normalized text per saved speech
//! ```

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use super::{OutputError, OutputResult};

/// File name prefix shared by the listing and final tables
pub const TABLE_PREFIX: &str = "discursos";

/// Directory layout for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    output_dir: PathBuf,
    text_dir: PathBuf,
}

impl OutputPaths {
    /// Layout rooted at `output_dir`, texts under `text_dir`
    pub fn new(output_dir: impl Into<PathBuf>, text_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            text_dir: text_dir.into(),
        }
    }

    /// Directory holding the tables
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding the texts
    pub fn text_dir(&self) -> &Path {
        &self.text_dir
    }

    /// Raw listing table for `[start, end]`
    pub fn listing_table(&self, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.output_dir.join(format!(
            "{TABLE_PREFIX}_{}_{}_lista.csv",
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        ))
    }

    /// Merged final table for `[start, end]`
    pub fn final_table(&self, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.output_dir.join(format!(
            "{TABLE_PREFIX}_{}_{}.csv",
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        ))
    }

    /// Create the output and text directories
    pub fn ensure_directories(&self) -> OutputResult<()> {
        for dir in [&self.output_dir, &self.text_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                OutputError::IoError(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

/// `{text_dir}/{sanitized id}.txt`
pub fn text_path(text_dir: &Path, id: &str) -> PathBuf {
    text_dir.join(format!("{}.txt", sanitize_id(id)))
}

/// Make a speech id safe to use as a file name
///
/// The trimmed id is percent-encoded: ASCII alphanumerics and `-_.~` are kept,
/// every other byte becomes `%XX`. Distinct ids map to distinct names and no
/// result contains a path separator.
pub fn sanitize_id(id: &str) -> String {
    urlencoding::encode(id.trim()).into_owned()
}
