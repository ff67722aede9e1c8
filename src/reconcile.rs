//! Column resolution across schema drift
//!
//! Upstream field names drift between API releases (`CodigoPronunciamento`,
//! `cod_pronunciamento`, ...). A [`LogicalField`] names the canonical column
//! and the spellings it may appear under; [`resolve_column`] maps it onto an
//! actual column with a fixed priority:
//!
//! 1. exact case-insensitive match on a candidate (candidates tried in order)
//! 2. case-insensitive substring match on a candidate, first candidate with
//!    any hit wins; among its hits the shortest column name, then the
//!    lexicographically smallest
//! 3. otherwise [`ColumnResolutionError`], listing every available column

use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::table::{cell_to_string, Record, Table};
use crate::{has_allowed_scheme, DownloadTask};

/// Canonical name of the speech id column
pub const ID_FIELD: &str = "CodigoPronunciamento";

/// Canonical name of the speech text URL column
pub const URL_FIELD: &str = "UrlTexto";

/// A required column was not found
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not resolve column '{target}'; available columns: [{}]", .available.join(", "))]
pub struct ColumnResolutionError {
    /// Canonical name that failed to resolve
    pub target: String,
    /// Every column present in the table
    pub available: Vec<String>,
}

/// Canonical column plus the spellings it may appear under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalField {
    /// Canonical column name
    pub name: String,
    /// Spellings to match, in priority order (canonical name first)
    pub candidates: Vec<String>,
}

impl LogicalField {
    /// Field matched only by its own name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            candidates: vec![name.clone()],
            name,
        }
    }

    /// Add alternative spellings tried after the canonical name
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Speech id field
    pub fn speech_id() -> Self {
        Self::new(ID_FIELD).with_aliases(["Pronunciamento"])
    }

    /// Speech text URL field
    pub fn speech_text_url() -> Self {
        Self::new(URL_FIELD).with_aliases(["Url"])
    }
}

/// Resolve `field` against `columns`
pub fn resolve_column<'c>(
    columns: &'c [String],
    field: &LogicalField,
) -> Result<&'c str, ColumnResolutionError> {
    let lowered: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();

    for candidate in &field.candidates {
        let candidate = candidate.to_lowercase();
        let exact = columns
            .iter()
            .zip(&lowered)
            .filter(|(_, lower)| **lower == candidate)
            .map(|(original, _)| original.as_str())
            .min();
        if let Some(column) = exact {
            return Ok(column);
        }
    }

    for candidate in &field.candidates {
        let candidate = candidate.to_lowercase();
        let best = columns
            .iter()
            .zip(&lowered)
            .filter(|(_, lower)| lower.contains(&candidate))
            .map(|(original, _)| original.as_str())
            .min_by(|a, b| a.chars().count().cmp(&b.chars().count()).then_with(|| a.cmp(b)));
        if let Some(column) = best {
            return Ok(column);
        }
    }

    Err(ColumnResolutionError {
        target: field.name.clone(),
        available: columns.to_vec(),
    })
}

/// Id and URL columns as found in the listing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    /// Actual name of the id column
    pub id_column: String,
    /// Actual name of the URL column
    pub url_column: String,
}

/// Download candidates extracted from the listing table
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Columns the logical fields resolved to
    pub columns: ResolvedColumns,
    /// Rows with canonical `id`/`url` columns, trimmed and stringified
    pub candidates: Table,
    /// Rows excluded for a missing id or a URL without an allowed scheme
    pub excluded: usize,
}

impl Reconciled {
    /// One task per distinct id, taking the URL of its first candidate row
    ///
    /// Listing rows repeating an id all join against that single result.
    pub fn tasks(&self, id_field: &str, url_field: &str) -> Vec<DownloadTask> {
        let mut seen = HashSet::new();
        let tasks: Vec<DownloadTask> = self
            .candidates
            .rows()
            .iter()
            .filter_map(|row| {
                let id = row.get(id_field).map(cell_to_string)?;
                let url = row.get(url_field).map(cell_to_string)?;
                DownloadTask::new(id, url)
            })
            .filter(|task| seen.insert(task.id.clone()))
            .collect();

        let duplicates = self.candidates.len() - tasks.len();
        if duplicates > 0 {
            debug!("Skipped {} candidate rows with an already queued id", duplicates);
        }
        tasks
    }
}

/// Resolves the id and text URL columns of a listing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReconciler {
    id_field: LogicalField,
    url_field: LogicalField,
}

impl Default for ColumnReconciler {
    fn default() -> Self {
        Self::new(LogicalField::speech_id(), LogicalField::speech_text_url())
    }
}

impl ColumnReconciler {
    /// Reconciler for the given id and URL fields
    pub fn new(id_field: LogicalField, url_field: LogicalField) -> Self {
        Self {
            id_field,
            url_field,
        }
    }

    /// Resolve both fields against `columns`
    pub fn resolve(&self, columns: &[String]) -> Result<ResolvedColumns, ColumnResolutionError> {
        let id_column = resolve_column(columns, &self.id_field)?.to_string();
        let url_column = resolve_column(columns, &self.url_field)?.to_string();
        debug!(
            "Resolved columns: {} -> {}, {} -> {}",
            self.id_field.name, id_column, self.url_field.name, url_column
        );
        Ok(ResolvedColumns {
            id_column,
            url_column,
        })
    }

    /// Resolve columns and build the canonical download candidate table
    ///
    /// The input table is left untouched; rows without an id or with a URL
    /// lacking an allowed scheme only drop out of the candidate set.
    pub fn reconcile(&self, table: &Table) -> Result<Reconciled, ColumnResolutionError> {
        let columns = self.resolve(table.columns())?;

        let mut candidates = Table::new();
        let mut excluded = 0;

        for row in table.rows() {
            let id = normalized_cell(row, &columns.id_column);
            let url = normalized_cell(row, &columns.url_column);

            if id.is_empty() || !has_allowed_scheme(&url) {
                excluded += 1;
                continue;
            }

            let mut record = Record::new();
            record.insert(self.id_field.name.clone(), Value::String(id));
            record.insert(self.url_field.name.clone(), Value::String(url));
            candidates.push(record);
        }

        info!(
            "{} of {} records have a downloadable text URL ({} excluded)",
            candidates.len(),
            table.len(),
            excluded
        );

        Ok(Reconciled {
            columns,
            candidates,
            excluded,
        })
    }

    /// Download tasks for a reconciled table
    pub fn tasks(&self, reconciled: &Reconciled) -> Vec<DownloadTask> {
        reconciled.tasks(&self.id_field.name, &self.url_field.name)
    }
}

/// Cell rendered as trimmed text (missing and null read as empty)
pub fn normalized_cell(row: &Record, column: &str) -> String {
    row.get(column)
        .map(cell_to_string)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
