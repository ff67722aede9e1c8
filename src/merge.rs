//! Left join of download outcomes onto the listing table
//!
//! Every listing row appears in the output at least once. A row whose id has
//! no result gets null download fields; an id with several results yields one
//! row per result, as in a relational left join. Ids are compared as trimmed
//! text, so a numeric `4711` in the listing matches the string `"4711"`.

use serde_json::Value;
use std::collections::HashMap;

use crate::reconcile::normalized_cell;
use crate::table::{Record, Table};
use crate::DownloadResult;

/// Path of the saved text
pub const LOCAL_PATH_FIELD: &str = "localPath";

/// Whether the text was saved
pub const OK_FIELD: &str = "ok";

/// Last HTTP status of the text request
pub const STATUS_CODE_FIELD: &str = "statusCode";

/// Outcome description
pub const MESSAGE_FIELD: &str = "message";

/// Columns appended by [`merge_results`], in order
pub const RESULT_FIELDS: [&str; 4] = [LOCAL_PATH_FIELD, OK_FIELD, STATUS_CODE_FIELD, MESSAGE_FIELD];

/// Join `results` onto `primary` by the id stored in `id_column`
pub fn merge_results(primary: &Table, id_column: &str, results: &[DownloadResult]) -> Table {
    let mut by_id: HashMap<&str, Vec<&DownloadResult>> = HashMap::new();
    for result in results {
        by_id.entry(result.id.trim()).or_default().push(result);
    }

    let mut merged = Table::new();

    for row in primary.rows() {
        let id = normalized_cell(row, id_column);
        match by_id.get(id.as_str()) {
            Some(matches) if !id.is_empty() => {
                for result in matches {
                    merged.push(with_result(row, Some(result)));
                }
            }
            _ => merged.push(with_result(row, None)),
        }
    }

    merged
}

fn with_result(row: &Record, result: Option<&DownloadResult>) -> Record {
    let mut record = row.clone();
    let (local_path, ok, status, message) = match result {
        Some(r) => (
            r.local_path
                .as_ref()
                .map(|p| Value::String(p.display().to_string()))
                .unwrap_or(Value::Null),
            Value::Bool(r.ok),
            r.status_code.map(Value::from).unwrap_or(Value::Null),
            Value::String(r.message.clone()),
        ),
        None => (Value::Null, Value::Null, Value::Null, Value::Null),
    };

    record.insert(LOCAL_PATH_FIELD.to_string(), local_path);
    record.insert(OK_FIELD.to_string(), ok);
    record.insert(STATUS_CODE_FIELD.to_string(), status);
    record.insert(MESSAGE_FIELD.to_string(), message);
    record
}
