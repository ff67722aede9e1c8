//! Envelope-agnostic record extraction
//!
//! The listing API has changed its response wrapper from release to release,
//! so records are located by key name rather than by a fixed path: every
//! object key equal (case-insensitively) to the target whose value is an array
//! contributes that array's elements, in document order.

use serde_json::{Map, Value};

use crate::table::Record;

/// Key holding the speech records in listing responses
pub const SPEECH_RECORD_KEY: &str = "Pronunciamento";

/// Separator joining nested field names when flattening
pub const FIELD_SEPARATOR: &str = ".";

/// Collect the elements of every array stored under `target_key`
///
/// A matched array is consumed whole and not searched again for nested
/// matches. A matching key whose value is not an array is descended into like
/// any other value. Returns an empty vector when nothing matches.
///
/// # Examples
///
/// ```
/// use plenary_speech_downloader::fetcher::envelope::extract_records;
/// use serde_json::json;
///
/// let body = json!({"DiscursosPlenario": {"Pronunciamentos": {"pronunciamento": [{"id": 1}]}}});
/// assert_eq!(extract_records(&body, "Pronunciamento"), vec![json!({"id": 1})]);
/// ```
pub fn extract_records(value: &Value, target_key: &str) -> Vec<Value> {
    let target = target_key.to_lowercase();
    let mut out = Vec::new();
    visit(value, &target, &mut out);
    out
}

fn visit(value: &Value, target: &str, out: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::Array(items) if key.to_lowercase() == target => {
                        out.extend(items.iter().cloned());
                    }
                    _ => visit(child, target, out),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, target, out);
            }
        }
        _ => {}
    }
}

/// Flatten one extracted element into a [`Record`]
///
/// Nested objects become dotted field names (`Orador.Nome`); arrays are kept
/// as a single JSON-encoded string. Returns `None` for non-object elements.
pub fn flatten_record(value: &Value) -> Option<Record> {
    let map = value.as_object()?;
    let mut record = Record::new();
    flatten_into(map, None, &mut record);
    Some(record)
}

fn flatten_into(map: &Map<String, Value>, prefix: Option<&str>, record: &mut Record) {
    for (key, value) in map {
        let name = match prefix {
            Some(prefix) => format!("{prefix}{FIELD_SEPARATOR}{key}"),
            None => key.clone(),
        };

        match value {
            Value::Object(inner) => flatten_into(inner, Some(&name), record),
            Value::Array(_) => {
                record.insert(name, Value::String(value.to_string()));
            }
            scalar => {
                record.insert(name, scalar.clone());
            }
        }
    }
}
