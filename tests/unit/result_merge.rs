//! Joining download results onto the listing

use std::path::PathBuf;

use plenary_speech_downloader::merge::{merge_results, RESULT_FIELDS};
use plenary_speech_downloader::{DownloadResult, Record, Table};
use serde_json::json;

fn listing(ids: &[&str]) -> Table {
    Table::from_records(ids.iter().map(|id| {
        let mut record = Record::new();
        record.insert("CodigoPronunciamento".to_string(), json!(id));
        record
    }))
}

#[test]
fn test_five_primary_three_secondary() {
    let primary = listing(&["p1", "p2", "p3", "p4", "p5"]);
    let secondary = vec![
        DownloadResult::saved("p4", PathBuf::from("t/p4.txt"), 200),
        DownloadResult::failed("p1", Some(404), "not found (no full text)"),
        DownloadResult::saved("p2", PathBuf::from("t/p2.txt"), 200),
    ];

    let merged = merge_results(&primary, "CodigoPronunciamento", &secondary);
    assert_eq!(merged.len(), 5);

    let nulls: Vec<String> = merged
        .rows()
        .iter()
        .filter(|r| RESULT_FIELDS.iter().all(|f| r[*f].is_null()))
        .map(|r| r["CodigoPronunciamento"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(nulls, vec!["p3", "p5"]);
}

#[test]
fn test_results_without_listing_row_are_dropped() {
    let primary = listing(&["p1"]);
    let secondary = vec![DownloadResult::saved("zz", PathBuf::from("t/zz.txt"), 200)];

    let merged = merge_results(&primary, "CodigoPronunciamento", &secondary);
    assert_eq!(merged.len(), 1);
    assert!(merged.rows()[0]["ok"].is_null());
}
