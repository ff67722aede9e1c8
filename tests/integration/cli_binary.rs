//! Binary-level CLI tests

use assert_cmd::Command;

fn bin() -> Command {
    Command::cargo_bin("plenary-speech-downloader").unwrap()
}

#[test]
fn test_windows_human_output() {
    let output = bin()
        .args(["windows", "--start-date", "2019-01-01", "--end-date", "2019-02-15"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("2019-01-01  2019-01-31"));
    assert!(stdout.contains("2019-02-01  2019-02-15"));
    assert!(stdout.contains("plenario/lista/discursos/20190201/20190215.json"));
    assert!(stdout.contains("2 window(s)"));
}

#[test]
fn test_windows_json_output() {
    let output = bin()
        .args([
            "--output-format",
            "json",
            "--window-days",
            "10",
            "windows",
            "--start-date",
            "20190101",
            "--end-date",
            "20190125",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let windows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let windows = windows.as_array().unwrap();
    assert_eq!(windows.len(), 3);
    assert_eq!(windows[2]["start"], "2019-01-21");
    assert_eq!(windows[2]["end"], "2019-01-25");
    assert_eq!(windows[2]["days"], 5);
}

#[test]
fn test_inverted_range_fails() {
    bin()
        .args(["windows", "--start-date", "2019-02-01", "--end-date", "2019-01-01"])
        .assert()
        .failure();
}

#[test]
fn test_bad_date_is_rejected_by_parser() {
    bin()
        .args(["download", "--start-date", "01/02/2019", "--end-date", "2019-01-05"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_concurrency_out_of_range() {
    bin()
        .args([
            "--concurrency",
            "0",
            "windows",
            "--start-date",
            "2019-01-01",
            "--end-date",
            "2019-01-02",
        ])
        .assert()
        .failure();
}
