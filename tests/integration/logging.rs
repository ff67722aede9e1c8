//! Integration tests for logging and tracing

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use plenary_speech_downloader::fetcher::{RetryPolicy, RetryingClient};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory log sink
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_env_filter_parsing() {
    let _filter1 = EnvFilter::new("info");
    let _filter2 = EnvFilter::new("plenary_speech_downloader=debug");
    let _filter3 = EnvFilter::new("warn,plenary_speech_downloader::fetcher=trace");
}

#[tokio::test]
async fn test_retry_warnings_are_logged() {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("plenary_speech_downloader=debug"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = RetryingClient::new(RetryPolicy::new(3, 0.0)).unwrap();
    client
        .get_accepting(&server.uri(), "application/json", Duration::from_secs(5))
        .await
        .unwrap();

    let logs = buf.contents();
    assert!(logs.contains("WARN"), "missing warning in: {logs}");
    assert!(logs.contains("Retrying (attempt 2/3) after service unavailable"));
    assert!(logs.contains("Retry attempt 2/3 succeeded"));
}

#[tokio::test]
async fn test_json_format_emits_structured_fields() {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("plenary_speech_downloader=debug"))
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = RetryingClient::new(RetryPolicy::new(1, 0.0)).unwrap();
    client
        .get_accepting(&server.uri(), "application/json", Duration::from_secs(5))
        .await
        .unwrap();

    let logs = buf.contents();
    let line = logs
        .lines()
        .find(|l| l.contains("HTTP request completed"))
        .expect("completion line logged");
    let value: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(value["level"], "DEBUG");
    assert_eq!(value["fields"]["status"], 200);
    assert_eq!(value["fields"]["attempt"], 1);
}
