//! Retry behavior of the shared HTTP client against a mock server

use std::time::Duration;

use plenary_speech_downloader::fetcher::{FetcherError, RetryPolicy, RetryingClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn client(max_attempts: u32) -> RetryingClient {
    RetryingClient::new(RetryPolicy::new(max_attempts, 0.0)).unwrap()
}

#[tokio::test]
async fn test_two_unavailable_then_success_takes_three_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lista.json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/lista.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok": true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(8)
        .get_accepting(&format!("{}/lista.json", server.uri()), "application/json", TIMEOUT)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.attempts, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_not_found_is_returned_after_one_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/texto/1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(8)
        .get_accepting(&format!("{}/texto/1", server.uri()), "text/plain", TIMEOUT)
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(response.attempts, 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_exhaustion_reports_attempts_and_last_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(3)
        .get_accepting(&format!("{}/lista.json", server.uri()), "application/json", TIMEOUT)
        .await
        .unwrap_err();

    match err {
        FetcherError::RetriesExhausted {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_status, Some(429));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(8)
        .get_accepting(&server.uri(), "application/json", TIMEOUT)
        .await
        .unwrap();
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_accept_header_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("accept", "text/plain, */*;q=0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("texto"))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(1)
        .get_accepting(&server.uri(), "text/plain, */*;q=0.1", TIMEOUT)
        .await
        .unwrap();
    assert_eq!(response.body, "texto");
}

#[tokio::test]
async fn test_connection_refused_exhausts_budget() {
    // Port 9 (discard) is closed on test hosts
    let err = client(2)
        .get_accepting("http://127.0.0.1:9/lista.json", "application/json", TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetcherError::RetriesExhausted {
            attempts: 2,
            last_status: None,
            ..
        }
    ));
}
