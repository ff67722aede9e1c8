//! Concurrent text download with per-task failure isolation

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use plenary_speech_downloader::downloader::asset::{NOT_FOUND_MESSAGE, NO_CONTENT_MESSAGE};
use plenary_speech_downloader::downloader::{AssetDownloader, HttpAssetFetcher};
use plenary_speech_downloader::fetcher::{RetryPolicy, RetryingClient};
use plenary_speech_downloader::DownloadTask;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(text_dir: &TempDir, concurrency: usize) -> AssetDownloader {
    let client = RetryingClient::new(RetryPolicy::new(2, 0.0)).unwrap();
    let fetcher = HttpAssetFetcher::new(client, text_dir.path()).with_timeout(Duration::from_secs(5));
    AssetDownloader::new(Arc::new(fetcher)).with_concurrency(concurrency)
}

#[tokio::test]
async fn test_ten_tasks_three_missing() {
    let server = MockServer::start().await;
    let failing: HashSet<&str> = ["3", "6", "9"].into_iter().collect();

    for i in 0..10 {
        let id = i.to_string();
        let template = if failing.contains(id.as_str()) {
            ResponseTemplate::new(404)
        } else {
            ResponseTemplate::new(200)
                .set_body_string(format!("Discurso {id}\n"))
                .set_delay(Duration::from_millis(20))
        };
        Mock::given(method("GET"))
            .and(path(format!("/texto/{id}")))
            .respond_with(template)
            .expect(1)
            .mount(&server)
            .await;
    }

    let tasks: Vec<DownloadTask> = (0..10)
        .map(|i| DownloadTask::new(i.to_string(), format!("{}/texto/{i}", server.uri())).unwrap())
        .collect();

    let text_dir = TempDir::new().unwrap();
    let results = downloader(&text_dir, 4).download_all(tasks).await;

    assert_eq!(results.len(), 10);
    let ids: HashSet<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), 10);

    for result in &results {
        if failing.contains(result.id.as_str()) {
            assert!(!result.ok);
            assert_eq!(result.status_code, Some(404));
            assert_eq!(result.message, NOT_FOUND_MESSAGE);
            assert!(result.local_path.is_none());
        } else {
            assert!(result.ok, "{} should be saved: {}", result.id, result.message);
            let local = result.local_path.as_ref().unwrap();
            assert!(!local.as_os_str().is_empty());
            let text = std::fs::read_to_string(local).unwrap();
            assert_eq!(text, format!("Discurso {}", result.id));
        }
    }
}

#[tokio::test]
async fn test_empty_and_no_content_are_not_saved() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vazio"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("  \n\t \n".as_bytes().to_vec(), "text/html"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sem-conteudo"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let tasks = vec![
        DownloadTask::new("e", format!("{}/vazio", server.uri())).unwrap(),
        DownloadTask::new("n", format!("{}/sem-conteudo", server.uri())).unwrap(),
    ];

    let text_dir = TempDir::new().unwrap();
    let mut results = downloader(&text_dir, 2).download_all(tasks).await;
    results.sort_by(|a, b| a.id.cmp(&b.id));

    assert!(!results[0].ok);
    assert_eq!(results[0].status_code, Some(200));
    assert!(results[0].message.contains("empty body"));
    assert!(results[0].message.contains("text/html"));

    assert!(!results[1].ok);
    assert_eq!(results[1].status_code, Some(204));
    assert_eq!(results[1].message, NO_CONTENT_MESSAGE);

    assert_eq!(std::fs::read_dir(text_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_exhausted_retries_become_failed_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let tasks = vec![DownloadTask::new("x", format!("{}/texto/x", server.uri())).unwrap()];
    let text_dir = TempDir::new().unwrap();
    let results = downloader(&text_dir, 1).download_all(tasks).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].ok);
    assert_eq!(results[0].status_code, Some(502));
    assert!(results[0].message.contains("retries exhausted"));
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/antigo"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/novo", server.uri())),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/novo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Texto   movido"))
        .mount(&server)
        .await;

    let tasks = vec![DownloadTask::new("r", format!("{}/antigo", server.uri())).unwrap()];
    let text_dir = TempDir::new().unwrap();
    let results = downloader(&text_dir, 1).download_all(tasks).await;

    assert!(results[0].ok);
    let text = std::fs::read_to_string(results[0].local_path.as_ref().unwrap()).unwrap();
    assert_eq!(text, "Texto movido");
}

#[tokio::test]
async fn test_hostile_id_stays_inside_text_dir() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("conteudo"))
        .mount(&server)
        .await;

    let tasks = vec![DownloadTask::new("../../fora", server.uri()).unwrap()];
    let text_dir = TempDir::new().unwrap();
    let results = downloader(&text_dir, 1).download_all(tasks).await;

    let local = results[0].local_path.as_ref().unwrap();
    assert_eq!(local.parent(), Some(text_dir.path()));
    assert_eq!(results[0].id, "../../fora");
}

#[tokio::test]
async fn test_ids_differing_only_in_separators_keep_their_own_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/texto/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("texto A"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/texto/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("texto B"))
        .mount(&server)
        .await;

    let tasks = vec![
        DownloadTask::new("x/1", format!("{}/texto/a", server.uri())).unwrap(),
        DownloadTask::new("x_1", format!("{}/texto/b", server.uri())).unwrap(),
    ];
    let text_dir = TempDir::new().unwrap();
    let mut results = downloader(&text_dir, 2).download_all(tasks).await;
    results.sort_by(|a, b| a.id.cmp(&b.id));

    assert!(results.iter().all(|r| r.ok));
    let slash = results[0].local_path.as_ref().unwrap();
    let underscore = results[1].local_path.as_ref().unwrap();
    assert_eq!(results[0].id, "x/1");
    assert_ne!(slash, underscore);
    assert_eq!(std::fs::read_to_string(slash).unwrap(), "texto A");
    assert_eq!(std::fs::read_to_string(underscore).unwrap(), "texto B");
    assert_eq!(std::fs::read_dir(text_dir.path()).unwrap().count(), 2);
}
