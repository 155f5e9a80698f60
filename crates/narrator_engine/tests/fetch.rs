use std::time::Duration;

use narrator_engine::{FailureKind, FetchSettings, ManifestFetcher, ReqwestManifestFetcher};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_for(server: &MockServer) -> ReqwestManifestFetcher {
    ReqwestManifestFetcher::new(FetchSettings {
        base_url: format!("{}/api", server.uri()),
        ..FetchSettings::default()
    })
}

#[tokio::test]
async fn fetcher_returns_parsed_manifest() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/abc/manifest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "abc",
            "document_id": "deck-1",
            "items": [{"item_id": "s1", "original_content": "Intro", "refined_content": "Hello"}]
        })))
        .mount(&server)
        .await;

    let manifest = fetcher_for(&server)
        .fetch_manifest("abc")
        .await
        .expect("fetch ok");

    assert_eq!(manifest.job_id().as_deref(), Some("abc"));
    assert_eq!(manifest.document_identity().as_deref(), Some("deck-1"));
    assert_eq!(manifest.items().expect("items").len(), 1);
}

#[test]
fn job_id_is_encoded_as_one_segment() {
    let fetcher = ReqwestManifestFetcher::new(FetchSettings {
        base_url: "https://api.example.com/v1/".into(),
        ..FetchSettings::default()
    });
    let url = fetcher.manifest_url("a/b c").expect("url");
    assert_eq!(
        url.as_str(),
        "https://api.example.com/v1/jobs/a%2Fb%20c/manifest"
    );
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/missing/manifest"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetcher_for(&server)
        .fetch_manifest("missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/slow/manifest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"items": []})),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestManifestFetcher::new(FetchSettings {
        base_url: format!("{}/api", server.uri()),
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    });

    let err = fetcher.fetch_manifest("slow").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/big/manifest"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/json")
                .set_body_string(r#"{"items":[]}"#),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestManifestFetcher::new(FetchSettings {
        base_url: format!("{}/api", server.uri()),
        max_bytes: 5,
        ..FetchSettings::default()
    });

    let err = fetcher.fetch_manifest("big").await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 5,
            actual: Some(12)
        }
    );
}

#[tokio::test]
async fn fetcher_rejects_non_json_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/html/manifest"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html/>", "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/broken/manifest"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{nope", "application/json"))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);

    let err = fetcher.fetch_manifest("html").await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "text/html".into()
        }
    );
    let err = fetcher.fetch_manifest("broken").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidManifest);
}

#[tokio::test]
async fn empty_job_id_is_rejected_before_any_request() {
    let fetcher = ReqwestManifestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch_manifest("  ").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
