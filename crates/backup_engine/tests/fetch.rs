use std::time::Duration;

use backup_engine::{FailureKind, FetchSettings, ImageFetcher, ProxyMode, ReqwestImageFetcher};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetcher_returns_bytes_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/png"))
        .mount(&server)
        .await;

    let fetcher = ReqwestImageFetcher::new(FetchSettings::default()).unwrap();
    let image = fetcher
        .fetch_image(&format!("{}/img.png", server.uri()))
        .await
        .expect("fetch ok");

    assert_eq!(image.bytes, vec![1u8, 2, 3]);
    assert_eq!(image.mime_type(), "image/png");
    assert_eq!(image.extension(), "png");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestImageFetcher::new(FetchSettings::default()).unwrap();
    let err = fetcher
        .fetch_image(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn rate_limit_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let fetcher = ReqwestImageFetcher::new(FetchSettings::default()).unwrap();
    let err = fetcher
        .fetch_image(&format!("{}/busy", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(429));
    assert!(err.is_transient());
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_raw(vec![0u8; 4], "image/gif"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestImageFetcher::new(settings).unwrap();
    let err = fetcher
        .fetch_image(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; 11], "image/jpeg"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestImageFetcher::new(settings).unwrap();
    let err = fetcher
        .fetch_image(&format!("{}/large", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn relay_mode_passes_target_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/relay"))
        .and(query_param("url", "https://cdn.test/a.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![9u8], "image/webp"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        proxy: ProxyMode::Relay(format!("{}/relay", server.uri())),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestImageFetcher::new(settings).unwrap();
    let image = fetcher
        .fetch_image("https://cdn.test/a.webp")
        .await
        .expect("relayed fetch");
    assert_eq!(image.extension(), "webp");
}

#[tokio::test]
async fn invalid_url_is_reported() {
    let fetcher = ReqwestImageFetcher::new(FetchSettings::default()).unwrap();
    let err = fetcher.fetch_image("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
