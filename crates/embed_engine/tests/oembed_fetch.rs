use std::time::Duration;

use embed_engine::{FailureKind, OEmbedFetcher, OEmbedSettings, ReqwestOEmbedFetcher};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POST_URL: &str = "https://www.instagram.com/p/CxYz123/";

fn settings_for(server: &MockServer) -> OEmbedSettings {
    OEmbedSettings {
        endpoint: format!("{}/instagram_oembed", server.uri()),
        access_token: Some("app|token".to_string()),
        ..OEmbedSettings::default()
    }
}

#[tokio::test]
async fn fetch_returns_embed_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instagram_oembed"))
        .and(query_param("url", POST_URL))
        .and(query_param("access_token", "app|token"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"version":"1.0","html":"<blockquote class=\"instagram-media\"></blockquote><script async src=\"//www.instagram.com/embed.js\"></script>","author_name":"someone","provider_name":"Instagram"}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ReqwestOEmbedFetcher::new(settings_for(&server));
    let doc = fetcher.fetch(POST_URL).await.expect("fetch ok");

    assert!(doc.html.starts_with("<blockquote class=\"instagram-media\">"));
    assert!(doc.html.contains("embed.js"));
    assert_eq!(doc.author_name.as_deref(), Some("someone"));
    assert_eq!(doc.provider_name.as_deref(), Some("Instagram"));
}

#[tokio::test]
async fn fetch_without_token_sends_only_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instagram_oembed"))
        .and(query_param("url", POST_URL))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"html":"<p>ok</p>"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestOEmbedFetcher::new(OEmbedSettings {
        access_token: None,
        ..settings_for(&server)
    });
    let doc = fetcher.fetch(POST_URL).await.expect("fetch ok");
    assert_eq!(doc.html, "<p>ok</p>");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0]
        .url
        .query_pairs()
        .any(|(key, _)| key == "access_token"));
}

#[tokio::test]
async fn fetch_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instagram_oembed"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestOEmbedFetcher::new(settings_for(&server));
    let err = fetcher.fetch(POST_URL).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetch_rejects_response_without_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instagram_oembed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"version":"1.0","type":"rich"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestOEmbedFetcher::new(settings_for(&server));
    let err = fetcher.fetch(POST_URL).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::MalformedResponse);
}

#[tokio::test]
async fn fetch_enforces_size_limit() {
    let server = MockServer::start().await;
    let body = format!(r#"{{"html":"{}"}}"#, "x".repeat(4096));
    Mock::given(method("GET"))
        .and(path("/instagram_oembed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let fetcher = ReqwestOEmbedFetcher::new(OEmbedSettings {
        max_bytes: 1024,
        ..settings_for(&server)
    });
    let err = fetcher.fetch(POST_URL).await.unwrap_err();
    assert!(matches!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 1024,
            ..
        }
    ));
}

#[tokio::test]
async fn fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instagram_oembed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"html":"<p>late</p>"}"#, "application/json")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestOEmbedFetcher::new(OEmbedSettings {
        request_timeout: Duration::from_millis(50),
        ..settings_for(&server)
    });
    let err = fetcher.fetch(POST_URL).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn unparseable_endpoint_is_invalid_url() {
    let fetcher = ReqwestOEmbedFetcher::new(OEmbedSettings {
        endpoint: "not a url".to_string(),
        ..OEmbedSettings::default()
    });
    let err = fetcher.fetch(POST_URL).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
