//! Retry-loop semantics against a scripted provider: attempt budget,
//! exponential backoff, early exit on non-retryable statuses, and the
//! post-loop extraction and parse failure classes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rigspec::config::Config;
use rigspec::server::{self, AppState};

const RETRY_BASE: Duration = Duration::from_millis(5);

fn test_config(base_url: &str) -> Config {
    Config {
        api_key: Some("test-key".to_string()),
        model: "gemini-test".to_string(),
        base_url: base_url.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        retry_base: RETRY_BASE,
    }
}

async fn spawn_app(config: Config) -> String {
    let state = AppState::new(config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        418 => "I'm a Teapot",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

async fn mock_provider(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let idx = counter.fetch_add(1, Ordering::SeqCst);
            let (code, body) = &responses[idx.min(responses.len() - 1)];

            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];
            let mut header_end = None;
            loop {
                let Ok(n) = socket.read(&mut chunk).await else {
                    break;
                };
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if header_end.is_none() {
                    header_end = buf
                        .windows(4)
                        .position(|w| w == b"\r\n\r\n")
                        .map(|p| p + 4);
                }
                if let Some(end) = header_end {
                    let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {} {}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                code,
                reason(*code),
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    (format!("http://{addr}"), calls)
}

fn envelope_with_text(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

async fn post_generate(app: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{app}/api/generate"))
        .json(&serde_json::json!({ "prompt": "budget gaming build" }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn rate_limited_then_success_retries_to_success() {
    let rate_limited = (429, r#"{"error":{"message":"quota exceeded"}}"#.to_string());
    let responses = vec![
        rate_limited.clone(),
        rate_limited.clone(),
        rate_limited.clone(),
        rate_limited,
        (
            200,
            envelope_with_text(r#"[{"componentName":"n","componentDescription":"d"}]"#),
        ),
    ];
    let (provider, calls) = mock_provider(responses).await;
    let app = spawn_app(test_config(&provider)).await;

    let start = Instant::now();
    let response = post_generate(&app).await;
    let elapsed = start.elapsed();

    assert_eq!(response.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    // Backoff before attempts 2..5: 1 + 2 + 4 + 8 = 15 base units.
    assert!(
        elapsed >= RETRY_BASE * 15,
        "expected at least {:?} of backoff, got {elapsed:?}",
        RETRY_BASE * 15
    );
}

#[tokio::test]
async fn server_error_then_success_retries() {
    let responses = vec![
        (503, r#"{"error":{"message":"overloaded"}}"#.to_string()),
        (
            200,
            envelope_with_text(r#"[{"componentName":"n","componentDescription":"d"}]"#),
        ),
    ];
    let (provider, calls) = mock_provider(responses).await;
    let app = spawn_app(test_config(&provider)).await;

    let response = post_generate(&app).await;

    assert_eq!(response.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_budget_surfaces_last_error() {
    let rate_limited = (429, r#"{"error":{"message":"quota exceeded for project"}}"#.to_string());
    // More responses than the budget: the counter proves no sixth call happens.
    let (provider, calls) = mock_provider(vec![rate_limited; 7]).await;
    let app = spawn_app(test_config(&provider)).await;

    let response = post_generate(&app).await;

    assert_eq!(response.status(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], "PROVIDER_TRANSIENT_ERROR");
    assert!(
        body["errorDetails"]
            .as_str()
            .unwrap()
            .contains("quota exceeded for project"),
        "errorDetails should carry the last attempt's message: {body}"
    );
}

#[tokio::test]
async fn auth_failure_does_not_retry() {
    let responses = vec![(403, r#"{"error":{"message":"API key not valid"}}"#.to_string()); 2];
    let (provider, calls) = mock_provider(responses).await;
    let app = spawn_app(test_config(&provider)).await;

    let response = post_generate(&app).await;

    assert_eq!(response.status(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], "PROVIDER_AUTH_ERROR");
    assert!(
        body["errorDetails"].as_str().unwrap().contains("API key not valid"),
        "provider message should be embedded: {body}"
    );
}

#[tokio::test]
async fn provider_bad_request_does_not_retry() {
    let responses = vec![(400, r#"{"error":{"message":"invalid argument"}}"#.to_string()); 2];
    let (provider, calls) = mock_provider(responses).await;
    let app = spawn_app(test_config(&provider)).await;

    let response = post_generate(&app).await;

    assert_eq!(response.status(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], "PROVIDER_AUTH_ERROR");
}

#[tokio::test]
async fn unhandled_status_is_terminal() {
    let responses = vec![(418, r#"{"error":{"message":"short and stout"}}"#.to_string()); 2];
    let (provider, calls) = mock_provider(responses).await;
    let app = spawn_app(test_config(&provider)).await;

    let response = post_generate(&app).await;

    assert_eq!(response.status(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], "PROVIDER_UNHANDLED_STATUS");
}

#[tokio::test]
async fn empty_candidate_parts_reports_finish_reason() {
    let envelope = serde_json::json!({
        "candidates": [{
            "content": { "parts": [] },
            "finishReason": "SAFETY",
            "safetyRatings": [
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "probability": "HIGH" }
            ]
        }]
    })
    .to_string();
    let (provider, calls) = mock_provider(vec![(200, envelope); 2]).await;
    let app = spawn_app(test_config(&provider)).await;

    let response = post_generate(&app).await;

    assert_eq!(response.status(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], "EMPTY_GENERATION");
    assert!(
        body["message"].as_str().unwrap().contains("SAFETY"),
        "message should reference the finish reason: {body}"
    );
    assert!(
        body["errorDetails"]
            .as_str()
            .unwrap()
            .contains("HARM_CATEGORY_DANGEROUS_CONTENT"),
        "safety signal should be surfaced: {body}"
    );
}

#[tokio::test]
async fn invalid_json_text_reports_parse_failure() {
    let (provider, calls) =
        mock_provider(vec![(200, envelope_with_text("{not valid json")); 2]).await;
    let app = spawn_app(test_config(&provider)).await;

    let response = post_generate(&app).await;

    assert_eq!(response.status(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], "OUTPUT_PARSE_ERROR");
}

#[tokio::test]
async fn connection_failure_is_retried_until_budget() {
    // Nothing listening on this port: every attempt fails at the transport
    // level, which is retryable, so the budget must still bound the loop.
    let config = test_config("http://127.0.0.1:9");
    let app = spawn_app(config).await;

    let response = post_generate(&app).await;

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], "PROVIDER_REQUEST_FAILED");
}
