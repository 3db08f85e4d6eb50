use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::*;
use crate::config::ApiTimeouts;
use crate::error::ErrorCode;
use crate::retry::RetryPolicy;

/// A request as seen by the canned server.
#[derive(Debug, Clone)]
struct Seen {
    request_line: String,
    body: String,
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Serve one canned `(status, body)` per connection, in order.
async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0_u8; 4096];
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = find_head_end(&buf) {
                    break end;
                }
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
            let wanted = head_end + content_length(&head);
            while buf.len() < wanted {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }
            log.lock().unwrap().push(Seen {
                request_line: head.lines().next().unwrap_or_default().to_owned(),
                body: String::from_utf8_lossy(&buf[head_end..]).into_owned(),
            });
            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    });
    (format!("http://{addr}"), seen)
}

fn client_for(base_url: String, attempts: usize) -> ApiClient {
    ApiClient::new(ApiConfig {
        base_url,
        timeouts: ApiTimeouts { request_secs: 1, connect_secs: 1 },
        retry: RetryPolicy { attempts, base_ms: 1 },
        debounce_ms: 10,
    })
    .unwrap()
}

#[tokio::test]
async fn validate_posts_snapshot_and_parses_report() {
    let id = uuid::Uuid::new_v4();
    let body = json!({ "errors": { id.to_string(): ["no subnet"] }, "warnings": {} }).to_string();
    let (url, seen) = serve(vec![(200, body)]).await;
    let client = client_for(url, 1);

    let report = client.validate(&GraphSnapshot::default()).await.unwrap();
    assert_eq!(report.errors[&id], ["no subnet"]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].request_line, "POST /api/v1/graph/validate HTTP/1.1");
    let sent: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(sent, json!({ "domains": [], "resources": [], "connections": [] }));
}

#[tokio::test]
async fn unavailable_is_retried_then_succeeds() {
    let (url, seen) = serve(vec![(503, "busy".into()), (200, "[]".into())]).await;
    let client = client_for(url, 3);
    let services = client.services().await.unwrap();
    assert!(services.is_empty());
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].request_line, "GET /api/v1/registry/services HTTP/1.1");
}

#[tokio::test]
async fn rejection_is_returned_without_retry() {
    let detail = json!({ "detail": "Resource type aws_nope not found" }).to_string();
    let (url, seen) = serve(vec![(404, detail)]).await;
    let client = client_for(url, 3);
    let err = client.resource_schema("aws_nope").await.unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("aws_nope"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(seen.lock().unwrap()[0].request_line, "GET /api/v1/registry/schema/aws_nope HTTP/1.1");
}

#[tokio::test]
async fn export_returns_raw_bytes() {
    let (url, seen) = serve(vec![(200, "PK-archive".into())]).await;
    let client = client_for(url, 1);
    let bytes = client.export_archive(&GraphSnapshot::default()).await.unwrap();
    assert_eq!(bytes, b"PK-archive");
    let sent: serde_json::Value = serde_json::from_str(&seen.lock().unwrap()[0].body).unwrap();
    assert_eq!(sent["format"], json!("zip"));
}

#[tokio::test]
async fn garbage_body_is_parse_error() {
    let (url, _) = serve(vec![(200, "<html>".into())]).await;
    let client = client_for(url, 3);
    let err = client.generate_terraform(&GraphSnapshot::default()).await.unwrap_err();
    assert_eq!(err.error_code(), "E_PARSE");
}

#[tokio::test]
async fn refused_connection_is_retryable_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = client_for(format!("http://{addr}"), 2);
    let err = client.services().await.unwrap_err();
    assert!(err.retryable(), "{err:?}");
    assert_eq!(err.error_code(), "E_CONNECT");
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    let client = client_for(format!("http://{addr}"), 1);
    let err = client.services().await.unwrap_err();
    assert_eq!(err.error_code(), "E_TIMEOUT");
}

#[test]
fn new_rejects_bad_config() {
    let config = ApiConfig { base_url: "ftp://nope".into(), ..ApiConfig::default() };
    assert!(matches!(ApiClient::new(config), Err(ApiError::Config(_))));
}
