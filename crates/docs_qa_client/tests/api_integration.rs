//! Integration tests for the HTTP API client against a minimal in-process
//! HTTP server (raw tokio sockets, no mocks).

use std::time::{Duration, Instant};

use docs_qa_client::{
    AnswerMode, AnswerRequest, ApiClient, ApiError, ClientConfig, SearchMode, SearchRequest,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// What the server saw.
#[derive(Debug)]
struct Captured {
    method: String,
    path: String,
    head: String,
    body: String,
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

async fn read_request(stream: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending a full request");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            break end;
        }
    };
    let head = String::from_utf8_lossy(&buf[..end]).to_string();
    let want = end + 4 + content_length(&head);
    while buf.len() < want {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[end + 4..]).to_string();
    let mut request_line = head.lines().next().unwrap_or("").split_whitespace();
    Captured {
        method: request_line.next().unwrap_or("").to_string(),
        path: request_line.next().unwrap_or("").to_string(),
        head,
        body,
    }
}

async fn write_response(stream: &mut TcpStream, status: u16, reason: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();
}

/// Serve one request: wait `delay`, then reply with `status` and `body`.
async fn spawn_server(
    status: u16,
    reason: &'static str,
    body: &'static str,
    delay: Duration,
) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut stream).await;
        let _ = tx.send(captured);
        tokio::time::sleep(delay).await;
        write_response(&mut stream, status, reason, body).await;
    });
    (format!("http://127.0.0.1:{port}"), rx)
}

fn client(base_url: &str, timeout: Duration) -> ApiClient {
    ApiClient::new(ClientConfig::new(base_url, timeout))
}

fn free_port() -> u16 {
    let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    l.local_addr().unwrap().port()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_parsed_json() {
    let (url, seen) = spawn_server(200, "OK", r#"{"status":"ok"}"#, Duration::ZERO).await;
    let health = client(&url, Duration::from_secs(5))
        .health()
        .await
        .expect("health should succeed");
    assert_eq!(health.status, "ok");
    assert!(health.is_healthy());

    let req = seen.await.unwrap();
    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/health");
    assert!(
        req.head.to_ascii_lowercase().contains("content-type: application/json"),
        "missing JSON content type: {}",
        req.head
    );
}

#[tokio::test]
async fn answer_posts_query_and_normalizes_sources() {
    let body = r#"{
        "answer": "See [document](docs/test.md)",
        "sources": ["docs/test.md", {"name": "Users", "url": "docs/users.md", "excerpt": "CUser::Add"}],
        "mode": "llm",
        "timings_ms": {"total": 42, "retrieval": 10}
    }"#;
    let (url, seen) = spawn_server(200, "OK", body, Duration::ZERO).await;
    let response = client(&url, Duration::from_secs(5))
        .answer(&AnswerRequest::new("How to get the list of elements?", Some(AnswerMode::Llm)))
        .await
        .expect("answer should succeed");

    assert_eq!(response.mode, AnswerMode::Llm);
    assert_eq!(response.sources.len(), 2);
    assert_eq!(response.sources[0].title, "Source 1");
    assert_eq!(response.sources[0].path, "docs/test.md");
    assert_eq!(response.sources[1].title, "Users");
    assert_eq!(response.sources[1].snippet, "CUser::Add");
    assert_eq!(response.timings_ms.retrieval, Some(10.0));

    let req = seen.await.unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/answer");
    let sent: serde_json::Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(
        sent,
        serde_json::json!({"query": "How to get the list of elements?", "mode": "llm"})
    );
}

#[tokio::test]
async fn search_accepts_bare_result_list() {
    let body = r#"[{"id":"1","title":"Elements","path":"iblock/getlist.md","content":"GetList","score":0.93}]"#;
    let (url, seen) = spawn_server(200, "OK", body, Duration::ZERO).await;
    let results = client(&url, Duration::from_secs(5))
        .search(&SearchRequest::new("GetList"))
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, "iblock/getlist.md");

    let req = seen.await.unwrap();
    assert_eq!(req.path, "/search");
    assert!(req.body.contains(r#""query":"GetList""#), "{}", req.body);
}

#[tokio::test]
async fn history_sends_limit_as_query_parameter() {
    let body = r#"{"items":[
        {"id":"h1","query":"q","mode":"fast","timestamp":1700000000000,
         "sources":["docs/a.md",{"name":"T","url":"u"}]},
        {"id":"h2","query":"r","mode":"llm","timestamp":1700000000001}
    ]}"#;
    let (url, seen) = spawn_server(200, "OK", body, Duration::ZERO).await;
    let history = client(&url, Duration::from_secs(5))
        .history(5)
        .await
        .expect("history should succeed");
    assert_eq!(history.items.len(), 2);
    assert_eq!(history.items[0].query, "q");
    let sources = history.items[0].sources.as_ref().expect("sources");
    assert_eq!(sources[0].title, "Source 1");
    assert_eq!(sources[0].path, "docs/a.md");
    assert_eq!(sources[1].title, "T");
    assert_eq!(sources[1].path, "u");
    assert_eq!(history.items[1].mode, SearchMode::Full);
    assert!(history.items[1].sources.is_none());
    assert_eq!(seen.await.unwrap().path, "/history?limit=5");
}

#[tokio::test]
async fn openapi_is_returned_verbatim() {
    let (url, seen) = spawn_server(200, "OK", r#"{"openapi":"3.1.0","paths":{}}"#, Duration::ZERO).await;
    let spec = client(&url, Duration::from_secs(5)).openapi().await.unwrap();
    assert_eq!(spec["openapi"], "3.1.0");
    assert_eq!(seen.await.unwrap().path, "/openapi.json");
}

#[tokio::test]
async fn non_success_status_fails_with_status_code() {
    for (status, reason, body) in [
        (400, "Bad Request", r#"{"detail":"bad"}"#),
        (404, "Not Found", "not json at all"),
        (500, "Internal Server Error", r#"{}"#),
        (503, "Service Unavailable", ""),
    ] {
        let (url, _seen) = spawn_server(status, reason, body, Duration::ZERO).await;
        let err = client(&url, Duration::from_secs(5))
            .health()
            .await
            .expect_err("non-2xx should fail");
        assert_eq!(err.status(), Some(status));
        let message = err.to_string();
        assert!(message.contains(&status.to_string()), "{message}");
        assert!(message.starts_with(&format!("HTTP {status}")), "{message}");
    }
}

#[tokio::test]
async fn server_reason_phrase_is_reported() {
    let (url, _seen) = spawn_server(500, "Oops", "{}", Duration::ZERO).await;
    let err = client(&url, Duration::from_secs(5))
        .health()
        .await
        .expect_err("non-2xx should fail");
    assert_eq!(err.to_string(), "HTTP 500: Oops");
}

#[tokio::test]
async fn silent_server_times_out_near_deadline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    let err = client(&format!("http://127.0.0.1:{port}"), timeout)
        .health()
        .await
        .expect_err("should time out");
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "expected timeout, got {err}");
    assert_eq!(err.to_string(), "Request timeout");
    assert!(elapsed >= Duration::from_millis(190), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "fired late: {elapsed:?}");
}

#[tokio::test]
async fn timeout_change_applies_to_next_call() {
    let mut api = client("http://127.0.0.1:1", Duration::from_millis(50));

    let (url, _seen) = spawn_server(200, "OK", r#"{"status":"ok"}"#, Duration::from_millis(300)).await;
    api.set_base_url(&url);
    let err = api.health().await.expect_err("50ms is too short");
    assert!(err.is_timeout());

    let (url, _seen) = spawn_server(200, "OK", r#"{"status":"ok"}"#, Duration::from_millis(300)).await;
    api.set_base_url(&url);
    api.set_timeout(Duration::from_secs(5));
    let health = api.health().await.expect("longer timeout should succeed");
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn refused_connection_is_network_error_naming_base_url() {
    let url = format!("http://127.0.0.1:{}", free_port());
    let err = client(&url, Duration::from_secs(5))
        .health()
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, ApiError::Network { .. }), "got {err:?}");
    let message = err.to_string();
    assert!(message.starts_with("Network error"), "{message}");
    assert!(message.contains(&url), "{message}");
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
    let (url, _seen) = spawn_server(200, "OK", "{not json", Duration::ZERO).await;
    let err = client(&url, Duration::from_secs(5))
        .health()
        .await
        .expect_err("body is not JSON");
    assert!(matches!(err, ApiError::Parse(_)), "got {err:?}");
}
