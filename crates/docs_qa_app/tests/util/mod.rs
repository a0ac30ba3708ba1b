//! Shared test helpers: a minimal in-process HTTP/1.1 server that routes each
//! request through a closure. No mocks; real sockets.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl Captured {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// What to send back.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub reason: &'static str,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn error(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            body: r#"{"detail":"error"}"#.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub type Handler = Arc<dyn Fn(&Captured) -> Reply + Send + Sync>;
pub type Seen = Arc<Mutex<Vec<Captured>>>;

pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Captured) -> Reply + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The answer body used by the end-to-end scenario.
pub const LINKED_ANSWER: &str = r#"{
    "answer": "Answer with a link to the [document](docs/test.md).",
    "sources": ["docs/test.md"],
    "mode": "llm",
    "timings_ms": {"total_ms": 123}
}"#;

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

async fn read_request(stream: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            break end;
        }
    };
    let head = String::from_utf8_lossy(&buf[..end]).to_string();
    let want = end + 4 + content_length(&head);
    while buf.len() < want {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let mut request_line = head.lines().next().unwrap_or("").split_whitespace();
    Some(Captured {
        method: request_line.next().unwrap_or("").to_string(),
        path: request_line.next().unwrap_or("").to_string(),
        body: String::from_utf8_lossy(&buf[end + 4..]).to_string(),
    })
}

async fn handle(mut stream: TcpStream, handler: Handler, seen: Seen) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    let reply = handler(&request);
    seen.lock().unwrap().push(request);
    tokio::time::sleep(reply.delay).await;
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reply.reason,
        reply.body.len(),
        reply.body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
}

async fn accept_loop(listener: TcpListener, handler: Handler, seen: Seen) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(handle(stream, Arc::clone(&handler), Arc::clone(&seen)));
    }
}

/// Serve on the current runtime. Returns the base URL and the request log.
pub async fn serve(handler: Handler) -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let seen: Seen = Arc::default();
    tokio::spawn(accept_loop(listener, handler, Arc::clone(&seen)));
    (format!("http://127.0.0.1:{port}"), seen)
}

/// Serve from a dedicated thread with its own runtime, for tests that run
/// the binary and so have no runtime of their own.
pub fn serve_in_thread(handler: Handler) -> (String, Seen) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let port = std_listener.local_addr().unwrap().port();
    let seen: Seen = Arc::default();
    let seen_clone = Arc::clone(&seen);
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = TcpListener::from_std(std_listener).unwrap();
            accept_loop(listener, handler, seen_clone).await;
        });
    });
    (format!("http://127.0.0.1:{port}"), seen)
}

/// Pick a free port by binding to :0 and extracting the assigned port.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
