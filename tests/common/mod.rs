//! Shared utilities for the gateway integration tests.
//!
//! - a mock upstream (axum on an ephemeral port) that records what it receives
//! - a gateway `Router` wired to an in-memory audit sink
//! - session tokens minted with the test signing secret

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use dashboard_gateway::app::build_router;
use dashboard_gateway::config::Config;
use dashboard_gateway::services::audit::MemoryAuditSink;
use dashboard_gateway::services::auth::{
    JwtSessionValidator, SessionConfigError, SessionResult, SessionValidator,
};
use dashboard_gateway::services::gateway::Gateway;
use dashboard_gateway::state::AppState;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const SECRET: &str = "integration-test-secret";
pub const DASHBOARD_ORIGIN: &str = "https://dash.example.com";
pub const UPSTREAM_TOKEN: &str = "svc-token";

/// What the mock upstream answers with.
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: &'static str,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn text(body: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/plain; version=0.0.4",
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One request as seen by the mock upstream.
#[derive(Clone, Debug)]
pub struct Captured {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Debug)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Captured {
        self.captured
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("upstream received no request")
    }
}

/// Start a mock upstream that answers every request with `reply`.
pub async fn start_upstream(reply: Reply) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let captured = Arc::new(Mutex::new(Vec::new()));

    let app = {
        let hits = hits.clone();
        let captured = captured.clone();
        Router::new().fallback(move |request: Request| {
            let hits = hits.clone();
            let captured = captured.clone();
            let reply = reply.clone();
            async move {
                let (parts, body) = request.into_parts();
                let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
                captured.lock().unwrap().push(Captured {
                    method: parts.method,
                    uri: parts.uri.to_string(),
                    headers: parts.headers,
                    body,
                });
                hits.fetch_add(1, Ordering::SeqCst);

                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }

                let mut response: Response =
                    (reply.status, [(header::CONTENT_TYPE, reply.content_type)], reply.body)
                        .into_response();
                response
                    .headers_mut()
                    .insert(header::SET_COOKIE, "upstream_internal=1".parse().unwrap());
                response
            }
        })
    };

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream {
        addr,
        hits,
        captured,
    }
}

/// Raw TCP upstream that reads one request head, writes `prefix`, then goes
/// silent until the gateway closes the connection.
#[derive(Clone, Debug)]
pub struct StalledUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl StalledUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub async fn start_stalled_upstream(prefix: &'static str) -> StalledUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicBool::new(false));

    let upstream = StalledUpstream {
        addr,
        hits: hits.clone(),
        closed: closed.clone(),
    };

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let hits = hits.clone();
            let closed = closed.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                hits.fetch_add(1, Ordering::SeqCst);

                let _ = socket.write_all(prefix.as_bytes()).await;

                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                closed.store(true, Ordering::SeqCst);
            });
        }
    });

    upstream
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually(within: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// An address nothing listens on (bound once, then released).
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Counts `validate` calls on the wrapped validator.
pub struct CountingValidator {
    inner: JwtSessionValidator,
    calls: AtomicUsize,
}

impl CountingValidator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionValidator for CountingValidator {
    fn validate(&self, headers: &HeaderMap) -> Result<SessionResult, SessionConfigError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.validate(headers)
    }
}

pub struct Harness {
    pub app: Router,
    pub audit: Arc<MemoryAuditSink>,
    pub sessions: Arc<CountingValidator>,
}

/// Gateway pointed at `upstream`. `overrides` replace the defaults; an empty value unsets a key.
pub fn harness(upstream: SocketAddr, overrides: &[(&str, &str)]) -> Harness {
    harness_tuned(upstream, overrides, |_| {})
}

/// Like `harness`, with direct edits to the parsed config (bypasses startup validation).
pub fn harness_tuned(
    upstream: SocketAddr,
    overrides: &[(&str, &str)],
    tune: impl FnOnce(&mut Config),
) -> Harness {
    let mut env: HashMap<String, String> = [
        ("UPSTREAM_BASE_URL", format!("http://{upstream}")),
        ("UPSTREAM_API_TOKEN", UPSTREAM_TOKEN.to_string()),
        ("UPSTREAM_TIMEOUT_MS", "2000".to_string()),
        ("DASHBOARD_ALLOWED_ORIGINS", DASHBOARD_ORIGIN.to_string()),
        ("SESSION_SIGNING_SECRET", SECRET.to_string()),
        ("AUDIT_SINK", "memory".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }

    let mut config = Config::from_lookup(|key| env.get(key).cloned()).expect("test config");
    tune(&mut config);

    let sessions = Arc::new(CountingValidator {
        inner: JwtSessionValidator::from_settings(&config.session),
        calls: AtomicUsize::new(0),
    });
    let audit = Arc::new(MemoryAuditSink::new());
    let gateway = Gateway::new(&config, sessions.clone(), audit.clone());

    Harness {
        app: build_router(AppState::new(Arc::new(gateway)), &config),
        audit,
        sessions,
    }
}

/// HS256 session token valid for ten minutes.
pub fn session_token(subject: &str, scopes: &[&str]) -> String {
    mint(subject, scopes, chrono::Utc::now().timestamp() + 600)
}

pub fn expired_token(subject: &str, scopes: &[&str]) -> String {
    mint(subject, scopes, chrono::Utc::now().timestamp() - 3600)
}

fn mint(subject: &str, scopes: &[&str], exp: i64) -> String {
    let claims = json!({
        "sub": subject,
        "exp": exp,
        "scope": scopes.join(" "),
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn session_cookie(token: &str) -> String {
    format!("theme=dark; dashboard_session={token}")
}

pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, session_cookie(token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(
    uri: &str,
    token: Option<&str>,
    origin: Option<&str>,
    body: &'static str,
) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, session_cookie(token));
    }
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::from(body)).unwrap()
}
