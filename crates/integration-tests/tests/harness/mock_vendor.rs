//! Scriptable mock vendor server for integration tests
//!
//! Each path is given a canned reply; every request is recorded so tests can
//! assert on the wire shape the adapter produced.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

/// Canned reply for one path
#[derive(Debug, Clone)]
pub enum Reply {
    /// `text/event-stream` body, one `data:` event per payload
    Sse(Vec<String>),
    /// Like `Sse`, but the connection stays open after the last event
    SseThenHang(Vec<String>),
    /// Newline-delimited JSON body
    Lines(Vec<String>),
    /// Plain JSON body with a status
    Json(StatusCode, serde_json::Value),
    /// Raw text body with a status
    Text(StatusCode, String),
    /// One reply per successive request to the path; the last one repeats
    Sequence(Vec<Reply>),
}

impl Reply {
    /// SSE reply from JSON values
    pub fn sse(events: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Self::Sse(events.into_iter().map(|e| e.to_string()).collect())
    }
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

struct MockState {
    routes: HashMap<String, Reply>,
    requests: Mutex<Vec<Recorded>>,
}

/// Mock vendor API bound to an ephemeral port
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockVendor {
    /// Start a server answering each `(path, reply)` pair
    pub async fn start(routes: impl IntoIterator<Item = (&'static str, Reply)>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            routes: routes.into_iter().map(|(path, reply)| (path.to_owned(), reply)).collect(),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Server root, e.g. `http://127.0.0.1:4321`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Server root plus a path prefix such as `/v1`
    pub fn url_with(&self, prefix: &str) -> String {
        format!("http://{}{prefix}", self.addr)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The single request received, panicking otherwise
    pub fn only_request(&self) -> Recorded {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request, got {requests:?}");
        requests.into_iter().next().unwrap()
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    state.requests.lock().unwrap().push(Recorded {
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });

    let Some(reply) = state.routes.get(uri.path()).cloned() else {
        return (StatusCode::NOT_FOUND, format!("no route for {}", uri.path())).into_response();
    };
    let reply = match reply {
        Reply::Sequence(replies) if replies.is_empty() => {
            return (StatusCode::NOT_FOUND, "empty reply sequence").into_response();
        }
        Reply::Sequence(mut replies) => {
            let served = state
                .requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.path == uri.path())
                .count();
            let index = served.saturating_sub(1).min(replies.len() - 1);
            replies.swap_remove(index)
        }
        other => other,
    };

    match reply {
        Reply::Sse(events) => event_stream(events, false),
        Reply::SseThenHang(events) => event_stream(events, true),
        Reply::Lines(lines) => {
            let mut body = lines.join("\n");
            body.push('\n');
            ([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response()
        }
        Reply::Json(status, value) => (status, axum::Json(value)).into_response(),
        Reply::Text(status, text) => (status, text).into_response(),
        Reply::Sequence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "nested sequence").into_response(),
    }
}

fn event_stream(events: Vec<String>, hang: bool) -> Response {
    let frames = stream::iter(
        events
            .into_iter()
            .map(|data| Ok::<_, Infallible>(Bytes::from(format!("data: {data}\n\n")))),
    );
    let body = if hang {
        Body::from_stream(frames.chain(stream::pending()))
    } else {
        Body::from_stream(frames)
    };

    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}
