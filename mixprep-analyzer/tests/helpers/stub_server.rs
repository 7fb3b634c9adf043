//! Local stub HTTP endpoints
//!
//! A `ScriptedEndpoint` answers every request with the next queued reply
//! (repeating the last one once the queue runs dry) and records what it was
//! asked, so tests can assert on attempt counts, query terms and headers.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One canned response
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub delay: Duration,
    /// Stream the body in this many pieces, without a Content-Length
    pub chunks: Option<usize>,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: value.to_string().into_bytes(),
            delay: Duration::ZERO,
            chunks: None,
        }
    }

    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            delay: Duration::ZERO,
            chunks: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: Vec::new(),
            delay: Duration::ZERO,
            chunks: None,
        }
    }

    pub fn text(body: &str) -> Self {
        Self::bytes(body.as_bytes().to_vec())
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn chunked(mut self, pieces: usize) -> Self {
        self.chunks = Some(pieces.max(1));
        self
    }
}

/// A request seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
}

/// Scripted endpoint state
pub struct ScriptedEndpoint {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedEndpoint {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(Reply::status(404)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// `term` query parameter of every request, in order
    pub fn terms(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| r.query.get("term").cloned())
            .collect()
    }

    fn next_reply(&self) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = replies.pop_front() {
            *last = reply.clone();
            reply
        } else {
            last.clone()
        }
    }
}

async fn scripted(
    State(endpoint): State<Arc<ScriptedEndpoint>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    endpoint.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        query,
        headers,
    });

    let reply = endpoint.next_reply();
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    match reply.chunks {
        Some(pieces) => {
            let size = reply.body.len().div_ceil(pieces).max(1);
            let parts: Vec<Result<Vec<u8>, std::io::Error>> =
                reply.body.chunks(size).map(|c| Ok(c.to_vec())).collect();
            (reply.status, Body::from_stream(futures::stream::iter(parts))).into_response()
        }
        None => (reply.status, reply.body).into_response(),
    }
}

/// Serve `endpoint` on an ephemeral local port; returns the base URL
pub async fn spawn_stub(endpoint: Arc<ScriptedEndpoint>) -> String {
    let app = Router::new().fallback(scripted).with_state(endpoint);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
