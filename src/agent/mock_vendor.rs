//! An in-process vendor stand-in for adapter tests.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::oneshot};

use crate::agent::transcoder::{CanonicalByteStream, CanonicalEventDecoder};
use crate::agent::types::CanonicalStreamEvent;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct MockReply {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn sse(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/event-stream",
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: "text/plain",
            body: body.to_string(),
        }
    }
}

type Responder = dyn Fn(&RecordedRequest) -> MockReply + Send + Sync;

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Arc<Responder>,
}

/// A vendor bound to an ephemeral local port; answers every request with the responder.
pub struct MockVendor {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockVendor {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockReply + Send + Sync + 'static,
    {
        crate::logger::setup_test_logger();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            requests: requests.clone(),
            responder: Arc::new(responder),
        };
        let app = Router::new().fallback(handle).with_state(state);

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
            shutdown: Some(tx),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    let reply = (state.responder)(&recorded);
    state.requests.lock().push(recorded);

    Response::builder()
        .status(reply.status)
        .header(header::CONTENT_TYPE, reply.content_type)
        .body(Body::from(reply.body))
        .unwrap()
}

/// Reads a canonical SSE stream to its end, as a chat client would.
pub async fn read_canonical(mut stream: CanonicalByteStream) -> Vec<CanonicalStreamEvent> {
    let mut decoder = CanonicalEventDecoder::new();
    let mut events = Vec::new();
    while let Some(chunk) = stream.next().await {
        events.extend(decoder.push(&chunk.unwrap()));
    }
    events.extend(decoder.finish());
    events
}

/// Concatenated delta text of a canonical sequence.
pub fn delta_text(events: &[CanonicalStreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            CanonicalStreamEvent::Delta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
