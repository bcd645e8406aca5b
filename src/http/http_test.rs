//! Route tests through a real listener, with a scripted adapter behind it.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::oneshot};

use super::errors::FALLBACK_MESSAGE;
use super::serve;
use crate::agent::transcoder::{transcode, CanonicalByteStream, CanonicalEventDecoder, EnterpriseTranscoder};
use crate::agent::types::{CanonicalStreamEvent, ChatTurnRequest, ChatTurnResult, HealthResult};
use crate::agent::{AgentError, AgentResult, ProviderAdapter};

const VENDOR_STREAM: &[u8] = concat!(
    "data: {\"type\":\"response.created\",\"response\":{\"id\":\"r1\"}}\n\n",
    "data: {\"type\":\"response.output_text.delta\",\"delta\":\"pong\"}\n\n",
    "data: {\"type\":\"response.completed\",\"response\":{\"id\":\"r1\",\"status\":\"completed\"}}\n\n",
)
.as_bytes();

#[derive(Default)]
struct ScriptedAdapter {
    failure: Option<AgentError>,
    panic_on_health: bool,
    calls: Mutex<Vec<(String, ChatTurnRequest)>>,
}

impl ScriptedAdapter {
    fn record(&self, operation: &str, request: &ChatTurnRequest) -> AgentResult<()> {
        self.calls.lock().push((operation.to_string(), request.clone()));
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<(String, ChatTurnRequest)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn agent_type(&self) -> &str {
        "galnet"
    }

    async fn start_chat(&self, request: &ChatTurnRequest) -> AgentResult<ChatTurnResult> {
        self.record("start", request)?;
        Ok(ChatTurnResult::completed(&request.message, "pong".into(), "r1".into(), "galnet"))
    }

    async fn continue_chat(&self, request: &ChatTurnRequest) -> AgentResult<ChatTurnResult> {
        self.record("continue", request)?;
        Ok(ChatTurnResult::completed(&request.message, "again".into(), "r2".into(), "galnet"))
    }

    async fn start_chat_stream(
        &self,
        request: &ChatTurnRequest,
    ) -> AgentResult<CanonicalByteStream> {
        self.record("stream", request)?;
        let upstream = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(VENDOR_STREAM))]);
        Ok(transcode(upstream, EnterpriseTranscoder::new(), None))
    }

    async fn check_health(&self) -> HealthResult {
        if self.panic_on_health {
            panic!("probe exploded");
        }
        HealthResult::offline(12.5, "API returned 503")
    }
}

struct Bridge {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Bridge {
    async fn start(adapter: Arc<dyn ProviderAdapter>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, adapter, async {
            let _ = rx.await;
        }));
        Self {
            base_url,
            shutdown: Some(tx),
        }
    }

    async fn post(&self, path: &str, body: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[tokio::test]
async fn test_chat_without_thread_starts() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let bridge = Bridge::start(adapter.clone()).await;

    let response = bridge
        .post("/api/agent", r#"{"message":"ping","conversationId":"c-1"}"#)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "pong");
    assert_eq!(body["threadId"], "r1");
    assert_eq!(body["agentType"], "galnet");

    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "start");
    assert_eq!(calls[0].1.correlation_id.as_deref(), Some("c-1"));
}

#[tokio::test]
async fn test_chat_with_thread_continues() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let bridge = Bridge::start(adapter.clone()).await;

    let response = bridge
        .post("/api/agent", r#"{"message":"ping2","threadId":"r1"}"#)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["threadId"], "r2");

    let calls = adapter.calls();
    assert_eq!(calls[0].0, "continue");
    assert_eq!(calls[0].1.handle(), Some("r1"));
}

#[tokio::test]
async fn test_missing_message_is_rejected() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let bridge = Bridge::start(adapter.clone()).await;

    for path in ["/api/agent", "/api/agent/stream"] {
        let response = bridge.post(path, r#"{"threadId":"r1"}"#).await;
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": "Message is required"}));
    }
    assert!(adapter.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_json_is_rejected() {
    let bridge = Bridge::start(Arc::new(ScriptedAdapter::default())).await;
    let response = bridge.post("/api/agent", "{oops").await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_adapter_failure_hides_vendor_body() {
    let adapter = Arc::new(ScriptedAdapter {
        failure: Some(AgentError::Upstream {
            status_code: 502,
            body: "<html>secret stack trace</html>".to_string(),
        }),
        ..Default::default()
    });
    let bridge = Bridge::start(adapter).await;

    let response = bridge.post("/api/agent", r#"{"message":"ping"}"#).await;
    assert_eq!(response.status(), 500);
    let text = response.text().await.unwrap();
    assert!(!text.contains("secret"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["error"], "Upstream service returned 502");
    assert_eq!(body["message"], FALLBACK_MESSAGE);
}

#[tokio::test]
async fn test_stream_relays_canonical_events() {
    let bridge = Bridge::start(Arc::new(ScriptedAdapter::default())).await;

    let response = bridge
        .post("/api/agent/stream", r#"{"message":"ping"}"#)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(response.headers()["cache-control"], "no-cache");

    let bytes = response.bytes().await.unwrap();
    let mut decoder = CanonicalEventDecoder::new();
    let mut events = decoder.push(&bytes);
    events.extend(decoder.finish());
    assert_eq!(
        events,
        vec![
            CanonicalStreamEvent::Start {
                conversation_handle: "r1".to_string()
            },
            CanonicalStreamEvent::Delta {
                text: "pong".to_string()
            },
            CanonicalStreamEvent::Done {
                conversation_handle: "r1".to_string(),
                usage: None,
                duration_ms: None,
                error: None,
            },
        ]
    );
}

#[tokio::test]
async fn test_stream_failure_before_body_is_json() {
    let adapter = Arc::new(ScriptedAdapter {
        failure: Some(AgentError::AuthFailure("expired secret".to_string())),
        ..Default::default()
    });
    let bridge = Bridge::start(adapter).await;

    let response = bridge
        .post("/api/agent/stream", r#"{"message":"ping"}"#)
        .await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_health_offline_is_still_200() {
    let bridge = Bridge::start(Arc::new(ScriptedAdapter::default())).await;

    let response = reqwest::get(format!("{}/api/agent/health", bridge.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["isOnline"], false);
    assert_eq!(body["responseTime"], 12.5);
    assert_eq!(body["error"], "API returned 503");
}

#[tokio::test]
async fn test_health_task_failure_is_500() {
    let adapter = Arc::new(ScriptedAdapter {
        panic_on_health: true,
        ..Default::default()
    });
    let bridge = Bridge::start(adapter).await;

    let response = reqwest::get(format!("{}/api/agent/health", bridge.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["isOnline"], false);
    assert!(body["error"].is_string());
}
