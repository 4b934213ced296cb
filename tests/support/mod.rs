//! Scripted in-memory transport for end-to-end tests.
//!
//! A [`MockServer`] records every message the client sends and answers
//! through a responder closure. Tests can also inject messages, refuse
//! connections, fail sends of a given type, or close the connection.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use iink::config::{Config, ContentType, ProtocolVersion};
use iink::error::{IinkError, Result};
use iink::transport::{BoxFuture, Transport, TransportEvent};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use url::Url;

/// Answers to one client message
pub type Responder = Box<dyn FnMut(&Value) -> Vec<Value> + Send>;

#[derive(Default)]
struct State {
    sent: Vec<Value>,
    urls: Vec<String>,
    connects: usize,
    closes: usize,
    events: Option<mpsc::Sender<TransportEvent>>,
    refused_connects: usize,
    failing_type: Option<(String, usize)>,
    responder: Option<Responder>,
}

/// Shared script and recording of one fake server
#[derive(Clone, Default)]
pub struct MockServer {
    state: Arc<Mutex<State>>,
}

impl MockServer {
    /// Server answering with `responder`
    pub fn new(responder: impl FnMut(&Value) -> Vec<Value> + Send + 'static) -> Self {
        let server = Self::default();
        server.lock().responder = Some(Box::new(responder));
        server
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Transport wired to this server
    pub fn transport(&self) -> MockTransport {
        MockTransport {
            server: self.clone(),
        }
    }

    /// Messages sent by the client, in order
    pub fn sent(&self) -> Vec<Value> {
        self.lock().sent.clone()
    }

    /// `type` of every message sent by the client
    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|m| m["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Sent messages of one type
    pub fn sent_of(&self, kind: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|m| m["type"] == kind)
            .collect()
    }

    /// Connections opened so far
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// URLs connected to
    pub fn urls(&self) -> Vec<String> {
        self.lock().urls.clone()
    }

    /// Refuse the next `count` connection attempts
    pub fn refuse_next_connects(&self, count: usize) {
        self.lock().refused_connects = count;
    }

    /// Fail the next `count` sends of messages of type `kind`
    pub fn fail_sends_of(&self, kind: &str, count: usize) {
        self.lock().failing_type = Some((kind.to_string(), count));
    }

    /// Deliver a server message
    pub fn push(&self, message: Value) {
        if let Some(events) = &self.lock().events {
            events
                .try_send(TransportEvent::Message(message.to_string()))
                .unwrap();
        }
    }

    /// Close the connection from the server side
    pub fn close_connection(&self) {
        if let Some(events) = self.lock().events.take() {
            events
                .try_send(TransportEvent::Closed {
                    code: Some(1001),
                    reason: "going away".to_string(),
                })
                .unwrap();
        }
    }

    /// Wait until the client has sent at least `count` messages
    pub async fn wait_for_sent(&self, count: usize) {
        for _ in 0..400 {
            if self.lock().sent.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "expected {} sent message(s), got {:?}",
            count,
            self.sent_types()
        );
    }
}

/// Client side of a [`MockServer`]
pub struct MockTransport {
    server: MockServer,
}

impl Transport for MockTransport {
    fn connect<'a>(
        &'a mut self,
        url: &'a Url,
    ) -> BoxFuture<'a, Result<mpsc::Receiver<TransportEvent>>> {
        Box::pin(async move {
            let mut state = self.server.lock();
            state.connects += 1;
            state.urls.push(url.to_string());
            if state.refused_connects > 0 {
                state.refused_connects -= 1;
                return Err(IinkError::Transport("connection refused".to_string()));
            }
            let (tx, rx) = mpsc::channel(64);
            tx.try_send(TransportEvent::Opened).unwrap();
            state.events = Some(tx);
            Ok(rx)
        })
    }

    fn send(&mut self, message: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.server.lock();
            let value: Value = serde_json::from_str(&message)?;
            if state.events.is_none() {
                return Err(IinkError::Transport("not connected".to_string()));
            }
            if let Some((kind, remaining)) = state.failing_type.as_mut() {
                if *remaining > 0 && value["type"] == kind.as_str() {
                    *remaining -= 1;
                    return Err(IinkError::Transport("broken pipe".to_string()));
                }
            }
            state.sent.push(value.clone());
            let replies = match state.responder.as_mut() {
                Some(responder) => responder(&value),
                None => Vec::new(),
            };
            if let Some(events) = &state.events {
                for reply in replies {
                    events
                        .try_send(TransportEvent::Message(reply.to_string()))
                        .unwrap();
                }
            }
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.server.lock();
            state.closes += 1;
            state.events = None;
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Test configuration with fast retries
pub fn config(version: ProtocolVersion) -> Config {
    let mut config = Config::default();
    config.server.scheme = "http".to_string();
    config.server.host = "localhost:8897".to_string();
    config.server.application_key = "AK1".to_string();
    config.server.hmac_key = "HK1".to_string();
    config.recognition.version = version;
    config.recognition.content_type = match version {
        ProtocolVersion::V3 => ContentType::Math,
        ProtocolVersion::V4 => ContentType::Text,
    };
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 5;
    config.retry.handshake_timeout_ms = 1_000;
    config
}

/// Variant A server: challenge `abc`, math results carrying `instance_ids`
/// in turn (the last one repeats)
pub fn v3_responder(instance_ids: Vec<&'static str>) -> impl FnMut(&Value) -> Vec<Value> + Send {
    let mut results = 0usize;
    move |message: &Value| match message["type"].as_str() {
        Some("applicationKey") => {
            vec![json!({ "type": "hmacChallenge", "data": { "challenge": "abc" } })]
        },
        Some("hmac") => vec![json!({ "type": "init" })],
        Some("start" | "continue") => {
            let instance_id = instance_ids
                .get(results)
                .or(instance_ids.last())
                .copied()
                .unwrap_or("i-1");
            results += 1;
            vec![json!({
                "type": "mathResult",
                "data": { "instanceId": instance_id, "result": { "latex": "x" } }
            })]
        },
        Some("reset") => vec![json!({ "type": "reset" })],
        _ => Vec::new(),
    }
}

/// Variant B server answering every action with a typical result
pub fn v4_responder() -> impl FnMut(&Value) -> Vec<Value> + Send {
    move |message: &Value| match message["type"].as_str() {
        Some("newContentPackage" | "restoreIInkSession") => vec![
            json!({ "type": "sessionDescription", "iinkSessionId": "s-1" }),
            json!({ "type": "contentPackageDescription", "contentPartCount": 0 }),
        ],
        Some("newContentPart") => vec![json!({ "type": "partChanged", "partId": "p-1", "partIdx": 0 })],
        Some("openContentPart") => vec![json!({ "type": "error", "code": "no.part", "message": "Unknown part" })],
        Some("addStrokes") => vec![
            json!({ "type": "svgPatch", "updates": [] }),
            json!({ "type": "contentChanged", "canUndo": true, "canRedo": false }),
        ],
        Some("undo") => vec![json!({ "type": "contentChanged", "canUndo": false, "canRedo": true })],
        Some("export") => vec![json!({
            "type": "exported",
            "exports": { "text/plain": "hello" },
            "canUndo": true
        })],
        Some("waitForIdle") => vec![json!({ "type": "idle" })],
        Some(_) => vec![json!({ "type": "contentChanged", "canUndo": true, "canRedo": false })],
        None => Vec::new(),
    }
}

/// Variant B server that only opens sessions; results are pushed by the test
pub fn v4_session_only() -> impl FnMut(&Value) -> Vec<Value> + Send {
    move |message: &Value| match message["type"].as_str() {
        Some("newContentPackage" | "restoreIInkSession") => {
            vec![json!({ "type": "sessionDescription", "iinkSessionId": "s-1" })]
        },
        _ => Vec::new(),
    }
}
