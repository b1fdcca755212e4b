//! WebSocket connection to a browser's DevTools endpoint.
//!
//! Commands are correlated with responses by id; everything without an id
//! is an event and is broadcast to subscribers. Session-scoped commands use
//! flattened sessions (`sessionId` on the top-level message).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Error)]
pub enum CdpError {
    #[error("Failed to connect to DevTools endpoint: {0}")]
    Connect(String),
    #[error("Endpoint discovery failed: {0}")]
    Discovery(String),
    #[error("Protocol error {code}: {message}")]
    Protocol { code: i64, message: String },
    #[error("Command timed out after {0}ms")]
    Timeout(u64),
    #[error("Connection closed")]
    Closed,
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Event pushed by the browser
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

/// Something that can issue DevTools commands
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn send(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError>;
}

/// Decoded incoming frame
#[derive(Debug, PartialEq)]
pub(crate) enum Incoming {
    Response {
        id: u64,
        result: Result<Value, (i64, String)>,
    },
    Event(CdpEvent),
}

#[derive(Deserialize)]
struct RawFrame {
    id: Option<u64>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    result: Option<Value>,
    error: Option<RawError>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct RawError {
    code: i64,
    message: String,
}

pub(crate) fn parse_incoming(text: &str) -> Option<Incoming> {
    let frame: RawFrame = serde_json::from_str(text).ok()?;
    match (frame.id, frame.method) {
        (Some(id), _) => {
            let result = match frame.error {
                Some(error) => Err((error.code, error.message)),
                None => Ok(frame.result.unwrap_or(Value::Null)),
            };
            Some(Incoming::Response { id, result })
        }
        (None, Some(method)) => Some(Incoming::Event(CdpEvent {
            method,
            params: frame.params,
            session_id: frame.session_id,
        })),
        (None, None) => None,
    }
}

pub(crate) fn command_frame(id: u64, method: &str, params: Value, session_id: Option<&str>) -> Value {
    let mut frame = json!({ "id": id, "method": method, "params": params });
    if let Some(session_id) = session_id {
        frame["sessionId"] = Value::String(session_id.to_string());
    }
    frame
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>>;

/// Live DevTools connection
pub struct CdpConnection {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Pending,
    next_id: AtomicU64,
    events: broadcast::Sender<CdpEvent>,
    timeout: Duration,
}

impl CdpConnection {
    /// Connect to a browser-level WebSocket debugger URL
    pub async fn connect(ws_url: &str, timeout: Duration) -> Result<Arc<Self>, CdpError> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| CdpError::Connect(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(256);

        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(error = %e, "DevTools write failed");
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_events = events.clone();
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => match parse_incoming(text.as_str()) {
                        Some(Incoming::Response { id, result }) => {
                            if let Some(tx) = reader_pending.lock().remove(&id) {
                                let _ = tx.send(result.map_err(|(code, message)| {
                                    CdpError::Protocol { code, message }
                                }));
                            }
                        }
                        Some(Incoming::Event(event)) => {
                            // No subscribers is fine
                            let _ = reader_events.send(event);
                        }
                        None => tracing::trace!("Ignoring unrecognized DevTools frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "DevTools read failed");
                        break;
                    }
                }
            }
            tracing::info!("DevTools connection closed");
            for (_, tx) in reader_pending.lock().drain() {
                let _ = tx.send(Err(CdpError::Closed));
            }
        });

        Ok(Arc::new(Self {
            outgoing,
            pending,
            next_id: AtomicU64::new(1),
            events,
            timeout,
        }))
    }

    /// Receive every event arriving after this call
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl CdpTransport for CdpConnection {
    async fn send(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let frame = command_frame(id, method, params, session_id);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        if self
            .outgoing
            .send(Message::Text(frame.to_string().into()))
            .is_err()
        {
            self.pending.lock().remove(&id);
            return Err(CdpError::Closed);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::Closed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }
}

/// Resolve a user-supplied endpoint to a browser WebSocket debugger URL
///
/// `ws://`/`wss://` URLs are used as-is; an `http://host:port` endpoint is
/// looked up through `/json/version`.
pub async fn discover_ws_url(endpoint: &str) -> Result<String, CdpError> {
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        return Ok(endpoint.to_string());
    }

    #[derive(Deserialize)]
    struct VersionInfo {
        #[serde(rename = "webSocketDebuggerUrl")]
        web_socket_debugger_url: String,
    }

    let url = format!("{}/json/version", endpoint.trim_end_matches('/'));
    let info: VersionInfo = reqwest::get(&url)
        .await
        .map_err(|e| CdpError::Discovery(e.to_string()))?
        .error_for_status()
        .map_err(|e| CdpError::Discovery(e.to_string()))?
        .json()
        .await
        .map_err(|e| CdpError::Discovery(e.to_string()))?;
    Ok(info.web_socket_debugger_url)
}
