//! Subscriber for the backend's realtime change feed.
//!
//! The backend speaks the Phoenix channel protocol over a websocket: join
//! one topic per table, keep the socket alive with heartbeats on the
//! `phoenix` topic, and receive `postgres_changes` frames carrying the
//! changed row.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Tables relayed to browsers and the change types wanted from each.
pub const SUBSCRIPTIONS: &[(&str, &str)] = &[
    ("posts", "INSERT"),
    ("notifications", "INSERT"),
    ("messages", "*"),
];

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("realtime socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("realtime frame could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("realtime channel {topic} rejected join: {reason}")]
    JoinRejected { topic: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One changed row.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub table: String,
    pub kind: ChangeKind,
    pub record: Value,
    pub old_record: Value,
}

/// Receives every change the bridge sees. Implementations usually turn the
/// row into a `GatewayEvent` and hand it to the dispatcher.
pub trait ChangeHandler: Send + Sync + 'static {
    fn on_change(&self, change: Change) -> impl Future<Output = ()> + Send;
}

/// Phoenix frame, protocol version 1.0.0.
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    table: String,
    #[serde(rename = "type", alias = "eventType")]
    kind: ChangeKind,
    #[serde(default)]
    record: Value,
    #[serde(default)]
    old_record: Value,
}

pub struct RealtimeBridge<H> {
    socket_url: String,
    api_key: String,
    handler: H,
}

impl<H: ChangeHandler> RealtimeBridge<H> {
    /// `backend_url` is the project's http(s) base URL.
    pub fn new(backend_url: &str, api_key: &str, handler: H) -> Self {
        let base = backend_url
            .trim_end_matches('/')
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        Self {
            socket_url: format!("{base}/realtime/v1/websocket?apikey={api_key}&vsn=1.0.0"),
            api_key: api_key.to_string(),
            handler,
        }
    }

    /// Connect and relay forever, reconnecting after a fixed delay whenever
    /// the socket drops.
    pub async fn run(self) {
        loop {
            match self.session().await {
                Ok(()) => warn!("Realtime socket closed by backend"),
                Err(e) => error!("Realtime session failed: {}", e),
            }
            info!("Reconnecting to realtime feed in {:?}", RECONNECT_DELAY);
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// One connection lifetime. Returns when the socket closes.
    pub async fn session(&self) -> Result<(), RealtimeError> {
        let (ws, _) = connect_async(self.socket_url.as_str()).await?;
        let (mut tx, mut rx) = ws.split();
        info!("Connected to realtime feed");

        let mut next_ref: u64 = 0;
        for (table, event) in SUBSCRIPTIONS {
            next_ref += 1;
            let join = join_frame(table, event, &self.api_key, next_ref);
            tx.send(Message::Text(serde_json::to_string(&join)?.into()))
                .await?;
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    next_ref += 1;
                    let beat = Frame {
                        topic: "phoenix".into(),
                        event: "heartbeat".into(),
                        payload: json!({}),
                        reference: Some(next_ref.to_string()),
                    };
                    tx.send(Message::Text(serde_json::to_string(&beat)?.into())).await?;
                    trace!("Realtime heartbeat {}", next_ref);
                }
                msg = rx.next() => {
                    let Some(msg) = msg else { return Ok(()) };
                    match msg? {
                        Message::Text(text) => self.handle_frame(&text).await?,
                        Message::Ping(data) => tx.send(Message::Pong(data)).await?,
                        Message::Close(_) => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
    }

    async fn handle_frame(&self, text: &str) -> Result<(), RealtimeError> {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Unreadable realtime frame: {}", e);
                return Ok(());
            }
        };

        if frame.event == "phx_reply" && frame.topic != "phoenix" {
            let status = frame.payload.get("status").and_then(Value::as_str);
            if status == Some("error") {
                return Err(RealtimeError::JoinRejected {
                    topic: frame.topic,
                    reason: frame.payload["response"].to_string(),
                });
            }
            debug!("Joined {}", frame.topic);
            return Ok(());
        }

        if let Some(change) = parse_change(&frame) {
            self.handler.on_change(change).await;
        }
        Ok(())
    }
}

fn join_frame(table: &str, event: &str, api_key: &str, reference: u64) -> Frame {
    Frame {
        topic: format!("realtime:public:{table}"),
        event: "phx_join".into(),
        payload: json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": event, "schema": "public", "table": table }
                ]
            },
            "access_token": api_key
        }),
        reference: Some(reference.to_string()),
    }
}

/// Accepts the `postgres_changes` frame and the older per-event frames
/// (`INSERT`, `UPDATE`, `DELETE` with the row at the top of the payload).
fn parse_change(frame: &Frame) -> Option<Change> {
    let data = match frame.event.as_str() {
        "postgres_changes" => frame.payload.get("data")?,
        "INSERT" | "UPDATE" | "DELETE" => &frame.payload,
        _ => return None,
    };
    let data: ChangeData = serde_json::from_value(data.clone()).ok()?;
    Some(Change {
        table: data.table,
        kind: data.kind,
        record: data.record,
        old_record: data.old_record,
    })
}
