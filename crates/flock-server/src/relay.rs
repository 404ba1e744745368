use serde_json::Value;
use tracing::{debug, warn};

use flock_backend::Backend;
use flock_gateway::{Change, ChangeHandler, ChangeKind, Dispatcher};
use flock_types::events::GatewayEvent;
use flock_types::models::{Message, Notification, Post};

/// Turns realtime rows into gateway events. New posts and notifications are
/// re-read so browsers get the author/actor embeds the raw row lacks.
pub struct Relay {
    backend: Backend,
    dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(backend: Backend, dispatcher: Dispatcher) -> Self {
        Self {
            backend,
            dispatcher,
        }
    }

    async fn event_for(&self, change: Change) -> Option<GatewayEvent> {
        match (change.table.as_str(), change.kind) {
            ("posts", ChangeKind::Insert) => {
                let id = row_id(&change.record)?;
                let post = match self.backend.post_with_author(&id).await {
                    Ok(post) => post,
                    Err(e) => {
                        warn!("Could not load author for post {}: {}", id, e);
                        decode::<Post>(change.record)?
                    }
                };
                Some(GatewayEvent::PostCreate { post })
            }
            ("notifications", ChangeKind::Insert) => {
                let id = row_id(&change.record)?;
                let notification = match self.backend.notification_with_actor(&id).await {
                    Ok(n) => n,
                    Err(e) => {
                        warn!("Could not load actor for notification {}: {}", id, e);
                        decode::<Notification>(change.record)?
                    }
                };
                Some(GatewayEvent::NotificationCreate { notification })
            }
            ("messages", ChangeKind::Insert) => decode::<Message>(change.record)
                .map(|message| GatewayEvent::MessageCreate { message }),
            ("messages", ChangeKind::Update) => decode::<Message>(change.record)
                .map(|message| GatewayEvent::MessageUpdate { message }),
            (table, kind) => {
                debug!("Ignoring {:?} on {}", kind, table);
                None
            }
        }
    }
}

impl ChangeHandler for Relay {
    async fn on_change(&self, change: Change) {
        if let Some(event) = self.event_for(change).await {
            self.dispatcher.dispatch(event).await;
        }
    }
}

fn row_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decode<T: serde::de::DeserializeOwned>(record: Value) -> Option<T> {
    serde_json::from_value(record)
        .map_err(|e| warn!("Dropping malformed realtime row: {}", e))
        .ok()
}
