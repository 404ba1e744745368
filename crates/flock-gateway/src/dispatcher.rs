use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

use flock_types::events::GatewayEvent;

/// Manages all connected clients and fans events out to them.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

type UserSender = mpsc::UnboundedSender<GatewayEvent>;

struct DispatcherInner {
    /// Events addressed to everyone (new posts)
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Online users: user_id -> username
    online_users: RwLock<HashMap<Uuid, String>>,

    /// Targeted channels: user_id -> (conn_id, sender) for every open tab
    user_channels: RwLock<HashMap<Uuid, Vec<(Uuid, UserSender)>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                online_users: RwLock::new(HashMap::new()),
                user_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Send an event to every connected client.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Route an event by its audience: global events are broadcast, scoped
    /// events go only to the listed users' connections.
    pub async fn dispatch(&self, event: GatewayEvent) {
        match event.audience() {
            None => self.broadcast(event),
            Some(ids) => {
                for id in ids {
                    match Uuid::parse_str(&id) {
                        Ok(user_id) => self.send_to_user(user_id, event.clone()).await,
                        Err(_) => debug!("Dropping event for non-uuid user id {}", id),
                    }
                }
            }
        }
    }

    /// Register a targeted channel for one connection. Returns (conn_id, receiver).
    pub async fn register_user_channel(
        &self,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push((conn_id, tx));
        (conn_id, rx)
    }

    /// Remove one connection's channel. Returns true if it was the user's last.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) -> bool {
        let mut channels = self.inner.user_channels.write().await;
        let Some(conns) = channels.get_mut(&user_id) else {
            return true;
        };
        conns.retain(|(cid, _)| *cid != conn_id);
        if conns.is_empty() {
            channels.remove(&user_id);
            true
        } else {
            false
        }
    }

    /// Send a targeted event to every open connection of a user.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some(conns) = channels.get(&user_id) {
            for (_, tx) in conns {
                let _ = tx.send(event.clone());
            }
        }
    }

    pub async fn user_online(&self, user_id: Uuid, username: String) {
        self.inner
            .online_users
            .write()
            .await
            .insert(user_id, username);
    }

    /// Drop one connection. The user goes offline when their last
    /// connection closes.
    pub async fn user_offline(&self, user_id: Uuid, conn_id: Uuid) {
        if self.unregister_user_channel(user_id, conn_id).await {
            self.inner.online_users.write().await.remove(&user_id);
        }
    }

    pub async fn online_count(&self) -> usize {
        self.inner.online_users.read().await.len()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.online_users.read().await.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_types::models::{Message, Post};

    fn message(sender: Uuid, receiver: Uuid) -> GatewayEvent {
        GatewayEvent::MessageCreate {
            message: Message {
                id: "m1".into(),
                sender_id: sender.to_string(),
                receiver_id: receiver.to_string(),
                content: "hi".into(),
                created_at: chrono::Utc::now(),
                is_read: false,
                sender: None,
                receiver: None,
            },
        }
    }

    #[tokio::test]
    async fn scoped_events_reach_only_their_audience() {
        let dispatcher = Dispatcher::new();
        let (ann, bob, eve) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (_, mut ann_rx) = dispatcher.register_user_channel(ann).await;
        let (_, mut bob_rx) = dispatcher.register_user_channel(bob).await;
        let (_, mut eve_rx) = dispatcher.register_user_channel(eve).await;

        dispatcher.dispatch(message(ann, bob)).await;

        assert!(matches!(ann_rx.try_recv(), Ok(GatewayEvent::MessageCreate { .. })));
        assert!(matches!(bob_rx.try_recv(), Ok(GatewayEvent::MessageCreate { .. })));
        assert!(eve_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn global_events_use_the_broadcast_channel() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();
        dispatcher
            .dispatch(GatewayEvent::PostCreate {
                post: Post::default(),
            })
            .await;
        assert!(matches!(rx.recv().await, Ok(GatewayEvent::PostCreate { .. })));
    }

    #[tokio::test]
    async fn every_tab_gets_targeted_events() {
        let dispatcher = Dispatcher::new();
        let (ann, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mut tab1) = dispatcher.register_user_channel(ann).await;
        let (_, mut tab2) = dispatcher.register_user_channel(ann).await;

        dispatcher.dispatch(message(bob, ann)).await;
        assert!(tab1.try_recv().is_ok());
        assert!(tab2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn offline_only_after_last_connection() {
        let dispatcher = Dispatcher::new();
        let ann = Uuid::new_v4();
        let (c1, _rx1) = dispatcher.register_user_channel(ann).await;
        let (c2, _rx2) = dispatcher.register_user_channel(ann).await;
        dispatcher.user_online(ann, "ann".into()).await;
        assert_eq!(dispatcher.online_count().await, 1);

        dispatcher.user_offline(ann, c1).await;
        assert!(dispatcher.is_online(ann).await);

        dispatcher.user_offline(ann, c2).await;
        assert!(!dispatcher.is_online(ann).await);
        assert_eq!(dispatcher.online_count().await, 0);
    }
}
