use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Notification, Post};

/// Events pushed to browsers over the websocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful identification
    Ready { user_id: Uuid },

    /// A post was inserted, with its author embed
    PostCreate { post: Post },

    /// A notification addressed to one user was inserted
    NotificationCreate { notification: Notification },

    /// A direct message was sent
    MessageCreate { message: Message },

    /// A direct message changed (e.g. marked as read)
    MessageUpdate { message: Message },
}

impl GatewayEvent {
    /// User ids this event is addressed to. `None` means every connected
    /// client receives it.
    pub fn audience(&self) -> Option<Vec<String>> {
        match self {
            Self::NotificationCreate { notification } => Some(vec![notification.user_id.clone()]),
            Self::MessageCreate { message } | Self::MessageUpdate { message } => Some(vec![
                message.sender_id.clone(),
                message.receiver_id.clone(),
            ]),
            Self::Ready { user_id } => Some(vec![user_id.to_string()]),
            Self::PostCreate { .. } => None,
        }
    }

    pub fn is_for(&self, user_id: &str) -> bool {
        match self.audience() {
            None => true,
            Some(ids) => ids.iter().any(|id| id == user_id),
        }
    }
}

/// Commands sent FROM client TO server over the websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the websocket connection with a backend access token
    Identify { token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, receiver: &str) -> Message {
        serde_json::from_value(serde_json::json!({
            "id": "m1",
            "sender_id": sender,
            "receiver_id": receiver,
            "content": "hi"
        }))
        .unwrap()
    }

    #[test]
    fn messages_reach_both_parties_only() {
        let event = GatewayEvent::MessageCreate {
            message: message("a", "b"),
        };
        assert!(event.is_for("a"));
        assert!(event.is_for("b"));
        assert!(!event.is_for("c"));
    }

    #[test]
    fn posts_are_global() {
        let event = GatewayEvent::PostCreate {
            post: Post::default(),
        };
        assert!(event.audience().is_none());
        assert!(event.is_for("anyone"));
    }

    #[test]
    fn identify_wire_format() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Identify","data":{"token":"abc"}}"#).unwrap();
        let GatewayCommand::Identify { token } = cmd;
        assert_eq!(token, "abc");
    }
}
