use std::collections::HashMap;

use flock_types::models::{Conversation, Message};
use serde_json::json;
use tracing::info;

use super::MESSAGE_WITH_PARTIES;
use crate::error::Result;
use crate::query::quote;
use crate::Backend;

impl Backend {
    /// Every message the user sent or received, newest first.
    pub async fn messages_for(&self, user_id: &str) -> Result<Vec<Message>> {
        let id = quote(user_id);
        self.from("messages")
            .select(MESSAGE_WITH_PARTIES)
            .or(&format!("sender_id.eq.{id},receiver_id.eq.{id}"))
            .order("created_at", false)
            .fetch()
            .await
    }

    /// The thread between two users, oldest first.
    pub async fn conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>> {
        let (me, other) = (quote(user_id), quote(other_id));
        self.from("messages")
            .select(MESSAGE_WITH_PARTIES)
            .or(&format!(
                "and(sender_id.eq.{me},receiver_id.eq.{other}),and(sender_id.eq.{other},receiver_id.eq.{me})"
            ))
            .order("created_at", true)
            .fetch()
            .await
    }

    pub async fn mark_messages_read(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.from("messages")
            .is_in("id", ids)
            .update_silent(&json!({ "is_read": true }))
            .await
    }

    pub async fn send_message(&self, sender_id: &str, receiver_id: &str, content: &str) -> Result<Message> {
        let message: Message = self
            .from("messages")
            .select(MESSAGE_WITH_PARTIES)
            .insert(&json!({
                "sender_id": sender_id,
                "receiver_id": receiver_id,
                "content": content,
                "is_read": false,
            }))
            .await?;
        info!("User {} messaged {}", sender_id, receiver_id);
        Ok(message)
    }
}

/// Collapse a user's messages into one conversation per counterpart.
///
/// Keeps the newest message of each thread and counts unread messages
/// received by `user_id`. Messages whose counterpart embed is missing are
/// dropped. Conversations come back most recent first.
pub fn group_conversations(user_id: &str, messages: Vec<Message>) -> Vec<Conversation> {
    let mut threads: HashMap<String, Conversation> = HashMap::new();

    for message in messages {
        let outgoing = message.sender_id == user_id;
        let (other_id, other) = if outgoing {
            (message.receiver_id.clone(), message.receiver.clone())
        } else {
            (message.sender_id.clone(), message.sender.clone())
        };
        let Some(mut other) = other else { continue };
        other.id = Some(other_id.clone());

        let unread = u32::from(!outgoing && !message.is_read);
        match threads.get_mut(&other_id) {
            Some(thread) => {
                if message.created_at > thread.last_message.created_at {
                    thread.last_message = message;
                }
                thread.unread_count += unread;
            }
            None => {
                threads.insert(
                    other_id,
                    Conversation {
                        user: other,
                        last_message: message,
                        unread_count: unread,
                    },
                );
            }
        }
    }

    let mut conversations: Vec<Conversation> = threads.into_values().collect();
    conversations.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
    conversations
}
