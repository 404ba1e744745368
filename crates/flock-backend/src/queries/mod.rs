//! Domain queries, one method per user-facing action.
//!
//! Multi-step writes are plain sequences of requests. Nothing is rolled back
//! when a later step fails, and counters are read, adjusted and written back.

mod bookmarks;
mod communities;
mod explore;
mod messages;
mod notifications;
mod posts;
mod users;

pub use communities::split_memberships;
pub use messages::group_conversations;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{BackendError, Result};
use crate::Backend;

pub(crate) const AUTHOR: &str = "id,username,name,avatar_url";

pub(crate) const POST_WITH_AUTHOR: &str = "*, users:user_id(id, username, name, avatar_url)";

pub(crate) const POST_WITH_COMMENTS: &str = "*,
    users:user_id(id, username, name, avatar_url),
    comments(*, users:user_id(id, username, name, avatar_url))";

pub(crate) const NOTIFICATION_WITH_EMBEDS: &str = "*,
    actor:actor_id(id, username, name, avatar_url),
    post:post_id(id, content),
    comment:comment_id(id, content)";

pub(crate) const MESSAGE_WITH_PARTIES: &str = "*,
    sender:sender_id(id, username, name, avatar_url),
    receiver:receiver_id(id, username, name, avatar_url)";

pub(crate) const BOOKMARK_WITH_POST: &str = "*,
    post:post_id(
        id, content, created_at, user_id, media_urls, media_types,
        likes_count, comments_count, reposts_count,
        user:user_id(id, username, name, avatar_url)
    )";

/// Projection used for existence checks.
#[derive(Debug, Deserialize)]
pub(crate) struct IdRow {
    #[serde(deserialize_with = "flock_types::models::id_from_string_or_number")]
    pub id: String,
}

impl Backend {
    /// Read `column` of row `id`, add `delta` (never going below zero) and
    /// write it back. Returns the new value.
    pub(crate) async fn adjust_counter(
        &self,
        table: &str,
        id: &str,
        column: &str,
        delta: i64,
    ) -> Result<i64> {
        let row: Value = self.from(table).select(column).eq("id", id).single().await?;
        let current = row.get(column).and_then(Value::as_i64).unwrap_or(0);
        let next = (current + delta).max(0);

        self.from(table)
            .eq("id", id)
            .update_silent(&json!({ column: next }))
            .await?;
        Ok(next)
    }
}

/// First row of an update that should have matched exactly one.
pub(crate) fn first<T>(rows: Vec<T>) -> Result<T> {
    rows.into_iter().next().ok_or(BackendError::NotFound)
}

/// Zero-based page to an inclusive row range.
pub(crate) fn page_range(limit: u32, page: u32) -> (u64, u64) {
    let from = u64::from(page) * u64::from(limit);
    (from, from + u64::from(limit.max(1)) - 1)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Backend, BackendConfig};
    use wiremock::MockServer;

    pub fn backend(server: &MockServer) -> Backend {
        Backend::new(BackendConfig {
            url: server.uri(),
            anon_key: "anon".into(),
        })
        .unwrap()
    }
}
