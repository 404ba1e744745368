use flock_types::models::Notification;
use serde_json::json;
use tracing::{debug, warn};

use super::NOTIFICATION_WITH_EMBEDS;
use crate::error::Result;
use crate::models::NewNotification;
use crate::Backend;

impl Backend {
    /// Newest first, with actor, post and comment embeds.
    pub async fn notifications(
        &self,
        user_id: &str,
        only_unread: bool,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        let mut query = self
            .from("notifications")
            .select(NOTIFICATION_WITH_EMBEDS)
            .eq("user_id", user_id);
        if only_unread {
            query = query.eq("seen", false);
        }
        query
            .order("created_at", false)
            .limit(u64::from(limit))
            .fetch()
            .await
    }

    pub async fn notification_with_actor(&self, id: &str) -> Result<Notification> {
        self.from("notifications")
            .select(NOTIFICATION_WITH_EMBEDS)
            .eq("id", id)
            .single()
            .await
    }

    /// Scoped to the recipient so nobody can clear someone else's.
    pub async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<()> {
        self.from("notifications")
            .eq("id", id)
            .eq("user_id", user_id)
            .update_silent(&json!({ "seen": true }))
            .await
    }

    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<()> {
        self.from("notifications")
            .eq("user_id", user_id)
            .eq("seen", false)
            .update_silent(&json!({ "seen": true }))
            .await
    }

    pub async fn unread_notification_count(&self, user_id: &str) -> Result<u64> {
        self.from("notifications")
            .select("id")
            .eq("user_id", user_id)
            .eq("seen", false)
            .count()
            .await
    }

    pub async fn create_notification(&self, notification: &NewNotification<'_>) -> Result<()> {
        self.from("notifications").insert_silent(notification).await
    }

    /// Fire-and-log variant used as the last step of likes, comments and
    /// follows.
    pub(crate) async fn notify(&self, notification: NewNotification<'_>) {
        match self.create_notification(&notification).await {
            Ok(()) => debug!(
                "Notified {} of {} by {}",
                notification.user_id,
                notification.kind.as_str(),
                notification.actor_id
            ),
            Err(e) => warn!(
                "Failed to create {} notification for {}: {}",
                notification.kind.as_str(),
                notification.user_id,
                e
            ),
        }
    }
}
