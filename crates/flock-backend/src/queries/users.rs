use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flock_types::models::{AuthorSummary, NotificationKind, User};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use super::{AUTHOR, IdRow, first};
use crate::error::{BackendError, Result};
use crate::models::{FollowOutcome, NewNotification, ProfileUpdate, UnfollowOutcome};
use crate::query::quote;
use crate::Backend;

#[derive(Debug, Deserialize)]
struct FollowerRow {
    follower: Option<AuthorSummary>,
}

#[derive(Debug, Deserialize)]
struct FollowingRow {
    following: Option<AuthorSummary>,
}

#[derive(Debug, Deserialize)]
struct FollowingId {
    following_id: String,
}

#[derive(Debug, Serialize)]
struct ProfilePatch<'a> {
    #[serde(flatten)]
    update: &'a ProfileUpdate,
    updated_at: DateTime<Utc>,
}

impl Backend {
    // -- Profiles --

    pub async fn user_by_username(&self, username: &str) -> Result<User> {
        self.from("users").select("*").eq("username", username).single().await
    }

    pub async fn user_by_id(&self, id: &str) -> Result<User> {
        self.from("users").select("*").eq("id", id).single().await
    }

    /// Whether `username` belongs to anyone other than `except`.
    pub async fn username_taken(&self, username: &str, except: Option<&str>) -> Result<bool> {
        let mut query = self.from("users").select("id").eq("username", username);
        if let Some(id) = except {
            query = query.neq("id", id);
        }
        let rows: Vec<IdRow> = query.fetch().await?;
        Ok(!rows.is_empty())
    }

    pub async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<User> {
        if let Some(username) = &update.username {
            if username.contains(' ') {
                return Err(BackendError::Invalid("Username cannot contain spaces".into()));
            }
            if self.username_taken(username, Some(user_id)).await? {
                return Err(BackendError::Conflict("Username is already taken".into()));
            }
        }

        let rows: Vec<User> = self
            .from("users")
            .eq("id", user_id)
            .update(&ProfilePatch {
                update,
                updated_at: Utc::now(),
            })
            .await?;
        info!("Updated profile of {}", user_id);
        first(rows)
    }

    pub async fn top_users(&self, limit: u32) -> Result<Vec<User>> {
        self.from("users")
            .select("id,username,name,avatar_url,bio,followers_count")
            .order("followers_count", false)
            .limit(u64::from(limit))
            .fetch()
            .await
    }

    pub async fn search_users(&self, q: &str, limit: u32) -> Result<Vec<AuthorSummary>> {
        let pattern = quote(&format!("*{}*", q.trim()));
        self.from("users")
            .select(AUTHOR)
            .or(&format!("username.ilike.{pattern},name.ilike.{pattern}"))
            .limit(u64::from(limit))
            .fetch()
            .await
    }

    // -- Follow graph --

    pub async fn follow_user(&self, follower_id: &str, target_id: &str) -> Result<FollowOutcome> {
        if follower_id == target_id {
            return Err(BackendError::Invalid("You cannot follow yourself".into()));
        }
        if self.is_following(follower_id, target_id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        self.from("follows")
            .insert_silent(&json!({ "follower_id": follower_id, "following_id": target_id }))
            .await?;
        self.adjust_counter("users", target_id, "followers_count", 1).await?;
        self.adjust_counter("users", follower_id, "following_count", 1).await?;

        self.notify(NewNotification {
            user_id: target_id,
            actor_id: follower_id,
            kind: NotificationKind::Follow,
            post_id: None,
            comment_id: None,
            seen: false,
        })
        .await;

        info!("User {} followed {}", follower_id, target_id);
        Ok(FollowOutcome::Followed)
    }

    pub async fn unfollow_user(&self, follower_id: &str, target_id: &str) -> Result<UnfollowOutcome> {
        if !self.is_following(follower_id, target_id).await? {
            return Ok(UnfollowOutcome::NotFollowing);
        }

        self.from("follows")
            .eq("follower_id", follower_id)
            .eq("following_id", target_id)
            .delete()
            .await?;
        self.adjust_counter("users", target_id, "followers_count", -1).await?;
        self.adjust_counter("users", follower_id, "following_count", -1).await?;

        if let Err(e) = self
            .from("notifications")
            .eq("user_id", target_id)
            .eq("actor_id", follower_id)
            .eq("type", NotificationKind::Follow.as_str())
            .delete()
            .await
        {
            error!("Failed to remove follow notification for {}: {}", target_id, e);
        }

        info!("User {} unfollowed {}", follower_id, target_id);
        Ok(UnfollowOutcome::Unfollowed)
    }

    pub async fn followers(&self, user_id: &str) -> Result<Vec<AuthorSummary>> {
        let rows: Vec<FollowerRow> = self
            .from("follows")
            .select("follower:follower_id(id, username, name, avatar_url)")
            .eq("following_id", user_id)
            .fetch()
            .await?;
        Ok(rows.into_iter().filter_map(|r| r.follower).collect())
    }

    pub async fn following(&self, user_id: &str) -> Result<Vec<AuthorSummary>> {
        let rows: Vec<FollowingRow> = self
            .from("follows")
            .select("following:following_id(id, username, name, avatar_url)")
            .eq("follower_id", user_id)
            .fetch()
            .await?;
        Ok(rows.into_iter().filter_map(|r| r.following).collect())
    }

    pub async fn is_following(&self, follower_id: &str, target_id: &str) -> Result<bool> {
        let rows: Vec<IdRow> = self
            .from("follows")
            .select("id")
            .eq("follower_id", follower_id)
            .eq("following_id", target_id)
            .fetch()
            .await?;
        Ok(!rows.is_empty())
    }

    pub async fn following_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let rows: Vec<FollowingId> = self
            .from("follows")
            .select("following_id")
            .eq("follower_id", user_id)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(|r| r.following_id).collect())
    }

    /// For each candidate, whether `user_id` follows them. Every candidate
    /// appears in the map.
    pub async fn follow_status(
        &self,
        user_id: &str,
        candidates: &[String],
    ) -> Result<HashMap<String, bool>> {
        let mut status: HashMap<String, bool> =
            candidates.iter().map(|id| (id.clone(), false)).collect();
        if candidates.is_empty() {
            return Ok(status);
        }

        let rows: Vec<FollowingId> = self
            .from("follows")
            .select("following_id")
            .eq("follower_id", user_id)
            .is_in("following_id", candidates)
            .fetch()
            .await?;
        for row in rows {
            status.insert(row.following_id, true);
        }
        Ok(status)
    }
}
