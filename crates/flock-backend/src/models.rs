//! Write shapes sent to the backend and the outcomes of multi-step writes.

use chrono::{DateTime, Utc};
use flock_types::models::NotificationKind;
use serde::Serialize;

/// A post as composed by a user. Counters are filled in on insert.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPost {
    pub user_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Row actually written for a new post or repost.
#[derive(Debug, Serialize)]
pub(crate) struct PostInsert<'a> {
    #[serde(flatten)]
    pub post: &'a NewPost,
    pub likes_count: i64,
    pub reposts_count: i64,
    pub comments_count: i64,
    pub views_count: i64,
    pub is_repost: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_post_id: Option<&'a str>,
}

impl<'a> PostInsert<'a> {
    pub fn fresh(post: &'a NewPost) -> Self {
        Self {
            post,
            likes_count: 0,
            reposts_count: 0,
            comments_count: 0,
            views_count: 0,
            is_repost: false,
            original_post_id: None,
        }
    }
}

/// Columns of the profile form. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewNotification<'a> {
    pub user_id: &'a str,
    pub actor_id: &'a str,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<&'a str>,
    pub seen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    AlreadyLiked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlikeOutcome {
    Unliked,
    NotLiked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    NotFollowing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkOutcome {
    Created(String),
    Existing(String),
}

impl BookmarkOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Created(id) | Self::Existing(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveBookmarkOutcome {
    Removed,
    NotBookmarked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_insert_starts_counters_at_zero() {
        let post = NewPost {
            user_id: "u1".into(),
            content: "hello".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(PostInsert::fresh(&post)).unwrap();
        assert_eq!(json["likes_count"], 0);
        assert_eq!(json["is_repost"], false);
        assert!(json.get("media_urls").is_none());
        assert!(json.get("original_post_id").is_none());
    }

    #[test]
    fn notification_kind_serializes_as_type() {
        let n = NewNotification {
            user_id: "owner",
            actor_id: "fan",
            kind: NotificationKind::Like,
            post_id: Some("p1"),
            comment_id: None,
            seen: false,
        };
        let json = serde_json::to_value(n).unwrap();
        assert_eq!(json["type"], "like");
        assert!(json.get("comment_id").is_none());
    }
}
