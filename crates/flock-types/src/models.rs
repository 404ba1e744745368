//! Row shapes exchanged with the backend and returned to clients.
//!
//! The backend owns the schema. These types only describe the columns the
//! application reads, so nearly everything carries a serde default: a
//! projection like `select=id,username` must still deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Accepts both `"42"` and `42` for id columns. Fixture rows use string ids
/// while some backend tables use integer keys.
pub fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Nullable variant of [`id_from_string_or_number`].
pub fn optional_id_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "id_from_string_or_number")] String);

    Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(id)| id))
}

/// The author embed attached to posts, messages and notifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, alias = "banner_url")]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: Some(self.id.clone()),
            username: self.username.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub media_urls: Option<Vec<String>>,
    #[serde(default)]
    pub media_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub reposts_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub is_repost: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_post_id: Option<String>,
    /// Author embed. The bookmarks query aliases it as `user`.
    #[serde(default, alias = "user", skip_serializing_if = "Option::is_none")]
    pub users: Option<AuthorSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<AuthorSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub post_id: String,
    #[serde(default)]
    pub comment_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    pub follower_id: String,
    pub following_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Repost,
    Mention,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Follow => "follow",
            Self::Repost => "repost",
            Self::Mention => "mention",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSnippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub actor_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub comment_id: Option<String>,
    #[serde(default)]
    pub seen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<AuthorSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<ContentSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<ContentSnippet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<AuthorSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<AuthorSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub user: AuthorSummary,
    pub last_message: Message,
    pub unread_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_id_from_string_or_number")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkCollection {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "members_count")]
    pub member_count: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_member: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingTopic {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub tag: String,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_id_accepts_numbers() {
        let topic: TrendingTopic =
            serde_json::from_str(r##"{"id": 7, "tag": "#Gaming", "posts_count": 4320}"##).unwrap();
        assert_eq!(topic.id, "7");
        assert_eq!(topic.category, None);
    }

    #[test]
    fn bookmark_post_reads_user_alias() {
        let bookmark: Bookmark = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "user_id": "u1",
            "post_id": "p1",
            "created_at": "2024-05-01T10:00:00+00:00",
            "post": {
                "id": "p1",
                "content": "saved",
                "user": { "id": "u2", "username": "dev", "name": "Dev" }
            }
        }))
        .unwrap();

        let post = bookmark.post.unwrap();
        assert_eq!(post.users.unwrap().username, "dev");
        assert_eq!(post.likes_count, 0);
    }

    #[test]
    fn bookmark_ids_accept_integer_keys() {
        let bookmark: Bookmark = serde_json::from_value(serde_json::json!({
            "id": 17,
            "user_id": "u1",
            "post_id": "p1",
            "collection_id": 3
        }))
        .unwrap();
        assert_eq!(bookmark.id, "17");
        assert_eq!(bookmark.collection_id.as_deref(), Some("3"));

        let loose: Bookmark = serde_json::from_value(serde_json::json!({
            "id": "b2",
            "user_id": "u1",
            "post_id": "p1",
            "collection_id": null
        }))
        .unwrap();
        assert_eq!(loose.collection_id, None);
    }

    #[test]
    fn collection_without_timestamp_omits_epoch() {
        let collection: BookmarkCollection = serde_json::from_value(serde_json::json!({
            "id": 3,
            "user_id": "u1",
            "name": "Reading"
        }))
        .unwrap();
        assert_eq!(collection.created_at, None);
        let json = serde_json::to_value(&collection).unwrap();
        assert!(!json.to_string().contains("1970"));
    }

    #[test]
    fn notification_kind_uses_type_column() {
        let n: Notification = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "user_id": "u1",
            "actor_id": "u2",
            "type": "follow",
            "seen": false
        }))
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Follow);
        assert!(n.actor.is_none());
    }
}
