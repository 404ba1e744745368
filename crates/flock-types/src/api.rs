use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AuthorSummary, Bookmark, BookmarkCollection, Community, Conversation, Job, Post,
    TrendingTopic, User,
};

// -- Access token claims --

/// Claims carried by the backend's access tokens. Shared by the REST
/// middleware and the websocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl Claims {
    pub fn username(&self) -> Option<&str> {
        self.user_metadata.get("username").and_then(|v| v.as_str())
    }
}

// -- Generic action result --

/// The shape every write endpoint answers with, successful or not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_auth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// An auth user merged with its profile row.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub user_metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
    /// True when the backend requires e-mail confirmation before sign-in.
    pub confirmation_required: bool,
}

// -- Feed --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedTab {
    #[default]
    ForYou,
    Following,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub tab: FeedTab,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub limit: u32,
}

pub fn default_page_size() -> u32 {
    10
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub limit: u32,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub is_following: bool,
    pub is_self: bool,
}

#[derive(Debug, Serialize)]
pub struct FollowListResponse {
    pub users: Vec<AuthorSummary>,
    /// user id -> whether the caller follows them
    pub following: HashMap<String, bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowState {
    pub user: AuthorSummary,
    pub is_following: bool,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: u64,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
}

// -- Bookmarks --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCollectionRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignCollectionRequest {
    pub collection_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookmarksResponse {
    pub bookmarks: Vec<Bookmark>,
    pub collections: Vec<BookmarkCollection>,
}

// -- Communities --

#[derive(Debug, Serialize)]
pub struct CommunitiesResponse {
    pub discover: Vec<Community>,
    pub mine: Vec<Community>,
}

// -- Jobs --

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    #[serde(rename = "type", default = "default_job_filter")]
    pub kind: String,
}

fn default_job_filter() -> String {
    "All".to_string()
}

#[derive(Debug, Serialize)]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,
    /// Relative label such as "Yesterday" or "2 weeks ago".
    pub posted: String,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub featured: Option<JobListing>,
    pub jobs: Vec<JobListing>,
}

// -- Explore & search --

#[derive(Debug, Serialize)]
pub struct ExploreResponse {
    pub topics: Vec<TrendingTopic>,
    pub users: Vec<User>,
    pub posts: Vec<Post>,
    pub following: HashMap<String, bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchResult {
    User {
        id: String,
        username: String,
        name: String,
        avatar_url: Option<String>,
    },
    Hashtag {
        id: String,
        tag: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub posts: Vec<Post>,
}

// -- Media --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

#[derive(Debug, Deserialize)]
pub struct MediaUrlQuery {
    pub path: String,
    #[serde(default)]
    pub w: Option<u32>,
    #[serde(default)]
    pub h: Option<u32>,
    #[serde(default)]
    pub kind: MediaKind,
}

#[derive(Debug, Serialize)]
pub struct MediaUrlResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadAuthResponse {
    pub token: String,
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
    pub url_endpoint: String,
}
