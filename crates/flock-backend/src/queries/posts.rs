use chrono::Utc;
use flock_types::models::{Comment, NotificationKind, Post};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::{IdRow, POST_WITH_AUTHOR, POST_WITH_COMMENTS, page_range};
use crate::error::Result;
use crate::models::{
    BookmarkOutcome, LikeOutcome, NewNotification, NewPost, PostInsert, RemoveBookmarkOutcome,
    UnlikeOutcome,
};
use crate::query::quote;
use crate::Backend;

#[derive(Debug, Deserialize)]
struct PostOwner {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct CommentTarget {
    user_id: String,
    #[serde(default)]
    comments_count: i64,
}

#[derive(Debug, Deserialize)]
struct LikeCount {
    #[serde(default)]
    likes_count: i64,
}

impl Backend {
    // -- Feed --

    /// Newest posts first, paged.
    pub async fn feed_posts(&self, limit: u32, page: u32) -> Result<Vec<Post>> {
        let (from, to) = page_range(limit, page);
        self.from("posts")
            .select(POST_WITH_AUTHOR)
            .order("created_at", false)
            .range(from, to)
            .fetch()
            .await
    }

    /// Posts from everyone `user_id` follows, plus their own.
    pub async fn following_feed(&self, user_id: &str, limit: u32, page: u32) -> Result<Vec<Post>> {
        let mut authors = self.following_ids(user_id).await?;
        authors.push(user_id.to_string());

        let (from, to) = page_range(limit, page);
        self.from("posts")
            .select(POST_WITH_AUTHOR)
            .is_in("user_id", &authors)
            .order("created_at", false)
            .range(from, to)
            .fetch()
            .await
    }

    pub async fn user_posts(&self, username: &str, limit: u32, page: u32) -> Result<Vec<Post>> {
        let user: IdRow = self
            .from("users")
            .select("id")
            .eq("username", username)
            .single()
            .await?;

        let (from, to) = page_range(limit, page);
        self.from("posts")
            .select(POST_WITH_AUTHOR)
            .eq("user_id", &user.id)
            .order("created_at", false)
            .range(from, to)
            .fetch()
            .await
    }

    pub async fn post_with_comments(&self, post_id: &str) -> Result<Post> {
        self.from("posts")
            .select(POST_WITH_COMMENTS)
            .eq("id", post_id)
            .single()
            .await
    }

    pub async fn post_with_author(&self, post_id: &str) -> Result<Post> {
        self.from("posts")
            .select(POST_WITH_AUTHOR)
            .eq("id", post_id)
            .single()
            .await
    }

    pub async fn search_posts(&self, term: &str, limit: u32) -> Result<Vec<Post>> {
        let term = term.trim().trim_start_matches('#');
        let filter = format!(
            "content.ilike.{},content.ilike.{}",
            quote(&format!("*{term}*")),
            quote(&format!("*#{term}*")),
        );
        self.from("posts")
            .select(POST_WITH_AUTHOR)
            .or(&filter)
            .order("created_at", false)
            .limit(u64::from(limit))
            .fetch()
            .await
    }

    pub async fn trending_posts(&self, limit: u32) -> Result<Vec<Post>> {
        self.from("posts")
            .select(POST_WITH_AUTHOR)
            .order("likes_count", false)
            .limit(u64::from(limit))
            .fetch()
            .await
    }

    // -- Writes --

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let created: Post = self
            .from("posts")
            .insert(&PostInsert::fresh(post))
            .await?;
        info!("User {} created post {}", post.user_id, created.id);
        Ok(created)
    }

    /// Create a repost carrying the original's media, then bump the
    /// original's repost counter. A failed bump is logged and ignored.
    pub async fn repost(&self, user_id: &str, original_id: &str) -> Result<Post> {
        let original: Post = self.from("posts").select("*").eq("id", original_id).single().await?;

        let post = NewPost {
            user_id: user_id.to_string(),
            content: String::new(),
            media_urls: original.media_urls.clone(),
            media_types: original.media_types.clone(),
            ..Default::default()
        };
        let row = PostInsert {
            is_repost: true,
            original_post_id: Some(original_id),
            ..PostInsert::fresh(&post)
        };
        let created: Post = self.from("posts").insert(&row).await?;

        if let Err(e) = self
            .from("posts")
            .eq("id", original_id)
            .update_silent(&json!({ "reposts_count": original.reposts_count + 1 }))
            .await
        {
            error!("Failed to update repost count on {}: {}", original_id, e);
        }

        info!("User {} reposted {}", user_id, original_id);
        Ok(created)
    }

    pub async fn like_post(&self, user_id: &str, post_id: &str) -> Result<LikeOutcome> {
        let existing: Vec<IdRow> = self
            .from("likes")
            .select("id")
            .eq("user_id", user_id)
            .eq("post_id", post_id)
            .fetch()
            .await?;
        if !existing.is_empty() {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        self.from("likes")
            .insert_silent(&json!({ "user_id": user_id, "post_id": post_id }))
            .await?;
        self.adjust_counter("posts", post_id, "likes_count", 1).await?;

        match self.post_owner(post_id).await {
            Ok(owner) if owner != user_id => {
                self.notify(NewNotification {
                    user_id: &owner,
                    actor_id: user_id,
                    kind: NotificationKind::Like,
                    post_id: Some(post_id),
                    comment_id: None,
                    seen: false,
                })
                .await;
            }
            Ok(_) => {}
            Err(e) => warn!("Could not look up owner of {}: {}", post_id, e),
        }

        debug!("User {} liked {}", user_id, post_id);
        Ok(LikeOutcome::Liked)
    }

    pub async fn unlike_post(&self, user_id: &str, post_id: &str) -> Result<UnlikeOutcome> {
        let post: LikeCount = self
            .from("posts")
            .select("id,likes_count")
            .eq("id", post_id)
            .single()
            .await?;

        let existing: Option<IdRow> = self
            .from("likes")
            .select("id")
            .eq("user_id", user_id)
            .eq("post_id", post_id)
            .maybe_single()
            .await?;
        let Some(like) = existing else {
            return Ok(UnlikeOutcome::NotLiked);
        };

        self.from("likes").eq("id", &like.id).delete().await?;
        self.from("posts")
            .eq("id", post_id)
            .update_silent(&json!({ "likes_count": (post.likes_count - 1).max(0) }))
            .await?;

        if let Err(e) = self
            .from("notifications")
            .eq("type", NotificationKind::Like.as_str())
            .eq("actor_id", user_id)
            .eq("post_id", post_id)
            .delete()
            .await
        {
            error!("Failed to remove like notification for {}: {}", post_id, e);
        }

        debug!("User {} unliked {}", user_id, post_id);
        Ok(UnlikeOutcome::Unliked)
    }

    pub async fn bookmark_post(&self, user_id: &str, post_id: &str) -> Result<BookmarkOutcome> {
        let _: IdRow = self.from("posts").select("id").eq("id", post_id).single().await?;

        let existing: Option<IdRow> = self
            .from("bookmarks")
            .select("id")
            .eq("user_id", user_id)
            .eq("post_id", post_id)
            .maybe_single()
            .await?;
        if let Some(bookmark) = existing {
            return Ok(BookmarkOutcome::Existing(bookmark.id));
        }

        let created: IdRow = self
            .from("bookmarks")
            .insert(&json!({
                "user_id": user_id,
                "post_id": post_id,
                "created_at": Utc::now(),
            }))
            .await?;
        Ok(BookmarkOutcome::Created(created.id))
    }

    pub async fn remove_bookmark(&self, user_id: &str, post_id: &str) -> Result<RemoveBookmarkOutcome> {
        let existing: Option<IdRow> = self
            .from("bookmarks")
            .select("id")
            .eq("user_id", user_id)
            .eq("post_id", post_id)
            .maybe_single()
            .await?;
        if existing.is_none() {
            return Ok(RemoveBookmarkOutcome::NotBookmarked);
        }

        self.from("bookmarks")
            .eq("user_id", user_id)
            .eq("post_id", post_id)
            .delete()
            .await?;
        Ok(RemoveBookmarkOutcome::Removed)
    }

    /// The post's owner and comment counter are read up front, so a missing
    /// post fails before anything is written. A failed counter bump is
    /// logged and ignored.
    pub async fn add_comment(&self, user_id: &str, post_id: &str, content: &str) -> Result<Comment> {
        let post: CommentTarget = self
            .from("posts")
            .select("user_id,comments_count")
            .eq("id", post_id)
            .single()
            .await?;

        let comment: Comment = self
            .from("comments")
            .insert(&json!({
                "user_id": user_id,
                "post_id": post_id,
                "content": content,
                "likes_count": 0,
            }))
            .await?;

        if let Err(e) = self
            .from("posts")
            .eq("id", post_id)
            .update_silent(&json!({ "comments_count": post.comments_count + 1 }))
            .await
        {
            error!("Failed to update comment count on {}: {}", post_id, e);
        }

        if post.user_id != user_id {
            self.notify(NewNotification {
                user_id: &post.user_id,
                actor_id: user_id,
                kind: NotificationKind::Comment,
                post_id: Some(post_id),
                comment_id: Some(&comment.id),
                seen: false,
            })
            .await;
        }

        info!("User {} commented on {}", user_id, post_id);
        Ok(comment)
    }

    async fn post_owner(&self, post_id: &str) -> Result<String> {
        let row: PostOwner = self
            .from("posts")
            .select("user_id")
            .eq("id", post_id)
            .single()
            .await?;
        Ok(row.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::backend;
    use super::*;
    use crate::error::BackendError;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn following_feed_includes_own_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/follows"))
            .and(query_param("follower_id", "eq.me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "following_id": "a" }, { "following_id": "b" }])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param("user_id", "in.(\"a\",\"b\",\"me\")"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "p1", "user_id": "a", "content": "hi" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let posts = backend(&server).following_feed("me", 10, 0).await.unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn second_like_is_reported_not_inserted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/likes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "l1" }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/likes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = backend(&server).like_post("u1", "p1").await.unwrap();
        assert_eq!(outcome, LikeOutcome::AlreadyLiked);
    }

    #[tokio::test]
    async fn like_notifies_the_owner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/likes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/likes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param("select", "likes_count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "likes_count": 4 })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/posts"))
            .and(body_partial_json(json!({ "likes_count": 5 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param("select", "user_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_id": "owner" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/notifications"))
            .and(body_partial_json(json!({
                "user_id": "owner",
                "actor_id": "fan",
                "type": "like",
                "post_id": "p1",
                "seen": false
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = backend(&server).like_post("fan", "p1").await.unwrap();
        assert_eq!(outcome, LikeOutcome::Liked);
    }

    #[tokio::test]
    async fn unlike_missing_post_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned"
            })))
            .mount(&server)
            .await;

        let err = backend(&server).unlike_post("u1", "gone").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn existing_bookmark_returns_its_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "p1" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/bookmarks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 17 }])))
            .mount(&server)
            .await;

        let outcome = backend(&server).bookmark_post("u1", "p1").await.unwrap();
        assert_eq!(outcome, BookmarkOutcome::Existing("17".into()));
    }

    #[tokio::test]
    async fn comment_bumps_counter_and_notifies_owner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param("select", "user_id,comments_count"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "user_id": "owner", "comments_count": 2 })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/comments"))
            .and(body_partial_json(json!({ "user_id": "fan", "post_id": "p1", "content": "nice" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "c1", "user_id": "fan", "post_id": "p1", "content": "nice"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/posts"))
            .and(query_param("id", "eq.p1"))
            .and(body_partial_json(json!({ "comments_count": 3 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/notifications"))
            .and(body_partial_json(json!({
                "user_id": "owner",
                "actor_id": "fan",
                "type": "comment",
                "post_id": "p1",
                "comment_id": "c1"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let comment = backend(&server).add_comment("fan", "p1", "nice").await.unwrap();
        assert_eq!(comment.id, "c1");
    }

    #[tokio::test]
    async fn comment_on_own_post_sends_no_notification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "user_id": "me", "comments_count": 0 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/comments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "c2" })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/notifications"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let comment = backend(&server).add_comment("me", "p1", "note to self").await.unwrap();
        assert_eq!(comment.id, "c2");
    }

    #[tokio::test]
    async fn comment_on_missing_post_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = backend(&server).add_comment("fan", "gone", "hi").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn repost_copies_media_and_survives_failed_counter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param("id", "eq.orig"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "orig",
                "user_id": "author",
                "content": "look",
                "media_urls": ["https://ik.imagekit.io/flock/posts/a.jpg"],
                "media_types": ["image"],
                "reposts_count": 4
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/posts"))
            .and(body_partial_json(json!({
                "user_id": "fan",
                "is_repost": true,
                "original_post_id": "orig",
                "media_urls": ["https://ik.imagekit.io/flock/posts/a.jpg"],
                "media_types": ["image"]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "r1",
                "user_id": "fan",
                "is_repost": true,
                "original_post_id": "orig"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/posts"))
            .and(body_partial_json(json!({ "reposts_count": 5 })))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let post = backend(&server).repost("fan", "orig").await.unwrap();
        assert_eq!(post.id, "r1");
        assert!(post.is_repost);
        assert_eq!(post.original_post_id.as_deref(), Some("orig"));
    }

    #[tokio::test]
    async fn unlike_clamps_counter_and_drops_notification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "p1", "likes_count": 0 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/likes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "l1" }])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/likes"))
            .and(query_param("id", "eq.l1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/posts"))
            .and(body_partial_json(json!({ "likes_count": 0 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/notifications"))
            .and(query_param("type", "eq.like"))
            .and(query_param("actor_id", "eq.fan"))
            .and(query_param("post_id", "eq.p1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = backend(&server).unlike_post("fan", "p1").await.unwrap();
        assert_eq!(outcome, UnlikeOutcome::Unliked);
    }

    #[tokio::test]
    async fn search_strips_hash_and_matches_both_forms() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param(
                "or",
                "(content.ilike.\"*rust*\",content.ilike.\"*#rust*\")",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let posts = backend(&server).search_posts("#rust", 20).await.unwrap();
        assert!(posts.is_empty());
    }
}
