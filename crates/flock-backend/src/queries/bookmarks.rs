use flock_types::models::{Bookmark, BookmarkCollection};
use serde_json::json;
use tracing::info;

use super::{BOOKMARK_WITH_POST, first};
use crate::error::{BackendError, Result};
use crate::Backend;

impl Backend {
    /// Newest first, each with its post and the post's author.
    pub async fn bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>> {
        self.from("bookmarks")
            .select(BOOKMARK_WITH_POST)
            .eq("user_id", user_id)
            .order("created_at", false)
            .fetch()
            .await
    }

    pub async fn collections(&self, user_id: &str) -> Result<Vec<BookmarkCollection>> {
        self.from("bookmark_collections")
            .select("*")
            .eq("user_id", user_id)
            .fetch()
            .await
    }

    pub async fn create_collection(&self, user_id: &str, name: &str) -> Result<BookmarkCollection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BackendError::Invalid("Collection name cannot be empty".into()));
        }

        let mut collection: BookmarkCollection = self
            .from("bookmark_collections")
            .insert(&json!({ "user_id": user_id, "name": name }))
            .await?;
        collection.post_count = 0;
        info!("User {} created collection {}", user_id, collection.id);
        Ok(collection)
    }

    /// Move one of the user's bookmarks into a collection.
    pub async fn assign_to_collection(
        &self,
        user_id: &str,
        bookmark_id: &str,
        collection_id: &str,
    ) -> Result<Bookmark> {
        let rows: Vec<Bookmark> = self
            .from("bookmarks")
            .eq("id", bookmark_id)
            .eq("user_id", user_id)
            .update(&json!({ "collection_id": collection_id }))
            .await?;
        first(rows)
    }
}
