use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use flock_types::api::{AssignCollectionRequest, BookmarksResponse, CreateCollectionRequest};
use flock_types::models::{Bookmark, BookmarkCollection};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::fallback;
use crate::middleware::AuthUser;

/// Saved posts and collections. Each list falls back on its own.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Json<BookmarksResponse> {
    let user_id = user.id_str();
    let backend = user.backend(&state);
    let (bookmarks, collections) =
        tokio::join!(backend.bookmarks(&user_id), backend.collections(&user_id));

    let (bookmarks, collections) = match (bookmarks, collections) {
        (Ok(bookmarks), Ok(mut collections)) => {
            count_posts(&bookmarks, &mut collections);
            (bookmarks, collections)
        }
        (bookmarks, collections) => (
            bookmarks.unwrap_or_else(|e| {
                warn!("bookmarks for {} failed, serving samples: {}", user_id, e);
                fallback::bookmarks(&user_id)
            }),
            collections.unwrap_or_else(|e| {
                warn!("collections for {} failed, serving samples: {}", user_id, e);
                fallback::collections(&user_id)
            }),
        ),
    };

    Json(BookmarksResponse {
        bookmarks,
        collections,
    })
}

/// Collections carry no counter column; count the bookmarks filed in each.
fn count_posts(bookmarks: &[Bookmark], collections: &mut [BookmarkCollection]) {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for id in bookmarks.iter().filter_map(|b| b.collection_id.as_deref()) {
        *counts.entry(id).or_default() += 1;
    }
    for collection in collections {
        collection.post_count = counts.get(collection.id.as_str()).copied().unwrap_or(0);
    }
}

pub async fn create_collection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateCollectionRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("Collection name cannot be empty".into()));
    }
    let collection = user
        .backend(&state)
        .create_collection(&user.id_str(), &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(bookmark_id): Path<String>,
    Json(req): Json<AssignCollectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let bookmark = user
        .backend(&state)
        .assign_to_collection(&user.id_str(), &bookmark_id, &req.collection_id)
        .await?;
    Ok(Json(bookmark))
}
