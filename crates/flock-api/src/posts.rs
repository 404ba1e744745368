use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use flock_backend::models::{BookmarkOutcome, LikeOutcome, RemoveBookmarkOutcome, UnlikeOutcome};
use flock_types::api::{ActionResponse, CommentRequest, FeedPage, FeedQuery, FeedTab};
use flock_types::models::{Comment, Post};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::fallback;
use crate::middleware::AuthUser;

const MAX_PAGE_SIZE: u32 = 50;

/// Home timeline. Failed reads, and an empty first page, serve the sample
/// timeline instead.
pub async fn feed(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Query(query): Query<FeedQuery>,
) -> Json<FeedPage> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let page = query.page;

    let result = match (query.tab, user.as_ref()) {
        (FeedTab::ForYou, Some(Extension(user))) => {
            user.backend(&state).feed_posts(limit, page).await
        }
        (FeedTab::ForYou, None) => state.backend.feed_posts(limit, page).await,
        (FeedTab::Following, Some(Extension(user))) => {
            user.backend(&state)
                .following_feed(&user.id_str(), limit, page)
                .await
        }
        (FeedTab::Following, None) => return Json(fallback::feed_page(page, limit)),
    };

    match result {
        Ok(posts) if posts.is_empty() && page == 0 => {
            warn!("feed_posts returned nothing, serving sample timeline");
            Json(fallback::feed_page(page, limit))
        }
        Ok(posts) => Json(FeedPage {
            has_more: posts.len() == limit as usize,
            posts,
        }),
        Err(e) => {
            warn!("feed_posts failed, serving sample timeline: {}", e);
            Json(fallback::feed_page(page, limit))
        }
    }
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Post>> {
    let post = state.backend.post_with_comments(&post_id).await?;
    Ok(Json(post))
}

pub async fn like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let outcome = user.backend(&state).like_post(&user.id_str(), &post_id).await?;
    Ok(Json(match outcome {
        LikeOutcome::Liked => ActionResponse::ok("Post liked"),
        LikeOutcome::AlreadyLiked => ActionResponse::ok("Post already liked"),
    }))
}

pub async fn unlike(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let outcome = user.backend(&state).unlike_post(&user.id_str(), &post_id).await?;
    Ok(Json(match outcome {
        UnlikeOutcome::Unliked => ActionResponse::ok("Post unliked"),
        UnlikeOutcome::NotLiked => ActionResponse::ok("Post was not liked"),
    }))
}

pub async fn repost(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let post = user.backend(&state).repost(&user.id_str(), &post_id).await?;
    info!("{} reposted {} as {}", user.id, post_id, post.id);
    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::ok("Post reposted").with_id(post.id)),
    ))
}

pub async fn comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Comment cannot be empty".into()));
    }

    let comment: Comment = user
        .backend(&state)
        .add_comment(&user.id_str(), &post_id, content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let outcome = user.backend(&state).bookmark_post(&user.id_str(), &post_id).await?;
    let message = match &outcome {
        BookmarkOutcome::Created(_) => "Post bookmarked",
        BookmarkOutcome::Existing(_) => "Post already bookmarked",
    };
    Ok(Json(ActionResponse::ok(message).with_id(outcome.id())))
}

pub async fn remove_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let outcome = user
        .backend(&state)
        .remove_bookmark(&user.id_str(), &post_id)
        .await?;
    Ok(Json(match outcome {
        RemoveBookmarkOutcome::Removed => ActionResponse::ok("Bookmark removed"),
        RemoveBookmarkOutcome::NotBookmarked => ActionResponse::ok("Post was not bookmarked"),
    }))
}
