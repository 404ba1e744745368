use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use flock_backend::Backend;
use flock_backend::models::{FollowOutcome, ProfileUpdate, UnfollowOutcome};
use flock_types::api::{ActionResponse, FeedPage, FollowListResponse, PageQuery, ProfileResponse};
use flock_types::models::{AuthorSummary, User};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::fallback;
use crate::middleware::AuthUser;

/// Which side of the follow graph to list.
#[derive(Debug, Clone, Copy)]
enum Direction {
    Followers,
    Following,
}

pub async fn profile(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(username): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = state.backend.user_by_username(&username).await?;

    let (is_self, is_following) = match user {
        Some(Extension(viewer)) if viewer.id_str() == profile.id => (true, false),
        Some(Extension(viewer)) => {
            let following = viewer
                .backend(&state)
                .is_following(&viewer.id_str(), &profile.id)
                .await
                .unwrap_or_else(|e| {
                    warn!("is_following failed for {}: {}", viewer.id, e);
                    false
                });
            (false, following)
        }
        None => (false, false),
    };

    Ok(Json(ProfileResponse {
        user: profile,
        is_following,
        is_self,
    }))
}

pub async fn posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Json<FeedPage> {
    let limit = query.limit.clamp(1, 50);
    match state.backend.user_posts(&username, limit, query.page).await {
        Ok(posts) => Json(FeedPage {
            has_more: posts.len() == limit as usize,
            posts,
        }),
        Err(e) => {
            warn!("user_posts for {} failed, serving sample posts: {}", username, e);
            Json(FeedPage {
                posts: fallback::posts_by_username(&username),
                has_more: false,
            })
        }
    }
}

pub async fn followers(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(username): Path<String>,
) -> Json<FollowListResponse> {
    follow_list(&state, user.map(|Extension(u)| u), &username, Direction::Followers).await
}

pub async fn following(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(username): Path<String>,
) -> Json<FollowListResponse> {
    follow_list(&state, user.map(|Extension(u)| u), &username, Direction::Following).await
}

async fn follow_list(
    state: &AppState,
    viewer: Option<AuthUser>,
    username: &str,
    direction: Direction,
) -> Json<FollowListResponse> {
    let listed = async {
        let owner = state.backend.user_by_username(username).await?;
        match direction {
            Direction::Followers => state.backend.followers(&owner.id).await,
            Direction::Following => state.backend.following(&owner.id).await,
        }
    };
    let users: Vec<AuthorSummary> = match listed.await {
        Ok(users) => users,
        Err(e) => {
            warn!("{:?} of {} failed, serving empty list: {}", direction, username, e);
            Vec::new()
        }
    };

    let following = match viewer {
        Some(viewer) => viewer_follow_map(state, &viewer, &users).await,
        None => HashMap::new(),
    };
    Json(FollowListResponse { users, following })
}

async fn viewer_follow_map(
    state: &AppState,
    viewer: &AuthUser,
    users: &[AuthorSummary],
) -> HashMap<String, bool> {
    let ids: Vec<String> = users.iter().filter_map(|u| u.id.clone()).collect();
    viewer
        .backend(state)
        .follow_status(&viewer.id_str(), &ids)
        .await
        .unwrap_or_else(|e| {
            warn!("follow_status for {} failed: {}", viewer.id, e);
            ids.into_iter().map(|id| (id, false)).collect()
        })
}

pub async fn follow(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(target_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let outcome = user.backend(&state).follow_user(&user.id_str(), &target_id).await?;
    Ok(Json(match outcome {
        FollowOutcome::Followed => ActionResponse::ok("Followed"),
        FollowOutcome::AlreadyFollowing => ActionResponse::ok("Already following"),
    }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(target_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let outcome = user
        .backend(&state)
        .unfollow_user(&user.id_str(), &target_id)
        .await?;
    Ok(Json(match outcome {
        UnfollowOutcome::Unfollowed => ActionResponse::ok("Unfollowed"),
        UnfollowOutcome::NotFollowing => ActionResponse::ok("Not following"),
    }))
}

// -- Settings --

struct ImagePart {
    content_type: String,
    bytes: Vec<u8>,
}

/// Store a profile image as `{kind}-{user}-{millis}` and return its public URL.
async fn store_image(
    backend: &Backend,
    bucket: &str,
    kind: &str,
    user_id: &str,
    image: ImagePart,
) -> ApiResult<String> {
    let name = format!("{kind}-{user_id}-{}", Utc::now().timestamp_millis());
    backend
        .upload_object(bucket, &name, image.bytes, &image.content_type)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to upload {kind}: {e}")))?;
    Ok(backend.public_url(bucket, &name))
}

/// Profile settings form: text fields plus optional `avatar` and `cover`
/// images.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<Json<User>> {
    let mut update = ProfileUpdate::default();
    let mut avatar = None;
    let mut cover = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "avatar" || name == "cover" {
            let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.body_text()))?;
            if bytes.is_empty() {
                continue;
            }
            if !content_type.starts_with("image/") {
                return Err(ApiError::Validation(format!("The {name} must be an image")));
            }
            let part = Some(ImagePart {
                content_type,
                bytes: bytes.to_vec(),
            });
            if name == "avatar" { avatar = part } else { cover = part }
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?
            .trim()
            .to_string();
        match name.as_str() {
            "name" => update.name = Some(text),
            "bio" => update.bio = Some(text),
            "location" => update.location = Some(text),
            "website" => update.website = Some(text),
            "username" if !text.is_empty() => update.username = Some(text),
            _ => {}
        }
    }

    let backend = user.backend(&state);
    let user_id = user.id_str();
    if let Some(image) = avatar {
        update.avatar_url =
            Some(store_image(&backend, &state.profile_bucket, "avatar", &user_id, image).await?);
    }
    if let Some(image) = cover {
        update.cover_url =
            Some(store_image(&backend, &state.profile_bucket, "cover", &user_id, image).await?);
    }

    let profile = backend.update_profile(&user_id, &update).await?;

    let metadata = json!({
        "name": profile.name,
        "username": profile.username,
        "avatar_url": profile.avatar_url,
    });
    if let Err(e) = state.backend.update_user_metadata(&user.token, metadata).await {
        warn!("Auth metadata update for {} failed: {}", user.id, e);
    }

    info!("{} updated their profile", user.id);
    Ok(Json(profile))
}
