use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::warn;

use flock_backend::queries::split_memberships;
use flock_types::api::{ActionResponse, CommunitiesResponse};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::fallback;
use crate::middleware::AuthUser;

pub async fn list(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> Json<CommunitiesResponse> {
    let communities = match state.backend.communities().await {
        Ok(communities) => communities,
        Err(e) => {
            warn!("communities failed, serving samples: {}", e);
            return Json(CommunitiesResponse {
                discover: fallback::communities(),
                mine: Vec::new(),
            });
        }
    };

    let member_of = match user {
        Some(Extension(user)) => user
            .backend(&state)
            .memberships(&user.id_str())
            .await
            .unwrap_or_else(|e| {
                warn!("memberships for {} failed: {}", user.id, e);
                HashSet::new()
            }),
        None => HashSet::new(),
    };

    let (discover, mine) = split_memberships(communities, &member_of);
    Json(CommunitiesResponse { discover, mine })
}

pub async fn join(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(community_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    user.backend(&state)
        .join_community(&user.id_str(), &community_id)
        .await?;
    Ok(Json(ActionResponse::ok("Joined community")))
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(community_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    user.backend(&state)
        .leave_community(&user.id_str(), &community_id)
        .await?;
    Ok(Json(ActionResponse::ok("Left community")))
}
