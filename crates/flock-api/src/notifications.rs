use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::warn;

use flock_types::api::{ActionResponse, NotificationQuery, UnreadCount};
use flock_types::models::Notification;

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::fallback;
use crate::middleware::AuthUser;

const PAGE_SIZE: u32 = 50;

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NotificationQuery>,
) -> Json<Vec<Notification>> {
    let user_id = user.id_str();
    match user
        .backend(&state)
        .notifications(&user_id, query.unread, PAGE_SIZE)
        .await
    {
        Ok(list) => Json(list),
        Err(e) => {
            warn!("notifications for {} failed, serving samples: {}", user_id, e);
            let samples = fallback::notifications(&user_id);
            Json(if query.unread {
                samples.into_iter().filter(|n| !n.seen).collect()
            } else {
                samples
            })
        }
    }
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Json<UnreadCount> {
    let count = user
        .backend(&state)
        .unread_notification_count(&user.id_str())
        .await
        .unwrap_or_else(|e| {
            warn!("unread_notification_count for {} failed: {}", user.id, e);
            0
        });
    Json(UnreadCount { count })
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    user.backend(&state)
        .mark_notification_read(&user.id_str(), &id)
        .await?;
    Ok(Json(ActionResponse::ok("Notification marked as read")))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ActionResponse>> {
    user.backend(&state)
        .mark_all_notifications_read(&user.id_str())
        .await?;
    Ok(Json(ActionResponse::ok("All notifications marked as read")))
}
