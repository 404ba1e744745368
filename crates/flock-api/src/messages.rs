use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};

use flock_backend::queries::group_conversations;
use flock_types::api::{ConversationsResponse, SendMessageRequest};
use flock_types::models::Message;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::fallback;
use crate::middleware::AuthUser;

pub async fn conversations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Json<ConversationsResponse> {
    let user_id = user.id_str();
    let conversations = match user.backend(&state).messages_for(&user_id).await {
        Ok(messages) => group_conversations(&user_id, messages),
        Err(e) => {
            warn!("messages_for {} failed, serving sample conversations: {}", user_id, e);
            fallback::conversations(&user_id)
        }
    };
    Json(ConversationsResponse { conversations })
}

/// The thread with one counterpart, oldest first. Opening it marks the
/// caller's unread messages as read.
pub async fn thread(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(other_id): Path<String>,
) -> Json<Vec<Message>> {
    let user_id = user.id_str();
    let backend = user.backend(&state);

    let messages = match backend.conversation(&user_id, &other_id).await {
        Ok(messages) => messages,
        Err(e) => {
            warn!("conversation {} <-> {} failed, serving sample thread: {}", user_id, other_id, e);
            return Json(fallback::thread(&user, &other_id));
        }
    };

    let unread: Vec<String> = messages
        .iter()
        .filter(|m| m.receiver_id == user_id && !m.is_read)
        .map(|m| m.id.clone())
        .collect();
    if !unread.is_empty() {
        match backend.mark_messages_read(&unread).await {
            Ok(()) => debug!("Marked {} messages read for {}", unread.len(), user_id),
            Err(e) => warn!("mark_messages_read for {} failed: {}", user_id, e),
        }
    }

    Json(messages)
}

pub async fn send(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(receiver_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Message cannot be empty".into()));
    }

    let message = user
        .backend(&state)
        .send_message(&user.id_str(), &receiver_id, content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
