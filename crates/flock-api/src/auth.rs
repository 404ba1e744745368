use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::{info, warn};

use flock_backend::auth::{AuthUser as AccountUser, Session, SignUpOutcome};
use flock_backend::{Backend, BackendError};
use flock_gateway::TokenVerifier;
use flock_media::MediaClient;
use flock_types::api::{
    ActionResponse, RefreshRequest, SessionResponse, SessionUser, SignInRequest, SignUpRequest,
    SignUpResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub backend: Backend,
    pub media: MediaClient,
    pub verifier: TokenVerifier,
    /// Storage bucket holding avatars and covers.
    pub profile_bucket: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim();
    if req.email.trim().is_empty() || req.password.is_empty() || username.is_empty() {
        return Err(ApiError::Validation(
            "Email, password and username are required".into(),
        ));
    }
    if username.contains(char::is_whitespace) {
        return Err(ApiError::Validation("Username cannot contain spaces".into()));
    }

    // A failed lookup does not block signup; the backend still enforces
    // uniqueness on the profile row.
    match state.backend.username_taken(username, None).await {
        Ok(true) => return Err(ApiError::Conflict("Username already taken".into())),
        Ok(false) => {}
        Err(e) => warn!("Username check for {} failed: {}", username, e),
    }

    let metadata = json!({ "username": username, "name": req.name.trim() });
    let outcome = state
        .backend
        .sign_up(req.email.trim(), &req.password, metadata)
        .await
        .map_err(|e| match e {
            BackendError::Auth(msg) => ApiError::Validation(msg),
            other => ApiError::Backend(other),
        })?;

    let confirmation_required = matches!(outcome, SignUpOutcome::ConfirmationRequired(_));
    let user_id = outcome.user().id;
    info!("New account {} ({})", username, user_id);

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            message: "Signup successful! You can now log in.".into(),
            user_id,
            confirmation_required,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state
        .backend
        .sign_in_with_password(req.email.trim(), &req.password)
        .await?;
    let profile_backend = state.backend.with_token(&session.access_token);
    let user = merge_profile(&profile_backend, session.user.clone()).await;
    Ok(Json(session_response(session, user)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.backend.refresh_session(&req.refresh_token).await?;
    let profile_backend = state.backend.with_token(&session.access_token);
    let user = merge_profile(&profile_backend, session.user.clone()).await;
    Ok(Json(session_response(session, user)))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ActionResponse>> {
    state.backend.sign_out(&user.token).await?;
    info!("User {} signed out", user.id);
    Ok(Json(ActionResponse::ok("Signed out")))
}

/// The caller's auth record merged with their profile row.
pub async fn session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<SessionResponse>> {
    let account = state.backend.get_user(&user.token).await?;
    let merged = merge_profile(&user.backend(&state), account).await;
    Ok(Json(SessionResponse {
        access_token: None,
        refresh_token: None,
        expires_in: None,
        user: merged,
    }))
}

/// A missing or unreadable profile leaves the auth record on its own.
async fn merge_profile(backend: &Backend, account: AccountUser) -> SessionUser {
    let profile = match backend.user_by_id(&account.id.to_string()).await {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!("Profile fetch for {} failed: {}", account.id, e);
            None
        }
    };
    SessionUser {
        id: account.id,
        email: account.email,
        user_metadata: account.user_metadata,
        profile,
    }
}

fn session_response(session: Session, user: SessionUser) -> SessionResponse {
    SessionResponse {
        access_token: Some(session.access_token),
        refresh_token: Some(session.refresh_token),
        expires_in: Some(session.expires_in),
        user,
    }
}
