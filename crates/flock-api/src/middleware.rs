use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;
use uuid::Uuid;

use flock_backend::Backend;

use crate::auth::AppState;
use crate::error::ApiError;

/// The signed-in caller, as proven by their access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub username: Option<String>,
    /// Raw access token, forwarded to the backend so row-level security
    /// applies to the caller.
    pub token: String,
}

impl AuthUser {
    pub fn id_str(&self) -> String {
        self.id.to_string()
    }

    /// Backend handle acting as this user.
    pub fn backend(&self, state: &AppState) -> Backend {
        state.backend.with_token(&self.token)
    }
}

fn authenticate(state: &AppState, req: &Request) -> Option<AuthUser> {
    let bearer = req.headers().typed_get::<Authorization<Bearer>>()?;
    let token = bearer.token();
    match state.verifier.verify(token) {
        Ok(claims) => Some(AuthUser {
            id: claims.sub,
            username: claims.username().map(str::to_string),
            email: claims.email,
            token: token.to_string(),
        }),
        Err(e) => {
            debug!("Rejected access token: {}", e);
            None
        }
    }
}

/// Validate the bearer token and attach the caller, or answer 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &req).ok_or(ApiError::Unauthorized)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Attach the caller when a valid token is present; anonymous otherwise.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(user) = authenticate(&state, &req) {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}
