use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use flock_backend::BackendError;
use flock_media::MediaError;
use flock_types::api::ActionResponse;

/// Every handler failure. Rendered as an `ActionResponse` with
/// `success: false`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("You must be logged in to do that")]
    Unauthorized,

    #[error("You are not allowed to do that")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    /// A write failed upstream; the message is shown to the user as is.
    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Failed to upload media: {0}")]
    Media(#[from] MediaError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) | Self::Media(_) => StatusCode::BAD_GATEWAY,
            Self::Backend(e) => match e {
                BackendError::NotFound => StatusCode::NOT_FOUND,
                BackendError::Invalid(_) => StatusCode::BAD_REQUEST,
                BackendError::Conflict(_) => StatusCode::CONFLICT,
                BackendError::Auth(_) => StatusCode::UNAUTHORIZED,
                BackendError::Api { status: 401 | 403, .. } => StatusCode::FORBIDDEN,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client. Upstream details stay in the log.
    fn public_message(&self) -> String {
        match self {
            Self::Backend(e) => match e {
                BackendError::NotFound => "Not found".to_string(),
                BackendError::Invalid(msg) | BackendError::Conflict(msg) => msg.clone(),
                BackendError::Auth(msg) => msg.clone(),
                BackendError::Api { status: 401 | 403, .. } => {
                    "You are not allowed to do that".to_string()
                }
                _ => "Something went wrong. Please try again.".to_string(),
            },
            Self::Internal(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }

        let requires_auth = status == StatusCode::UNAUTHORIZED;
        let body = ActionResponse {
            success: false,
            message: Some(self.public_message()),
            requires_auth,
            id: None,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_backend_errors_to_statuses() {
        assert_eq!(ApiError::from(BackendError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(BackendError::Invalid("You cannot follow yourself".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(BackendError::Api {
                status: 500,
                code: None,
                message: "boom".into(),
                details: None,
                hint: None,
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn hides_upstream_details() {
        let err = ApiError::from(BackendError::Api {
            status: 400,
            code: Some("42703".into()),
            message: "column posts.secret does not exist".into(),
            details: None,
            hint: None,
        });
        assert!(!err.public_message().contains("secret"));
    }

    #[test]
    fn media_errors_keep_their_prefix() {
        let err = ApiError::from(MediaError::MissingUrl);
        assert_eq!(
            err.public_message(),
            "Failed to upload media: Failed to get upload URL from media service"
        );
    }
}
