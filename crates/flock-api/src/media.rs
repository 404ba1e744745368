use axum::{
    Json,
    extract::{Query, State},
};

use flock_media::Transformation;
use flock_types::api::{MediaKind, MediaUrlQuery, MediaUrlResponse, UploadAuthResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Delivery URL for a stored file. Images also get a blurred placeholder.
pub async fn url(
    State(state): State<AppState>,
    Query(query): Query<MediaUrlQuery>,
) -> ApiResult<Json<MediaUrlResponse>> {
    if query.path.trim().is_empty() {
        return Err(ApiError::Validation("path is required".into()));
    }

    let response = match query.kind {
        MediaKind::Video => MediaUrlResponse {
            url: state.media.video_url(&query.path),
            placeholder: None,
        },
        MediaKind::Image => {
            let mut step = Transformation::new();
            if let Some(w) = query.w {
                step = step.width(w);
            }
            if let Some(h) = query.h {
                step = step.height(h);
            }
            MediaUrlResponse {
                url: state.media.url(&query.path, &[step]),
                placeholder: Some(state.media.lqip_url(&query.path)),
            }
        }
    };
    Ok(Json(response))
}

/// Signed parameters for a direct browser upload.
pub async fn upload_auth(State(state): State<AppState>) -> ApiResult<Json<UploadAuthResponse>> {
    let auth = state.media.authentication_parameters(None, None)?;
    Ok(Json(UploadAuthResponse {
        token: auth.token,
        expire: auth.expire,
        signature: auth.signature,
        public_key: state.media.public_key().to_string(),
        url_endpoint: state.media.url_endpoint().to_string(),
    }))
}

pub async fn health() -> &'static str {
    "ok"
}
