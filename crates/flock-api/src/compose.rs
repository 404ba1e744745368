use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{error, info};

use flock_backend::models::NewPost;
use flock_media::{AspectSetting, MediaError, UploadRequest};
use flock_types::api::ActionResponse;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;

/// Folder on the CDN that holds post media.
const POST_FOLDER: &str = "/posts";

#[derive(Debug, Default)]
struct ComposeForm {
    desc: String,
    location: Option<String>,
    schedule_date: Option<String>,
    file: Option<FilePart>,
    setting: Option<AspectSetting>,
    sensitive: bool,
}

#[derive(Debug)]
struct FilePart {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

async fn read_form(mut multipart: Multipart) -> ApiResult<ComposeForm> {
    let mut form = ComposeForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    form.file = Some(FilePart {
                        name: file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                let text = text.trim().to_string();
                match name.as_str() {
                    "desc" => form.desc = text,
                    "location" if !text.is_empty() => form.location = Some(text),
                    "scheduleDate" if !text.is_empty() => form.schedule_date = Some(text),
                    "type" if !text.is_empty() => {
                        form.setting = Some(
                            serde_json::from_value(Value::String(text))
                                .map_err(|_| ApiError::Validation("Unknown image setting".into()))?,
                        )
                    }
                    "sensitive" => form.sensitive = matches!(text.as_str(), "true" | "on" | "1"),
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

/// Accepts RFC 3339 as well as what a `datetime-local` or `date` input
/// submits (read as UTC).
fn parse_schedule(raw: &str) -> ApiResult<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| ApiError::Validation("Invalid schedule date".into()))
}

/// Create a post from the compose form, uploading the attached media
/// first. Validation runs before anything leaves the server.
pub async fn create_post(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(multipart).await?;
    if form.desc.is_empty() && form.file.is_none() {
        return Err(ApiError::Validation("Post must contain text or media".into()));
    }
    let scheduled_for = form.schedule_date.as_deref().map(parse_schedule).transpose()?;

    let Some(Extension(user)) = user else {
        return Err(ApiError::Unauthorized);
    };

    let mut media_urls = Vec::new();
    let mut media_types = Vec::new();
    if let Some(file) = form.file {
        let request = UploadRequest {
            bytes: file.bytes,
            file_name: file.name,
            content_type: file.content_type,
            folder: POST_FOLDER.to_string(),
            use_unique_file_name: true,
            custom_metadata: HashMap::from([(
                "sensitive".to_string(),
                Value::String(form.sensitive.to_string()),
            )]),
            pre_transformation: form.setting,
        };
        let media_type = request.media_type();
        let uploaded = state.media.upload(request).await.map_err(|e| {
            error!("Media upload for {} failed: {}", user.id, e);
            ApiError::Media(e)
        })?;
        media_urls.push(uploaded.url.ok_or(ApiError::Media(MediaError::MissingUrl))?);
        media_types.push(media_type.to_string());
    }

    let new_post = NewPost {
        user_id: user.id_str(),
        content: form.desc,
        media_urls: Some(media_urls),
        media_types: Some(media_types),
        location: form.location,
        scheduled_for,
    };
    let post = user
        .backend(&state)
        .create_post(&new_post)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to create post: {e}")))?;

    info!("{} created post {}", user.id, post.id);
    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::ok("Post created successfully").with_id(post.id)),
    ))
}
