use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{MediaError, Result};
use crate::transform::AspectSetting;
use crate::MediaClient;

/// A file to place on the CDN.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    /// Target folder, e.g. `/posts`
    pub folder: String,
    pub use_unique_file_name: bool,
    pub custom_metadata: HashMap<String, Value>,
    /// Applied at upload time; ignored for non-images.
    pub pre_transformation: Option<AspectSetting>,
}

impl UploadRequest {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// `image` or `video`, as stored in a post's `media_types`.
    pub fn media_type(&self) -> &'static str {
        if self.is_image() { "image" } else { "video" }
    }

    fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, BASE64.encode(&self.bytes))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl MediaClient {
    /// Upload a file and return the CDN's record of it. The returned `url`
    /// is always present.
    pub async fn upload(&self, req: UploadRequest) -> Result<UploadedFile> {
        let mut form = Form::new()
            .text("file", req.data_uri())
            .text("fileName", req.file_name.clone())
            .text("folder", req.folder.clone())
            .text("useUniqueFileName", req.use_unique_file_name.to_string());

        if !req.custom_metadata.is_empty() {
            form = form.text(
                "customMetadata",
                serde_json::to_string(&req.custom_metadata).unwrap_or_default(),
            );
        }
        if let Some(aspect) = req.pre_transformation.filter(|_| req.is_image()) {
            let transformation = serde_json::json!({ "pre": aspect.pre_transformation() });
            form = form.text("transformation", transformation.to_string());
        }

        let resp = self
            .http
            .post(&self.config.upload_url)
            .basic_auth(&self.config.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            error!("Media upload of {} failed: {} {}", req.file_name, status, message);
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadedFile = resp.json().await?;
        if uploaded.url.as_deref().is_none_or(str::is_empty) {
            return Err(MediaError::MissingUrl);
        }

        info!(
            "Uploaded {} ({} bytes) to {}",
            req.file_name,
            req.bytes.len(),
            uploaded.file_path
        );
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_client;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(content_type: &str) -> UploadRequest {
        UploadRequest {
            bytes: b"hello".to_vec(),
            file_name: "pic.png".into(),
            content_type: content_type.into(),
            folder: "/posts".into(),
            use_unique_file_name: true,
            custom_metadata: HashMap::from([("sensitive".to_string(), Value::from("false"))]),
            pre_transformation: Some(AspectSetting::Square),
        }
    }

    #[test]
    fn media_type_from_content_type() {
        assert_eq!(request("image/png").media_type(), "image");
        assert_eq!(request("video/mp4").media_type(), "video");
    }

    #[tokio::test]
    async fn sends_data_uri_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/upload"))
            .and(header_exists("authorization"))
            .and(body_string_contains("data:image/png;base64,aGVsbG8="))
            .and(body_string_contains("w-600,ar-1-1"))
            .and(body_string_contains("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "fileId": "f1",
                "name": "pic_abc.png",
                "url": "https://ik.imagekit.io/flock/posts/pic_abc.png",
                "filePath": "/posts/pic_abc.png",
                "fileType": "image"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let media = test_client(&format!("{}/api/v1/files/upload", server.uri()));
        let file = media.upload(request("image/png")).await.unwrap();
        assert_eq!(file.file_path, "/posts/pic_abc.png");
    }

    #[tokio::test]
    async fn videos_skip_pre_transformation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("transformation"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "fileId": "f2",
                "url": "https://ik.imagekit.io/flock/posts/clip.mp4",
                "filePath": "/posts/clip.mp4"
            })))
            .mount(&server)
            .await;

        let media = test_client(&format!("{}/upload", server.uri()));
        let file = media.upload(request("video/mp4")).await.unwrap();
        assert_eq!(file.file_id, "f2");
    }

    #[tokio::test]
    async fn missing_url_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "fileId": "f3" })))
            .mount(&server)
            .await;

        let media = test_client(&format!("{}/upload", server.uri()));
        let err = media.upload(request("image/png")).await.unwrap_err();
        assert!(matches!(err, MediaError::MissingUrl));
    }

    #[tokio::test]
    async fn api_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "message": "Your account cannot be authenticated."
            })))
            .mount(&server)
            .await;

        let media = test_client(&format!("{}/upload", server.uri()));
        let err = media.upload(request("image/png")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "media service returned 403: Your account cannot be authenticated."
        );
    }
}
