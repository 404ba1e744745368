//! Flock Media
//!
//! Client for the media CDN: server-side uploads, URL-embedded
//! transformations and signed parameters for direct browser uploads.
//! Nothing here touches pixels; the CDN does all processing.

pub mod error;
pub mod signature;
pub mod transform;
pub mod upload;

use std::sync::Arc;

pub use error::{MediaError, Result};
pub use signature::UploadAuth;
pub use transform::{AspectSetting, Transformation};
pub use upload::{UploadRequest, UploadedFile};

pub const DEFAULT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub public_key: String,
    pub private_key: String,
    /// Delivery base, e.g. `https://ik.imagekit.io/flock`
    pub url_endpoint: String,
    pub upload_url: String,
    /// Text burned into delivered videos.
    pub video_watermark: String,
}

#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    config: Arc<MediaConfig>,
}

impl MediaClient {
    pub fn new(config: MediaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("flock/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(MediaConfig {
                url_endpoint: config.url_endpoint.trim_end_matches('/').to_string(),
                ..config
            }),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.config.public_key
    }

    pub fn url_endpoint(&self) -> &str {
        &self.config.url_endpoint
    }
}

#[cfg(test)]
pub(crate) fn test_client(upload_url: &str) -> MediaClient {
    MediaClient::new(MediaConfig {
        public_key: "public_test".into(),
        private_key: "private_test".into(),
        url_endpoint: "https://ik.imagekit.io/flock/".into(),
        upload_url: upload_url.into(),
        video_watermark: "Flock".into(),
    })
    .unwrap()
}
