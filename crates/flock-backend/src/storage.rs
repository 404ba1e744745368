//! Object storage for profile images.

use reqwest::{Method, header};
use tracing::info;

use crate::Backend;
use crate::error::{Result, check};

impl Backend {
    /// Store `bytes` as `bucket/name`. Returns the object key.
    pub async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let url = self.endpoint(&format!("/storage/v1/object/{bucket}/{name}"));
        let size = bytes.len();
        let resp = self
            .request(Method::POST, &url)
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check(resp).await?;

        info!("Stored {}/{} ({} bytes)", bucket, name, size);
        Ok(format!("{bucket}/{name}"))
    }

    /// Public URL of an object in a public bucket. No request is made.
    pub fn public_url(&self, bucket: &str, name: &str) -> String {
        self.endpoint(&format!("/storage/v1/object/public/{bucket}/{name}"))
    }
}
