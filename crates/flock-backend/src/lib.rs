pub mod auth;
pub mod error;
pub mod models;
pub mod query;
pub mod queries;
pub mod storage;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use tracing::info;

pub use error::{BackendError, Result};
pub use query::Query;

/// Connection settings for the backend-as-a-service project.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: String,
}

/// Handle to the remote backend. Cheap to clone; every clone shares one
/// connection pool.
///
/// Requests go out with the anon key as bearer unless the handle was
/// scoped to a caller with [`Backend::with_token`], in which case row-level
/// security on the backend sees that user.
#[derive(Clone)]
pub struct Backend {
    http: reqwest::Client,
    config: Arc<BackendConfig>,
    bearer: Option<Arc<str>>,
}

impl Backend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let url = config.url.trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BackendError::Config(format!(
                "Invalid Supabase URL format: {url}. Must start with http:// or https://"
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("flock/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!("Backend client configured for {}", url);
        Ok(Self {
            http,
            config: Arc::new(BackendConfig {
                url,
                anon_key: config.anon_key,
            }),
            bearer: None,
        })
    }

    /// Same client, authenticated as the holder of `token`.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            bearer: Some(Arc::from(token)),
        }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn anon_key(&self) -> &str {
        &self.config.anon_key
    }

    /// Start a query against a table.
    pub fn from(&self, table: &str) -> Query<'_> {
        Query::new(self, table)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url, path)
    }

    /// A request carrying the `apikey` header and the current bearer token.
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.bearer.as_deref().unwrap_or(&self.config.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    /// Same as [`Backend::request`] but with an explicit bearer.
    pub(crate) fn request_as(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_urls_without_scheme() {
        let err = Backend::new(BackendConfig {
            url: "localhost:54321".into(),
            anon_key: "anon".into(),
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("Invalid Supabase URL format"));
    }

    #[test]
    fn trims_trailing_slash() {
        let backend = Backend::new(BackendConfig {
            url: "http://localhost:54321/".into(),
            anon_key: "anon".into(),
        })
        .unwrap();
        assert_eq!(backend.endpoint("/rest/v1/posts"), "http://localhost:54321/rest/v1/posts");
    }
}
