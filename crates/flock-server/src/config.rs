use std::net::SocketAddr;

use thiserror::Error;

use flock_backend::BackendConfig;
use flock_media::{DEFAULT_UPLOAD_URL, MediaConfig};

/// Secrets that ship in sample env files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "your-jwt-secret",
    "your-super-secret-jwt-token",
    "dev-secret-change-me",
    "changeme",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SUPABASE_JWT_SECRET is not set")]
    MissingJwtSecret,

    #[error("SUPABASE_JWT_SECRET still holds a placeholder value")]
    PlaceholderJwtSecret,

    #[error(
        "Missing ImageKit environment variables: {0}. Please check your .env file."
    )]
    MissingMedia(String),

    #[error("Invalid Supabase URL format. Must start with http:// or https://")]
    InvalidBackendUrl,

    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub backend: BackendConfig,
    pub jwt_secret: String,
    pub profile_bucket: String,
    pub media: MediaConfig,
    pub realtime: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let var_or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let host = var_or("FLOCK_HOST", "0.0.0.0");
        let port = var_or("FLOCK_PORT", "3000");
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "FLOCK_HOST/FLOCK_PORT",
                value: format!("{host}:{port}"),
            })?;

        let url = var_or("SUPABASE_URL", "http://localhost:54321");
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidBackendUrl);
        }

        let jwt_secret = var("SUPABASE_JWT_SECRET").ok_or(ConfigError::MissingJwtSecret)?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::PlaceholderJwtSecret);
        }

        let public_key = var("IMAGEKIT_PUBLIC_KEY");
        let private_key = var("IMAGEKIT_PRIVATE_KEY");
        let url_endpoint = var("IMAGEKIT_URL_ENDPOINT");
        let missing: Vec<&str> = [
            ("IMAGEKIT_PUBLIC_KEY", public_key.is_none()),
            ("IMAGEKIT_PRIVATE_KEY", private_key.is_none()),
            ("IMAGEKIT_URL_ENDPOINT", url_endpoint.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect();
        let (Some(public_key), Some(private_key), Some(url_endpoint)) =
            (public_key, private_key, url_endpoint)
        else {
            return Err(ConfigError::MissingMedia(missing.join(", ")));
        };

        let realtime = match var_or("FLOCK_REALTIME", "on").to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => true,
            "off" | "false" | "0" => false,
            other => {
                return Err(ConfigError::Invalid {
                    name: "FLOCK_REALTIME",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            addr,
            backend: BackendConfig {
                url,
                anon_key: var_or("SUPABASE_ANON_KEY", "your-anon-key"),
            },
            jwt_secret,
            profile_bucket: var_or("SUPABASE_PROFILE_BUCKET", "profiles"),
            media: MediaConfig {
                public_key,
                private_key,
                url_endpoint,
                upload_url: var_or("IMAGEKIT_UPLOAD_URL", DEFAULT_UPLOAD_URL),
                video_watermark: var_or("FLOCK_VIDEO_WATERMARK", "Flock"),
            },
            realtime,
        })
    }
}
