use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("media service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Failed to get upload URL from media service")]
    MissingUrl,
}

pub type Result<T> = std::result::Result<T, MediaError>;
