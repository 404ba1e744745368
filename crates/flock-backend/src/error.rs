use reqwest::Response;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend configuration: {0}")]
    Config(String),

    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("no matching row")]
    NotFound,

    #[error("unexpected backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// A business rule rejected the input before it reached the backend.
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// PostgREST code for "single object requested, zero rows returned".
const NO_ROWS: &str = "PGRST116";

/// Pass successful responses through; turn error bodies into
/// [`BackendError::Api`] (or `NotFound` for an empty single-row select).
pub(crate) async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let err = api_error(status.as_u16(), &body);
    if let BackendError::Api { code: Some(code), .. } = &err {
        if code == NO_ROWS {
            return Err(BackendError::NotFound);
        }
    }
    Err(err)
}

/// Same as [`check`] but rejected credentials become [`BackendError::Auth`].
pub(crate) async fn check_auth(resp: Response) -> Result<Response> {
    let status = resp.status().as_u16();
    match check(resp).await {
        Err(BackendError::Api { message, .. }) if matches!(status, 400 | 401 | 403 | 422) => {
            Err(BackendError::Auth(message))
        }
        other => other,
    }
}

/// Error bodies differ between the table, auth and storage APIs; read
/// whichever fields are present.
fn api_error(status: u16, body: &str) -> BackendError {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let text = |key: &str| json.get(key).and_then(Value::as_str).map(str::to_string);

    let code = text("code")
        .or_else(|| text("error_code"))
        .or_else(|| json.get("code").and_then(Value::as_i64).map(|c| c.to_string()));
    let message = text("message")
        .or_else(|| text("msg"))
        .or_else(|| text("error_description"))
        .or_else(|| text("error"))
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.chars().take(200).collect()
            }
        });

    BackendError::Api {
        status,
        code,
        message,
        details: text("details"),
        hint: text("hint"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_postgrest_error_body() {
        let err = api_error(
            400,
            r#"{"code":"42703","message":"column posts.nope does not exist","details":null,"hint":"Perhaps you meant posts.note"}"#,
        );
        match err {
            BackendError::Api { status, code, message, hint, .. } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("42703"));
                assert!(message.contains("does not exist"));
                assert_eq!(hint.as_deref(), Some("Perhaps you meant posts.note"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reads_auth_error_body() {
        let err = api_error(
            400,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        match err {
            BackendError::Api { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("invalid_credentials"));
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_raw_body() {
        let err = api_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "backend returned 502: Bad Gateway");
    }
}
