//! GoTrue auth endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Backend;
use crate::error::{BackendError, Result, check, check_auth};

/// The auth service's view of a user. Profile columns live in `users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Signed up and signed in.
    Session(Session),
    /// Account created; the e-mail address must be confirmed first.
    ConfirmationRequired(AuthUser),
}

impl SignUpOutcome {
    pub fn user(&self) -> &AuthUser {
        match self {
            Self::Session(session) => &session.user,
            Self::ConfirmationRequired(user) => user,
        }
    }
}

impl Backend {
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.endpoint("/auth/v1/token?grant_type=password");
        let resp = self
            .request(Method::POST, &url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: Session = check_auth(resp).await?.json().await?;
        info!("User {} signed in", session.user.id);
        Ok(session)
    }

    /// Register a user. `metadata` lands in `user_metadata`.
    pub async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUpOutcome> {
        let url = self.endpoint("/auth/v1/signup");
        let resp = self
            .request(Method::POST, &url)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body: Value = check_auth(resp).await?.json().await?;

        // With confirmations on, the body is the bare user object.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            info!("User {} registered", session.user.id);
            Ok(SignUpOutcome::Session(session))
        } else {
            let user: AuthUser = serde_json::from_value(body)?;
            info!("User {} registered, confirmation pending", user.id);
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let url = self.endpoint("/auth/v1/token?grant_type=refresh_token");
        let resp = self
            .request(Method::POST, &url)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Ok(check_auth(resp).await?.json().await?)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = self.endpoint("/auth/v1/logout");
        let resp = self
            .request_as(Method::POST, &url, access_token)
            .send()
            .await?;
        check_auth(resp).await?;
        Ok(())
    }

    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let url = self.endpoint("/auth/v1/user");
        let resp = self
            .request_as(Method::GET, &url, access_token)
            .send()
            .await?;
        Ok(check_auth(resp).await?.json().await?)
    }

    /// Merge `data` into the caller's `user_metadata`.
    pub async fn update_user_metadata(&self, access_token: &str, data: Value) -> Result<AuthUser> {
        let url = self.endpoint("/auth/v1/user");
        let resp = self
            .request_as(Method::PUT, &url, access_token)
            .json(&json!({ "data": data }))
            .send()
            .await?;
        Ok(check_auth(resp).await?.json().await?)
    }

    /// Startup probe against the auth service's health endpoint.
    pub async fn check_connection(&self) -> Result<()> {
        let url = self.endpoint("/auth/v1/health");
        let resp = self.request(Method::GET, &url).send().await?;
        check(resp).await.map_err(|e| match e {
            BackendError::Api { status, message, .. } => BackendError::Config(format!(
                "Failed to connect to backend ({status}): {message}"
            )),
            other => other,
        })?;
        debug!("Backend health check passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendConfig;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_ID: &str = "3f1c8a52-1e0b-4d8e-9a51-0c7d2b6f4e11";

    fn backend(server: &MockServer) -> Backend {
        Backend::new(BackendConfig {
            url: server.uri(),
            anon_key: "anon".into(),
        })
        .unwrap()
    }

    fn session_body() -> Value {
        json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": USER_ID, "email": "a@b.c", "user_metadata": { "username": "ann" } }
        })
    }

    #[tokio::test]
    async fn password_sign_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({ "email": "a@b.c", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let session = backend(&server).sign_in_with_password("a@b.c", "pw").await.unwrap();
        assert_eq!(session.access_token, "at");
        assert_eq!(session.user.user_metadata["username"], "ann");
    }

    #[tokio::test]
    async fn bad_credentials_are_auth_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = backend(&server).sign_in_with_password("a@b.c", "nope").await.unwrap_err();
        match err {
            BackendError::Auth(msg) => assert_eq!(msg, "Invalid login credentials"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_up_without_session_needs_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": USER_ID,
                "email": "a@b.c",
                "user_metadata": { "username": "ann", "name": "Ann" }
            })))
            .mount(&server)
            .await;

        let outcome = backend(&server)
            .sign_up("a@b.c", "pw", json!({ "username": "ann", "name": "Ann" }))
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired(_)));
        assert_eq!(outcome.user().id.to_string(), USER_ID);
    }

    #[tokio::test]
    async fn sign_out_uses_caller_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer at"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server).sign_out("at").await.unwrap();
    }

    #[tokio::test]
    async fn health_probe_failure_is_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = backend(&server).check_connection().await.unwrap_err();
        assert!(matches!(err, BackendError::Config(_)));
    }
}
