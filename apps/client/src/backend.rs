//! Identity sync with the backend user table.

use async_trait::async_trait;
use serde::Serialize;
use tracing::error;

use crate::error::SessionError;
use crate::models::UserProfile;

#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Exchanges a fresh provider ID token for the backend's profile,
    /// creating the user on first contact.
    async fn register(
        &self,
        id_token: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile, SessionError>;
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BackendSession for HttpBackend {
    async fn register(
        &self,
        id_token: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile, SessionError> {
        let response = self
            .http
            .post(format!("{}/auth/register", self.base_url))
            .bearer_auth(id_token)
            .json(&RegisterBody { full_name })
            .send()
            .await
            .map_err(|e| {
                error!("Backend registration request failed: {e}");
                SessionError::UpstreamFailure
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // A token the provider just issued was refused: treat as a bad login.
            return Err(SessionError::InvalidCredentials);
        }
        if !status.is_success() {
            error!("Backend registration returned {status}");
            return Err(SessionError::UpstreamFailure);
        }
        response.json().await.map_err(|e| {
            error!("Backend registration returned an unreadable profile: {e}");
            SessionError::UpstreamFailure
        })
    }
}
