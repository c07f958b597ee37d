//! Identity provider seam.
//!
//! `FirebaseRestProvider` talks to the identity toolkit REST API directly.
//! Federated sign-in needs an external ID token from somewhere that can show
//! a consent screen; that part sits behind `FederatedPrompt`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailInUse,

    #[error("password too weak")]
    WeakPassword,

    /// The user closed the federated consent screen.
    #[error("sign-in popup closed by user")]
    PopupClosed,

    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Tokens issued by the provider on sign-in or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTokens {
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub uid: String,
}

/// A credential from an external identity provider, e.g. Google.
#[derive(Debug, Clone)]
pub struct FederatedCredential {
    pub provider_id: String,
    pub id_token: String,
}

#[async_trait]
pub trait FederatedPrompt: Send + Sync {
    /// Returns `ProviderError::PopupClosed` when the user backs out.
    async fn obtain_credential(&self) -> Result<FederatedCredential, ProviderError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderTokens, ProviderError>;

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderTokens, ProviderError>;

    async fn sign_in_with_federated(
        &self,
        prompt: &dyn FederatedPrompt,
    ) -> Result<ProviderTokens, ProviderError>;

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    local_id: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct FirebaseRestProvider {
    http: reqwest::Client,
    api_key: String,
}

impl FirebaseRestProvider {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }

    async fn post_accounts<B: Serialize + Sync>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<ProviderTokens, ProviderError> {
        let url = format!("{IDENTITY_TOOLKIT_URL}/accounts:{method}");
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            debug!("Identity toolkit {method} failed with {status}");
            return Err(classify_error(&text));
        }

        let body: SignInResponse = response.json().await?;
        Ok(ProviderTokens {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            uid: body.local_id,
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseRestProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        self.post_accounts("signInWithPassword", &body).await
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        self.post_accounts("signUp", &body).await
    }

    async fn sign_in_with_federated(
        &self,
        prompt: &dyn FederatedPrompt,
    ) -> Result<ProviderTokens, ProviderError> {
        let credential = prompt.obtain_credential().await?;
        let body = IdpRequest {
            post_body: format!(
                "id_token={}&providerId={}",
                credential.id_token, credential.provider_id
            ),
            request_uri: "http://localhost",
            return_secure_token: true,
            return_idp_credential: true,
        };
        self.post_accounts("signInWithIdp", &body).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, ProviderError> {
        let response = self
            .http
            .post(SECURE_TOKEN_URL)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(&text));
        }

        let body: RefreshResponse = response.json().await?;
        Ok(ProviderTokens {
            id_token: body.id_token,
            refresh_token: Some(body.refresh_token),
            uid: body.user_id,
        })
    }

    /// The REST API keeps no server-side session; dropping the tokens is the
    /// whole of sign-out.
    async fn sign_out(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Maps an identity toolkit error body onto `ProviderError`.
fn classify_error(body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_default();
    // Messages look like "WEAK_PASSWORD : Password should be at least 6 characters".
    let code = message.split(&[' ', ':'][..]).next().unwrap_or_default();
    match code {
        "INVALID_PASSWORD"
        | "EMAIL_NOT_FOUND"
        | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_EMAIL"
        | "USER_DISABLED" => ProviderError::InvalidCredentials,
        "EMAIL_EXISTS" => ProviderError::EmailInUse,
        "WEAK_PASSWORD" => ProviderError::WeakPassword,
        "" => ProviderError::Rejected("unrecognized error response".to_string()),
        other => ProviderError::Rejected(other.to_string()),
    }
}
