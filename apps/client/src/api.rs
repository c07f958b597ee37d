//! Typed backend client.
//!
//! Every response passes through `execute`, the single place a 401 is turned
//! into session expiry. The bearer token is read from the store when a request
//! is built; a request already in flight keeps the token it was sent with.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::error::SessionError;
use crate::manager::SessionManager;
use crate::models::{
    CoverLetter, Experience, GenerationRequest, GenerationResponse, NewExperience,
    SaveCoverLetter, UserProfile,
};

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, session: Arc<SessionManager>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, SessionError> {
        let token = self
            .session
            .bearer_token()
            .await?
            .ok_or(SessionError::Unauthorized)?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, SessionError> {
        let response = request.send().await.map_err(|e| {
            error!("Backend request failed: {e}");
            SessionError::UpstreamFailure
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.session.handle_unauthorized().await;
            return Err(SessionError::Unauthorized);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SessionError> {
        self.execute(request).await?.json().await.map_err(|e| {
            error!("Backend returned an unreadable body: {e}");
            SessionError::UpstreamFailure
        })
    }

    /// GET /auth/me
    pub async fn me(&self) -> Result<UserProfile, SessionError> {
        let request = self.authorized(Method::GET, "auth/me").await?;
        self.json(request).await
    }

    /// POST /cover-letters/generate. Persists nothing.
    pub async fn generate_cover_letter(
        &self,
        body: &GenerationRequest,
    ) -> Result<GenerationResponse, SessionError> {
        let request = self
            .authorized(Method::POST, "cover-letters/generate")
            .await?
            .json(body);
        self.json(request).await
    }

    pub async fn list_experiences(&self) -> Result<Vec<Experience>, SessionError> {
        let request = self.authorized(Method::GET, "experiences").await?;
        self.json(request).await
    }

    pub async fn create_experience(&self, body: &NewExperience) -> Result<Experience, SessionError> {
        let request = self.authorized(Method::POST, "experiences").await?.json(body);
        self.json(request).await
    }

    pub async fn delete_experience(&self, id: Uuid) -> Result<(), SessionError> {
        let request = self
            .authorized(Method::DELETE, &format!("experiences/{id}"))
            .await?;
        self.execute(request).await?;
        Ok(())
    }

    pub async fn list_cover_letters(&self) -> Result<Vec<CoverLetter>, SessionError> {
        let request = self.authorized(Method::GET, "cover-letters").await?;
        self.json(request).await
    }

    pub async fn save_cover_letter(&self, body: &SaveCoverLetter) -> Result<CoverLetter, SessionError> {
        let request = self.authorized(Method::POST, "cover-letters").await?.json(body);
        self.json(request).await
    }
}

/// Maps a non-2xx, non-401 response. Only validation messages reach the user.
fn classify_failure(status: StatusCode, body: &str) -> SessionError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            let message = serde_json::from_str::<ErrorEnvelope>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "Invalid request".to_string());
            SessionError::InvalidRequest(message)
        }
        StatusCode::NOT_FOUND => SessionError::NotFound,
        _ => {
            error!("Backend returned {status}");
            SessionError::UpstreamFailure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::tests::{harness, FakeProvider, Harness, ID_TOKEN};
    use crate::store::SESSION_KEY;
    use crate::store::KeyValueStore;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn has_token(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {ID_TOKEN}"))
    }

    fn backend_router() -> Router {
        Router::new()
            .route(
                "/api/auth/me",
                get(|headers: HeaderMap| async move {
                    if !has_token(&headers) {
                        return (axum::http::StatusCode::UNAUTHORIZED, Json(Value::Null));
                    }
                    (
                        axum::http::StatusCode::OK,
                        Json(json!({
                            "id": "7b0c2f0e-4d4c-4d8e-9a51-3f3b0d7f1e22",
                            "email": "ada@example.com",
                            "full_name": "Ada Lovelace",
                            "firebase_uid": "uid-1",
                            "is_active": true
                        })),
                    )
                }),
            )
            .route(
                "/api/experiences",
                get(|| async {
                    // Slow enough that concurrent callers overlap.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    (axum::http::StatusCode::UNAUTHORIZED, Json(Value::Null))
                }),
            )
            .route(
                "/api/cover-letters/generate",
                post(|| async {
                    (
                        axum::http::StatusCode::BAD_REQUEST,
                        Json(json!({"error": {"code": "VALIDATION_ERROR", "message": "job_description cannot be empty"}})),
                    )
                }),
            )
            .route(
                "/api/cover-letters",
                get(|| async {
                    (
                        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": {"code": "LLM_ERROR", "message": "The text generation service failed"}})),
                    )
                }),
            )
    }

    async fn signed_in() -> (Harness, ApiClient) {
        let h = harness(FakeProvider::default());
        h.manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();
        let base = spawn_backend(backend_router()).await;
        let client = ApiClient::new(reqwest::Client::new(), base, h.manager.clone());
        (h, client)
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let (_h, client) = signed_in().await;
        let me = client.me().await.unwrap();
        assert_eq!(me.firebase_uid, "uid-1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_401s_expire_session_once() {
        let (h, client) = signed_in().await;
        let client = Arc::new(client);

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.list_experiences().await })
            })
            .collect();
        for handle in handles {
            assert!(matches!(
                handle.await.unwrap(),
                Err(SessionError::Unauthorized)
            ));
        }

        assert_eq!(h.navigator.redirects.lock().unwrap().len(), 1);
        assert_eq!(h.navigator.notices.lock().unwrap().len(), 1);
        assert!(h.store.get(SESSION_KEY).await.unwrap().is_none());
        assert!(h.manager.current_user().is_none());
    }

    #[tokio::test]
    async fn test_validation_message_surfaces() {
        let (_h, client) = signed_in().await;
        let request = GenerationRequest {
            company_name: "Acme".to_string(),
            hiring_manager: None,
            job_description: String::new(),
            experiences: vec![],
        };
        let err = client.generate_cover_letter(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "job_description cannot be empty");
    }

    #[tokio::test]
    async fn test_server_error_is_generic() {
        let (h, client) = signed_in().await;
        let err = client.list_cover_letters().await.unwrap_err();
        assert!(matches!(err, SessionError::UpstreamFailure));
        assert!(!err.to_string().contains("generation"));
        assert!(h.navigator.redirects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_session_fails_without_request() {
        let h = harness(FakeProvider::default());
        let client = ApiClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/api",
            h.manager.clone(),
        );
        assert!(matches!(client.me().await, Err(SessionError::Unauthorized)));
        assert!(h.navigator.redirects.lock().unwrap().is_empty());
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, ""),
            SessionError::NotFound
        ));
        assert!(matches!(
            classify_failure(StatusCode::UNPROCESSABLE_ENTITY, "missing field `title`"),
            SessionError::InvalidRequest(ref m) if m == "Invalid request"
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, ""),
            SessionError::UpstreamFailure
        ));
    }
}
