//! Bearer-token extractors for Axum handlers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::auth::users::get_or_create_user;
use crate::auth::verifier::IdentityClaims;
use crate::errors::AppError;
use crate::state::AppState;

/// A caller whose bearer token verified. No database access.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity(pub IdentityClaims);

/// A verified caller resolved to a backend user row.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> Result<Json<()>, AppError> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for VerifiedIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = state.verifier.verify(token).await?;
        Ok(VerifiedIdentity(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let VerifiedIdentity(claims) = VerifiedIdentity::from_request_parts(parts, state).await?;
        let user = get_or_create_user(&state.db, &claims).await?;
        if !user.is_active {
            return Err(AppError::Unauthorized(format!("user {} is inactive", user.id)));
        }
        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
        })
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("expected Authorization: Bearer <token>".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let headers = HeaderMap::new();
        let result = bearer_token(&headers);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_scheme_is_unauthorized() {
        let headers = headers_with("Basic dXNlcjpwYXNz");
        assert!(matches!(
            bearer_token(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_empty_bearer_is_unauthorized() {
        let headers = headers_with("Bearer ");
        assert!(matches!(
            bearer_token(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }
}
