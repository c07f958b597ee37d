//! Identity sync between the provider and the backend user table.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::VerifiedIdentity;
use crate::auth::users::{get_or_create_user, update_full_name};
use crate::errors::AppError;
use crate::experiences::validation::{check_max_chars, MAX_NAME_CHARS};
use crate::models::user::UserRow;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub firebase_uid: String,
    pub is_active: bool,
}

impl From<UserRow> for UserResponse {
    fn from(user: UserRow) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            firebase_uid: user.firebase_uid,
            is_active: user.is_active,
        }
    }
}

/// POST /api/auth/register
///
/// Creates the backend user for a freshly signed-in identity (or returns the
/// existing one) and applies an optional display name.
pub async fn handle_register(
    State(state): State<AppState>,
    VerifiedIdentity(claims): VerifiedIdentity,
    body: Option<Json<RegisterRequest>>,
) -> Result<Json<UserResponse>, AppError> {
    let full_name = requested_full_name(body.map(|Json(req)| req))?;
    let mut user = get_or_create_user(&state.db, &claims).await?;
    if let Some(full_name) = full_name {
        user = update_full_name(&state.db, user.id, &full_name).await?;
    }

    tracing::info!("User {} registered/authenticated", user.id);
    Ok(Json(user.into()))
}

fn requested_full_name(body: Option<RegisterRequest>) -> Result<Option<String>, AppError> {
    let full_name = body
        .and_then(|req| req.full_name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(name) = &full_name {
        check_max_chars("full_name", name, MAX_NAME_CHARS)?;
    }
    Ok(full_name)
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    VerifiedIdentity(claims): VerifiedIdentity,
) -> Result<Json<UserResponse>, AppError> {
    let user = get_or_create_user(&state.db, &claims).await?;
    Ok(Json(user.into()))
}
