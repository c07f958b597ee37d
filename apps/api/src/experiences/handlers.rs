use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::errors::AppError;
use crate::experiences::store;
use crate::experiences::validation::validate_experience;
use crate::models::experience::{ExperienceInput, ExperienceRow};
use crate::state::AppState;

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Experience {id} not found"))
}

/// GET /api/experiences
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ExperienceRow>>, AppError> {
    let rows = store::list_experiences(&state.db, user.user_id).await?;
    Ok(Json(rows))
}

/// POST /api/experiences
pub async fn handle_create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ExperienceInput>,
) -> Result<(StatusCode, Json<ExperienceRow>), AppError> {
    let input = validate_experience(input)?;
    let row = store::insert_experience(&state.db, user.user_id, &input).await?;
    tracing::info!("Created {} experience {} for user {}", input.details.kind_str(), row.id, user.user_id);
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/experiences/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ExperienceRow>, AppError> {
    store::get_experience(&state.db, user.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PUT /api/experiences/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ExperienceInput>,
) -> Result<Json<ExperienceRow>, AppError> {
    let input = validate_experience(input)?;
    store::update_experience(&state.db, user.user_id, id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/experiences/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !store::delete_experience(&state.db, user.user_id, id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}
