use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::education::validate_education;
use crate::errors::AppError;
use crate::models::education::{EducationInput, EducationRow};
use crate::state::AppState;

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Education entry {id} not found"))
}

/// GET /api/education
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<EducationRow>>, AppError> {
    let rows = sqlx::query_as::<_, EducationRow>(
        "SELECT * FROM education WHERE user_id = $1 ORDER BY start_date DESC NULLS LAST, created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// POST /api/education
pub async fn handle_create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<EducationInput>,
) -> Result<(StatusCode, Json<EducationRow>), AppError> {
    let input = validate_education(input)?;
    let row = sqlx::query_as::<_, EducationRow>(
        r#"
        INSERT INTO education
            (id, user_id, institution, degree, field_of_study, start_date, end_date, grade, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(&input.institution)
    .bind(&input.degree)
    .bind(&input.field_of_study)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(&input.grade)
    .bind(&input.description)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/education/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EducationRow>, AppError> {
    sqlx::query_as::<_, EducationRow>("SELECT * FROM education WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PUT /api/education/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<EducationInput>,
) -> Result<Json<EducationRow>, AppError> {
    let input = validate_education(input)?;
    sqlx::query_as::<_, EducationRow>(
        r#"
        UPDATE education
        SET institution = $1, degree = $2, field_of_study = $3, start_date = $4,
            end_date = $5, grade = $6, description = $7, updated_at = now()
        WHERE id = $8 AND user_id = $9
        RETURNING *
        "#,
    )
    .bind(&input.institution)
    .bind(&input.degree)
    .bind(&input.field_of_study)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(&input.grade)
    .bind(&input.description)
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?
    .map(Json)
    .ok_or_else(|| not_found(id))
}

/// DELETE /api/education/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM education WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}
