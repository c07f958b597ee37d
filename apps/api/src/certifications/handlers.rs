use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::certifications::validate_certification;
use crate::errors::AppError;
use crate::models::certification::{CertificationInput, CertificationRow};
use crate::state::AppState;

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Certification {id} not found"))
}

/// GET /api/certifications
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<CertificationRow>>, AppError> {
    let rows = sqlx::query_as::<_, CertificationRow>(
        "SELECT * FROM certifications WHERE user_id = $1 ORDER BY issue_date DESC NULLS LAST, created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// POST /api/certifications
pub async fn handle_create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CertificationInput>,
) -> Result<(StatusCode, Json<CertificationRow>), AppError> {
    let input = validate_certification(input)?;
    let row = sqlx::query_as::<_, CertificationRow>(
        r#"
        INSERT INTO certifications
            (id, user_id, name, issuer, issue_date, expiry_date, credential_id, credential_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(&input.name)
    .bind(&input.issuer)
    .bind(input.issue_date)
    .bind(input.expiry_date)
    .bind(&input.credential_id)
    .bind(&input.credential_url)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/certifications/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CertificationRow>, AppError> {
    sqlx::query_as::<_, CertificationRow>(
        "SELECT * FROM certifications WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?
    .map(Json)
    .ok_or_else(|| not_found(id))
}

/// PUT /api/certifications/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CertificationInput>,
) -> Result<Json<CertificationRow>, AppError> {
    let input = validate_certification(input)?;
    sqlx::query_as::<_, CertificationRow>(
        r#"
        UPDATE certifications
        SET name = $1, issuer = $2, issue_date = $3, expiry_date = $4,
            credential_id = $5, credential_url = $6, updated_at = now()
        WHERE id = $7 AND user_id = $8
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.issuer)
    .bind(input.issue_date)
    .bind(input.expiry_date)
    .bind(&input.credential_id)
    .bind(&input.credential_url)
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?
    .map(Json)
    .ok_or_else(|| not_found(id))
}

/// DELETE /api/certifications/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM certifications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}
