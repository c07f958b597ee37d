use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::cover_letters::{store, validate_cover_letter};
use crate::errors::AppError;
use crate::experiences::store::get_experiences_in_order;
use crate::generation::gateway::{generate_from_prompt_experiences, PromptExperience};
use crate::models::cover_letter::{CoverLetterInput, CoverLetterRow, CoverLetterStatus};
use crate::models::experience::ExperienceRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CoverLetterDetail {
    #[serde(flatten)]
    pub cover_letter: CoverLetterRow,
    /// Most relevant first.
    pub experiences: Vec<ExperienceRow>,
}

#[derive(Debug, Deserialize)]
pub struct FromExperiencesRequest {
    pub company_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub hiring_manager: Option<String>,
    pub job_description: String,
    #[serde(default)]
    pub experience_ids: Vec<Uuid>,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Cover letter {id} not found"))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/cover-letters
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<CoverLetterRow>>, AppError> {
    Ok(Json(store::list_cover_letters(&state.db, user.user_id).await?))
}

/// POST /api/cover-letters
///
/// Saves a letter the caller already has (e.g. the text returned by
/// `/api/cover-letters/generate`).
pub async fn handle_create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CoverLetterInput>,
) -> Result<(StatusCode, Json<CoverLetterDetail>), AppError> {
    let input = validate_cover_letter(input)?;
    let cover_letter = store::insert_cover_letter(&state.db, user.user_id, &input).await?;
    let experiences = store::linked_experiences(&state.db, cover_letter.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CoverLetterDetail {
            cover_letter,
            experiences,
        }),
    ))
}

/// GET /api/cover-letters/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CoverLetterDetail>, AppError> {
    let cover_letter = store::get_cover_letter(&state.db, user.user_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let experiences = store::linked_experiences(&state.db, id).await?;
    Ok(Json(CoverLetterDetail {
        cover_letter,
        experiences,
    }))
}

/// PUT /api/cover-letters/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CoverLetterInput>,
) -> Result<Json<CoverLetterDetail>, AppError> {
    let input = validate_cover_letter(input)?;
    let cover_letter = store::update_cover_letter(&state.db, user.user_id, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    let experiences = store::linked_experiences(&state.db, id).await?;
    Ok(Json(CoverLetterDetail {
        cover_letter,
        experiences,
    }))
}

/// DELETE /api/cover-letters/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !store::delete_cover_letter(&state.db, user.user_id, id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/cover-letters/from-experiences
///
/// Generates from the caller's stored experiences (in the order given) and
/// stores the result as a draft linked to those experiences.
pub async fn handle_generate_from_experiences(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<FromExperiencesRequest>,
) -> Result<(StatusCode, Json<CoverLetterDetail>), AppError> {
    let input = validate_cover_letter(CoverLetterInput {
        company_name: request.company_name,
        job_title: request.job_title,
        hiring_manager: request.hiring_manager,
        job_description: request.job_description,
        generated_content: None,
        status: CoverLetterStatus::Draft,
        chances: None,
        chances_explanation: None,
        experience_ids: request.experience_ids,
    })?;

    let experiences =
        get_experiences_in_order(&state.db, user.user_id, &input.experience_ids).await?;
    let prompt_experiences: Vec<PromptExperience> =
        experiences.iter().map(PromptExperience::from).collect();

    let verdict = generate_from_prompt_experiences(
        state.llm.as_ref(),
        &input.company_name,
        input.hiring_manager.as_deref(),
        &input.job_description,
        &prompt_experiences,
    )
    .await?;

    let input = CoverLetterInput {
        generated_content: Some(verdict.cover_letter),
        chances: Some(verdict.chances),
        chances_explanation: Some(verdict.chances_explanation),
        ..input
    };
    let cover_letter = store::insert_cover_letter(&state.db, user.user_id, &input).await?;
    tracing::info!(
        "Stored generated cover letter {} for user {}",
        cover_letter.id,
        user.user_id
    );

    Ok((
        StatusCode::CREATED,
        Json(CoverLetterDetail {
            cover_letter,
            experiences,
        }),
    ))
}
