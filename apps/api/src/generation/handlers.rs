//! Axum route handlers for the Generation Gateway.

use axum::{extract::State, Json};

use crate::auth::extractor::VerifiedIdentity;
use crate::errors::AppError;
use crate::generation::gateway::{
    generate_cover_letter, write_cover_letter, FlatGenerateRequest, FlatGenerateResponse,
    GenerationRequest, GenerationResponse,
};
use crate::state::AppState;

/// POST /api/generate-cover-letter
///
/// `{jobDescription, experiences: [{title, company, description}]}` → `{coverLetter}`.
pub async fn handle_generate_flat(
    State(state): State<AppState>,
    VerifiedIdentity(identity): VerifiedIdentity,
    Json(request): Json<FlatGenerateRequest>,
) -> Result<Json<FlatGenerateResponse>, AppError> {
    tracing::debug!("Flat generation requested by {}", identity.uid);
    let cover_letter = write_cover_letter(state.llm.as_ref(), &request).await?;
    Ok(Json(FlatGenerateResponse { cover_letter }))
}

/// POST /api/cover-letters/generate
///
/// Returns `{cover_letter, chances, chances_explanation}`. Persists nothing.
pub async fn handle_generate(
    State(state): State<AppState>,
    VerifiedIdentity(identity): VerifiedIdentity,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, AppError> {
    tracing::debug!("Structured generation requested by {}", identity.uid);
    let response = generate_cover_letter(state.llm.as_ref(), &request).await?;
    Ok(Json(response))
}
