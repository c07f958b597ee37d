use axum::{extract::State, Json};

use crate::auth::extractor::VerifiedIdentity;
use crate::company::search::{research_company, CompanySearchRequest, CompanySearchResponse};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/company-search
pub async fn handle_company_search(
    State(state): State<AppState>,
    VerifiedIdentity(_identity): VerifiedIdentity,
    Json(request): Json<CompanySearchRequest>,
) -> Result<Json<CompanySearchResponse>, AppError> {
    let company_name = request.company_name.trim();
    if company_name.is_empty() {
        return Err(AppError::Validation("company_name cannot be empty".to_string()));
    }
    let search = state
        .company_search
        .as_ref()
        .ok_or_else(|| AppError::Validation("company search is not configured".to_string()))?;

    let results = search.search_company(company_name).await;
    let response = research_company(
        state.llm.as_ref(),
        company_name,
        request.job_description.as_deref(),
        results,
    )
    .await;
    Ok(Json(response))
}
