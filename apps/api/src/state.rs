use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::verifier::TokenVerifier;
use crate::company::search::SerpApiClient;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: Arc<dyn TextGenerator>,
    /// Verifies Firebase ID tokens. Tests swap in a static verifier.
    pub verifier: Arc<dyn TokenVerifier>,
    /// `None` when SERPAPI_API_KEY is unset.
    pub company_search: Option<SerpApiClient>,
}
