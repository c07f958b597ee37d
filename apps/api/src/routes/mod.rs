pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::certifications::handlers as certifications;
use crate::company::handlers as company;
use crate::cover_letters::handlers as cover_letters;
use crate::education::handlers as education;
use crate::experiences::handlers as experiences;
use crate::generation::handlers as generation;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/auth/register", post(auth::handle_register))
        .route("/api/auth/me", get(auth::handle_me))
        // Generation
        .route(
            "/api/generate-cover-letter",
            post(generation::handle_generate_flat),
        )
        .route(
            "/api/cover-letters/generate",
            post(generation::handle_generate),
        )
        .route(
            "/api/cover-letters/from-experiences",
            post(cover_letters::handle_generate_from_experiences),
        )
        .route("/api/company-search", post(company::handle_company_search))
        // Experiences
        .route(
            "/api/experiences",
            get(experiences::handle_list).post(experiences::handle_create),
        )
        .route(
            "/api/experiences/:id",
            get(experiences::handle_get)
                .put(experiences::handle_update)
                .delete(experiences::handle_delete),
        )
        // Education
        .route(
            "/api/education",
            get(education::handle_list).post(education::handle_create),
        )
        .route(
            "/api/education/:id",
            get(education::handle_get)
                .put(education::handle_update)
                .delete(education::handle_delete),
        )
        // Certifications
        .route(
            "/api/certifications",
            get(certifications::handle_list).post(certifications::handle_create),
        )
        .route(
            "/api/certifications/:id",
            get(certifications::handle_get)
                .put(certifications::handle_update)
                .delete(certifications::handle_delete),
        )
        // Cover letters
        .route(
            "/api/cover-letters",
            get(cover_letters::handle_list).post(cover_letters::handle_create),
        )
        .route(
            "/api/cover-letters/:id",
            get(cover_letters::handle_get)
                .put(cover_letters::handle_update)
                .delete(cover_letters::handle_delete),
        )
        .with_state(state)
}
