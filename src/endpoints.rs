//! HTTP routes. Public endpoints live here and the course-author endpoints in [`author`].

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;

use crate::security::{self, access::AccessPolicy, token::TokenDecoder};
use crate::validation::CourseValidator;

pub mod author;

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<CourseValidator>,
    pub tokens: Arc<TokenDecoder>,
    pub access: Arc<dyn AccessPolicy>,
}

pub fn router(state: AppState) -> Router {
    // Everything routed before the author layer requires author access to the course.
    let app = Router::new()
        .route(
            "/api/courses/v1/validation/{course_id}",
            get(author::course_validation),
        )
        .route(
            "/api/courses/v1/validation/{course_id}/",
            get(author::course_validation),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            security::handle_course_author_auth,
        ));

    app.route("/health", get(health)).with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}
