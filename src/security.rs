//! Request authentication and course authorization.
//!
//! The author layer runs in front of every course-scoped endpoint. It checks the access
//! token, then the caller's author access to the course named in the path. Handlers behind
//! it read the resulting [`access::CourseAuthor`] from the request extensions.

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::endpoints::AppState;
use crate::error::ValidationError;
use crate::keys::CourseKey;
use access::authorize;
use token::token_from_headers;

pub mod access;
pub mod token;

/// Requires a valid access token (401) for an existing course id (404) that the caller may
/// author (403).
pub async fn handle_course_author_auth(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    mut request: Request,
    next: Next,
) -> Result<Response, ValidationError> {
    let token = token_from_headers(request.headers())?;
    let user = state.tokens.authenticate(token)?;

    let course = course_id
        .parse::<CourseKey>()
        .map_err(|_| ValidationError::NotFound(format!("course {course_id}")))?;

    let author = authorize(state.access.as_ref(), user, course).await?;
    request.extensions_mut().insert(author);

    Ok(next.run(request).await)
}
