//! Endpoints for course authors. Requests reach these handlers only after
//! [`crate::security::handle_course_author_auth`] has admitted them.

use axum::Json;
use axum::extract::{Extension, Query, State};

use crate::endpoints::AppState;
use crate::error::ValidationError;
use crate::model::report::ValidationReport;
use crate::model::request::ValidationParams;
use crate::security::access::CourseAuthor;

/// Validation report for one course. The query string picks the categories (`all`,
/// `dates`, `assignments`, `grades`, `certificates`, `updates`) and whether only graded
/// open responses count (`graded_only`).
pub async fn course_validation(
    State(state): State<AppState>,
    Extension(author): Extension<CourseAuthor>,
    Query(params): Query<ValidationParams>,
) -> Result<Json<ValidationReport>, ValidationError> {
    let request = params.resolve()?;
    let report = state.validator.generate(&author, &request).await?;
    Ok(Json(report))
}
