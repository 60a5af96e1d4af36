use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::model::block::{Block, OPEN_ASSESSMENT};
use crate::store::CourseRead;
use crate::validation::timestamp::parse_loose;

/// A course boundary that open-response windows must not cross.
#[derive(Debug, Clone, Copy)]
pub enum Boundary {
    Before(DateTime<Utc>),
    After(DateTime<Utc>),
}

impl Boundary {
    fn crossed_by(&self, at: DateTime<Utc>) -> bool {
        match self {
            Self::Before(start) => at < *start,
            Self::After(end) => at > *end,
        }
    }
}

pub async fn has_window_before(
    reader: &mut dyn CourseRead,
    assignment: &Block,
    start: DateTime<Utc>,
    graded_only: bool,
) -> Result<bool, ValidationError> {
    has_window_crossing(reader, assignment, Boundary::Before(start), graded_only).await
}

pub async fn has_window_after(
    reader: &mut dyn CourseRead,
    assignment: &Block,
    end: DateTime<Utc>,
    graded_only: bool,
) -> Result<bool, ValidationError> {
    has_window_crossing(reader, assignment, Boundary::After(end), graded_only).await
}

async fn has_window_crossing(
    reader: &mut dyn CourseRead,
    assignment: &Block,
    boundary: Boundary,
    graded_only: bool,
) -> Result<bool, ValidationError> {
    for component in open_responses(reader, assignment).await? {
        if graded_only && !component.fields.graded {
            continue;
        }
        if window_crosses(&component, boundary)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Open-response components two levels below an assignment (assignment -> unit ->
/// component).
async fn open_responses(
    reader: &mut dyn CourseRead,
    assignment: &Block,
) -> Result<Vec<Block>, ValidationError> {
    let mut components = Vec::new();

    for unit_key in &assignment.children {
        let unit = reader.get_node(unit_key).await?;
        for key in unit.children.iter().filter(|k| k.block_type() == OPEN_ASSESSMENT) {
            components.push(reader.get_node(key).await?);
        }
    }

    Ok(components)
}

fn window_crosses(component: &Block, boundary: Boundary) -> Result<bool, ValidationError> {
    let fields = &component.fields;

    let mut stamps = vec![
        ("submission_start", fields.submission_start.as_deref()),
        ("submission_due", fields.submission_due.as_deref()),
    ];
    for assessment in &fields.rubric_assessments {
        stamps.push(("assessment start", assessment.start.as_deref()));
        stamps.push(("assessment due", assessment.due.as_deref()));
    }

    for (field, value) in stamps {
        // Unset windows never count against the course dates.
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            continue;
        };

        let at = parse_loose(value).ok_or_else(|| ValidationError::MalformedTimestamp {
            location: component.location.clone(),
            field: field.to_owned(),
            value: value.to_owned(),
        })?;

        if boundary.crossed_by(at) {
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::block::AssessmentWindow;
    use crate::store::CourseStore;
    use crate::store::memory::MemoryCourseStore;
    use crate::testing::{CourseBuilder, OpenResponse, utc};

    async fn check(
        course: &CourseBuilder,
        assignment: &str,
        boundary: Boundary,
        graded_only: bool,
    ) -> Result<bool, ValidationError> {
        let store = MemoryCourseStore::new(course.blocks());
        let mut reader = store.bulk_read(course.key()).await.unwrap();
        let block = reader.get_node(&course.assignment_key(assignment)).await.unwrap();
        match boundary {
            Boundary::Before(start) => {
                has_window_before(reader.as_mut(), &block, start, graded_only).await
            }
            Boundary::After(end) => {
                has_window_after(reader.as_mut(), &block, end, graded_only).await
            }
        }
    }

    fn course_with(ora: OpenResponse) -> CourseBuilder {
        let mut course = CourseBuilder::new("course-v1:edX+DemoX+2024");
        course.section("week1").assignment("hw1").open_response(ora);
        course
    }

    #[tokio::test]
    async fn submission_window_before_start() {
        let course = course_with(OpenResponse {
            submission_start: Some("2024-01-01T00:00".into()),
            ..Default::default()
        });

        let start = utc(2024, 1, 10);
        assert!(check(&course, "hw1", Boundary::Before(start), false).await.unwrap());
        assert!(!check(&course, "hw1", Boundary::Before(utc(2023, 12, 1)), false).await.unwrap());
    }

    #[tokio::test]
    async fn assessment_window_after_end() {
        let course = course_with(OpenResponse {
            graded: true,
            rubric_assessments: vec![AssessmentWindow {
                name: "peer-assessment".into(),
                start: Some("2024-03-01T00:00:00+00:00".into()),
                due: Some("2024-07-01T00:00:00+00:00".into()),
            }],
            ..Default::default()
        });

        let end = utc(2024, 6, 1);
        assert!(check(&course, "hw1", Boundary::After(end), true).await.unwrap());
    }

    #[tokio::test]
    async fn ungraded_components_are_skipped_in_graded_mode() {
        let course = course_with(OpenResponse {
            graded: false,
            submission_due: Some("2024-01-02".into()),
            ..Default::default()
        });

        let start = utc(2024, 1, 10);
        assert!(check(&course, "hw1", Boundary::Before(start), false).await.unwrap());
        assert!(!check(&course, "hw1", Boundary::Before(start), true).await.unwrap());
    }

    #[tokio::test]
    async fn empty_and_missing_windows_are_ignored() {
        let course = course_with(OpenResponse {
            submission_start: Some(String::new()),
            rubric_assessments: vec![AssessmentWindow {
                name: "self-assessment".into(),
                start: None,
                due: Some("  ".into()),
            }],
            ..Default::default()
        });

        assert!(!check(&course, "hw1", Boundary::Before(utc(2030, 1, 1)), false).await.unwrap());
    }

    #[tokio::test]
    async fn unparseable_window_is_an_error() {
        let course = course_with(OpenResponse {
            submission_due: Some("sometime in spring".into()),
            ..Default::default()
        });

        let err = check(&course, "hw1", Boundary::Before(utc(2024, 1, 10)), false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedTimestamp { ref field, .. } if field == "submission_due"
        ));
    }
}
