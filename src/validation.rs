//! Builds course validation reports.
//!
//! A report reads the course once, in one bulk read, and runs the requested checks on
//! the result. Only the assignments check walks below the course block.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::certificates::CertificateLookup;
use crate::error::ValidationError;
use crate::model::block::Block;
use crate::model::course::Course;
use crate::model::report::{
    AssignmentSummary, AssignmentsReport, CertificatesReport, DatesReport, GradesReport,
    UpdatesReport, ValidationReport,
};
use crate::model::request::ValidationRequest;
use crate::security::access::CourseAuthor;
use crate::store::{CourseRead, CourseStore};
use crate::updates::UpdateFeed;
use open_response::{has_window_after, has_window_before};

pub mod open_response;
pub mod timestamp;

pub struct CourseValidator {
    store: Arc<dyn CourseStore>,
    certificates: Arc<dyn CertificateLookup>,
    updates: Arc<dyn UpdateFeed>,
}

impl CourseValidator {
    pub fn new(
        store: Arc<dyn CourseStore>,
        certificates: Arc<dyn CertificateLookup>,
        updates: Arc<dyn UpdateFeed>,
    ) -> Self {
        Self {
            store,
            certificates,
            updates,
        }
    }

    /// Runs the checks named in `request` against the author's course. The bulk read is
    /// released whether or not the checks succeed.
    pub async fn generate(
        &self,
        author: &CourseAuthor,
        request: &ValidationRequest,
    ) -> Result<ValidationReport, ValidationError> {
        info!(
            course = %author.course(),
            user = %author.user().username,
            depth = request.categories.fetch_depth(),
            graded_only = request.graded_only,
            "generating validation report"
        );

        let mut reader = self.store.bulk_read(author.course()).await?;
        let outcome = self.run_checks(reader.as_mut(), author, request).await;
        let released = reader.release().await;

        if let Err(e) = &released {
            warn!(course = %author.course(), "failed to release bulk read: {e}");
        }

        let report = outcome?;
        released?;
        Ok(report)
    }

    async fn run_checks(
        &self,
        reader: &mut dyn CourseRead,
        author: &CourseAuthor,
        request: &ValidationRequest,
    ) -> Result<ValidationReport, ValidationError> {
        let categories = request.categories;
        let course = reader.get_course(categories.fetch_depth()).await?;
        debug!(
            course = %course.id,
            display_name = course.display_name.as_deref().unwrap_or_default(),
            self_paced = course.self_paced,
            "course loaded"
        );

        let mut report = ValidationReport {
            is_self_paced: course.self_paced,
            ..Default::default()
        };

        if categories.dates {
            report.dates = Some(dates_validation(&course));
        }
        if categories.assignments {
            report.assignments =
                Some(assignments_validation(reader, &course, request.graded_only).await?);
        }
        if categories.grades {
            report.grades = Some(grades_validation(&course));
        }
        if categories.certificates {
            report.certificates = Some(self.certificates_validation(&course));
        }
        if categories.updates {
            report.updates = Some(self.updates_validation(reader, &course, author).await?);
        }

        Ok(report)
    }

    fn certificates_validation(&self, course: &Course) -> CertificatesReport {
        let (is_activated, certificates) = self.certificates.is_activated(course);
        CertificatesReport {
            is_activated,
            has_certificate: !certificates.is_empty(),
        }
    }

    async fn updates_validation(
        &self,
        reader: &mut dyn CourseRead,
        course: &Course,
        author: &CourseAuthor,
    ) -> Result<UpdatesReport, ValidationError> {
        let location = course.id.updates_usage_key();
        let updates = self
            .updates
            .get_updates(reader, &location, &author.user().anonymous_id)
            .await?;

        Ok(UpdatesReport {
            has_update: !updates.is_empty(),
        })
    }
}

fn dates_validation(course: &Course) -> DatesReport {
    DatesReport {
        has_start_date: course.has_start_date(),
        has_end_date: course.end.is_some(),
    }
}

fn grades_validation(course: &Course) -> GradesReport {
    GradesReport {
        sum_of_weights: course.grading_policy.sum_of_weights(),
    }
}

/// Every child of a section counts as an assignment. Visible ones are those a learner
/// can reach through the course outline.
struct Assignments {
    total: usize,
    visible: Vec<Block>,
}

async fn collect_assignments(
    reader: &mut dyn CourseRead,
    course: &Course,
) -> Result<Assignments, ValidationError> {
    let mut total = 0;
    let mut visible = vec![];

    for section_key in &course.children {
        let section = reader.get_node(section_key).await?;
        let section_visible =
            !section.fields.visible_to_staff_only && !section.fields.hide_from_toc;

        for key in &section.children {
            let assignment = reader.get_node(key).await?;
            total += 1;
            if section_visible && !assignment.fields.visible_to_staff_only {
                visible.push(assignment);
            }
        }
    }

    Ok(Assignments { total, visible })
}

async fn assignments_validation(
    reader: &mut dyn CourseRead,
    course: &Course,
    graded_only: bool,
) -> Result<AssignmentsReport, ValidationError> {
    let Assignments { total, visible } = collect_assignments(reader, course).await?;

    let mut before_start = vec![];
    if let Some(start) = course.start.explicit() {
        for assignment in &visible {
            if assignment.fields.due.is_some_and(|due| due < start)
                || has_window_before(reader, assignment, start, graded_only).await?
            {
                before_start.push(AssignmentSummary::from(assignment));
            }
        }
    }

    let mut after_end = vec![];
    if let Some(end) = course.end {
        for assignment in &visible {
            if assignment.fields.due.is_some_and(|due| due > end)
                || has_window_after(reader, assignment, end, graded_only).await?
            {
                after_end.push(AssignmentSummary::from(assignment));
            }
        }
    }

    drop_reported_before_start(&before_start, &mut after_end);

    debug!(
        course = %course.id,
        total,
        visible = visible.len(),
        before_start = before_start.len(),
        after_end = after_end.len(),
        "assignments checked"
    );

    Ok(AssignmentsReport {
        total_number: total,
        total_visible: visible.len(),
        assignments_with_dates_before_start: before_start,
        assignments_with_dates_after_end: after_end,
    })
}

/// An assignment that falls outside both course boundaries is reported once, in the
/// before-start list. It is removed from the after-end list and the before-start list is
/// never touched.
fn drop_reported_before_start(
    before_start: &[AssignmentSummary],
    after_end: &mut Vec<AssignmentSummary>,
) {
    after_end.retain(|late| !before_start.iter().any(|early| early.id == late.id));
}
