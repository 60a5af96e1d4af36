use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::{CourseKey, UsageKey};
use crate::model::block::Block;

/// Start date of a course.
///
/// A course created without a start date gets a platform-wide placeholder start. That
/// placeholder is kept apart from a date an author actually chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStart {
    Unset,
    Default,
    Explicit(DateTime<Utc>),
}

impl CourseStart {
    pub fn from_fields(start: Option<DateTime<Utc>>, is_default: bool) -> Self {
        match start {
            None => Self::Unset,
            Some(_) if is_default => Self::Default,
            Some(start) => Self::Explicit(start),
        }
    }

    pub fn explicit(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Explicit(start) => Some(*start),
            Self::Unset | Self::Default => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Course {
    pub id: CourseKey,
    pub display_name: Option<String>,
    pub start: CourseStart,
    pub end: Option<DateTime<Utc>>,
    pub self_paced: bool,
    pub grading_policy: GradingPolicy,
    pub certificates: Vec<CertificateDefinition>,
    pub children: Vec<UsageKey>,
}

impl Course {
    /// Builds the course view of a block, or hands the block back if it is not a course.
    pub fn from_block(block: Block) -> Result<Self, Block> {
        if block.location.block_type() != "course" {
            return Err(block);
        }

        let Block {
            location,
            fields,
            children,
        } = block;

        Ok(Self {
            id: location.course_key().clone(),
            display_name: fields.display_name,
            start: CourseStart::from_fields(fields.start, fields.start_is_default),
            end: fields.end,
            self_paced: fields.self_paced,
            grading_policy: fields.grading_policy.unwrap_or_default(),
            certificates: fields.certificates,
            children,
        })
    }

    pub fn has_start_date(&self) -> bool {
        self.start.explicit().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingPolicy {
    #[serde(rename = "GRADER", default)]
    pub graders: Vec<GraderType>,
    #[serde(rename = "GRADE_CUTOFFS", default)]
    pub grade_cutoffs: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraderType {
    #[serde(rename = "type")]
    pub assignment_type: String,
    #[serde(default)]
    pub short_label: Option<String>,
    #[serde(default)]
    pub min_count: u32,
    #[serde(default)]
    pub drop_count: u32,
    pub weight: f64,
}

impl GradingPolicy {
    /// Raw sum of the assignment type weights. A well-formed policy sums to 1.0, but
    /// nothing here enforces that.
    pub fn sum_of_weights(&self) -> f64 {
        self.graders.iter().map(|g| g.weight).sum()
    }
}

impl Default for GradingPolicy {
    fn default() -> Self {
        let grader = |assignment_type: &str, short_label: &str, min_count, drop_count, weight| {
            GraderType {
                assignment_type: assignment_type.into(),
                short_label: Some(short_label.into()),
                min_count,
                drop_count,
                weight,
            }
        };

        Self {
            graders: vec![
                grader("Homework", "HW", 12, 2, 0.15),
                grader("Lab", "Lab", 12, 2, 0.15),
                grader("Midterm Exam", "Midterm", 1, 0, 0.3),
                grader("Final Exam", "Final", 1, 0, 0.4),
            ],
            grade_cutoffs: BTreeMap::from([("Pass".to_owned(), 0.5)]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateDefinition {
    pub id: Option<u32>,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub signatories: Vec<serde_json::Value>,
}
