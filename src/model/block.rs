use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::UsageKey;
use crate::model::course::{CertificateDefinition, GradingPolicy};

/// Block type of peer-assessed open-response components.
pub const OPEN_ASSESSMENT: &str = "openassessment";

/// A node of the course content tree as the store hands it out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub location: UsageKey,
    #[serde(default)]
    pub fields: BlockFields,
    #[serde(default)]
    pub children: Vec<UsageKey>,
}

/// Every field any block type may carry. Fields that do not apply to a block type
/// stay at their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockFields {
    // Common
    pub display_name: Option<String>,
    pub visible_to_staff_only: bool,
    pub hide_from_toc: bool,
    pub due: Option<DateTime<Utc>>,
    pub graded: bool,

    // Course
    pub start: Option<DateTime<Utc>>,
    pub start_is_default: bool,
    pub end: Option<DateTime<Utc>>,
    pub self_paced: bool,
    pub grading_policy: Option<GradingPolicy>,
    pub certificates: Vec<CertificateDefinition>,

    // Open assessment, stored as free-form strings
    pub submission_start: Option<String>,
    pub submission_due: Option<String>,
    pub rubric_assessments: Vec<AssessmentWindow>,

    // Course info (updates feed)
    pub items: Vec<CourseUpdate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentWindow {
    pub name: String,
    pub start: Option<String>,
    pub due: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseUpdate {
    pub id: u32,
    pub date: String,
    pub content: String,
    pub status: String,
}

impl CourseUpdate {
    pub fn is_deleted(&self) -> bool {
        self.status == "deleted"
    }
}
