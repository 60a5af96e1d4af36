use serde::{Deserialize, Serialize};

use crate::keys::UsageKey;
use crate::model::block::Block;

/// Outcome of a validation run. Only the requested categories are filled in, and the
/// others are left out of the serialized body entirely.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_self_paced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dates: Option<DatesReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignments: Option<AssignmentsReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grades: Option<GradesReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificates: Option<CertificatesReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<UpdatesReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatesReport {
    pub has_start_date: bool,
    pub has_end_date: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentsReport {
    pub total_number: usize,
    pub total_visible: usize,
    pub assignments_with_dates_before_start: Vec<AssignmentSummary>,
    pub assignments_with_dates_after_end: Vec<AssignmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSummary {
    pub id: UsageKey,
    pub display_name: Option<String>,
}

impl From<&Block> for AssignmentSummary {
    fn from(block: &Block) -> Self {
        Self {
            id: block.location.clone(),
            display_name: block.fields.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradesReport {
    pub sum_of_weights: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificatesReport {
    pub is_activated: bool,
    pub has_certificate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatesReport {
    pub has_update: bool,
}
