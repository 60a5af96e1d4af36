use serde::Deserialize;

use crate::error::ValidationError;

/// Raw query string of a validation request. Values are kept as text so that bad
/// tokens can be reported back instead of being rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidationParams {
    pub all: Option<String>,
    pub dates: Option<String>,
    pub assignments: Option<String>,
    pub grades: Option<String>,
    pub certificates: Option<String>,
    pub updates: Option<String>,
    pub graded_only: Option<String>,
}

/// Which checks a report runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Categories {
    pub dates: bool,
    pub assignments: bool,
    pub grades: bool,
    pub certificates: bool,
    pub updates: bool,
}

impl Categories {
    pub fn all() -> Self {
        Self {
            dates: true,
            assignments: true,
            grades: true,
            certificates: true,
            updates: true,
        }
    }

    /// Depth the course tree is fetched at. Only the assignments check looks below the
    /// course block, and deeper fetches cost more.
    pub fn fetch_depth(&self) -> usize {
        if self.assignments { 2 } else { 0 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationRequest {
    pub categories: Categories,
    pub graded_only: bool,
}

impl ValidationParams {
    pub fn resolve(&self) -> Result<ValidationRequest, ValidationError> {
        let all = parse_bool_param("all", self.all.as_deref())?;

        let categories = Categories {
            dates: parse_bool_param("dates", self.dates.as_deref())?,
            assignments: parse_bool_param("assignments", self.assignments.as_deref())?,
            grades: parse_bool_param("grades", self.grades.as_deref())?,
            certificates: parse_bool_param("certificates", self.certificates.as_deref())?,
            updates: parse_bool_param("updates", self.updates.as_deref())?,
        };

        Ok(ValidationRequest {
            categories: if all { Categories::all() } else { categories },
            graded_only: parse_bool_param("graded_only", self.graded_only.as_deref())?,
        })
    }
}

/// Absent parameters are false.
pub fn parse_bool_param(name: &'static str, value: Option<&str>) -> Result<bool, ValidationError> {
    let Some(value) = value else {
        return Ok(false);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ValidationError::BadParameter {
            name,
            value: value.to_owned(),
        }),
    }
}
