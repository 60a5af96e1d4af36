//! Opaque course and block identifiers.
//!
//! Courses are addressed as `course-v1:{org}+{course}+{run}` and blocks inside them as
//! `block-v1:{org}+{course}+{run}+type@{block_type}+block@{block_id}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const COURSE_PREFIX: &str = "course-v1:";
const BLOCK_PREFIX: &str = "block-v1:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid key: {0}")]
pub struct InvalidKey(pub String);

fn valid_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '~' | '.' | ':'))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseKey {
    org: String,
    course: String,
    run: String,
}

impl CourseKey {
    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn make_usage_key(&self, block_type: &str, block_id: &str) -> UsageKey {
        UsageKey {
            course: self.clone(),
            block_type: block_type.to_owned(),
            block_id: block_id.to_owned(),
        }
    }

    /// The location of the course block itself.
    pub fn course_usage_key(&self) -> UsageKey {
        self.make_usage_key("course", "course")
    }

    /// The location of the block holding the course update feed.
    pub fn updates_usage_key(&self) -> UsageKey {
        self.make_usage_key("course_info", "updates")
    }

    fn parse_parts(body: &str, original: &str) -> Result<Self, InvalidKey> {
        let [org, course, run] = &body.split('+').collect::<Vec<&str>>()[..] else {
            return Err(InvalidKey(original.to_owned()));
        };

        if ![org, course, run].iter().all(|p| valid_part(p)) {
            return Err(InvalidKey(original.to_owned()));
        }

        Ok(Self {
            org: (*org).to_owned(),
            course: (*course).to_owned(),
            run: (*run).to_owned(),
        })
    }
}

impl FromStr for CourseKey {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(body) = s.strip_prefix(COURSE_PREFIX) else {
            return Err(InvalidKey(s.to_owned()));
        };
        Self::parse_parts(body, s)
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COURSE_PREFIX}{}+{}+{}", self.org, self.course, self.run)
    }
}

impl TryFrom<String> for CourseKey {
    type Error = InvalidKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CourseKey> for String {
    fn from(value: CourseKey) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsageKey {
    course: CourseKey,
    block_type: String,
    block_id: String,
}

impl UsageKey {
    pub fn course_key(&self) -> &CourseKey {
        &self.course
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }
}

impl FromStr for UsageKey {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidKey(s.to_owned());

        let body = s.strip_prefix(BLOCK_PREFIX).ok_or_else(invalid)?;
        let (rest, block_id) = body.rsplit_once("+block@").ok_or_else(invalid)?;
        let (course_part, block_type) = rest.rsplit_once("+type@").ok_or_else(invalid)?;

        if !valid_part(block_type) || !valid_part(block_id) {
            return Err(invalid());
        }

        Ok(Self {
            course: CourseKey::parse_parts(course_part, s)?,
            block_type: block_type.to_owned(),
            block_id: block_id.to_owned(),
        })
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{BLOCK_PREFIX}{}+{}+{}+type@{}+block@{}",
            self.course.org, self.course.course, self.course.run, self.block_type, self.block_id
        )
    }
}

impl TryFrom<String> for UsageKey {
    type Error = InvalidKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsageKey> for String {
    fn from(value: UsageKey) -> Self {
        value.to_string()
    }
}
