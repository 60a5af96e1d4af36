use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::keys::CourseKey;
use crate::security::token::AuthenticatedUser;
use crate::store::StoreError;

/// Roles that may author a course.
pub const AUTHOR_ROLES: [&str; 2] = ["instructor", "staff"];

/// A role held by a user, either on one course or, when `course_key` is empty, on every
/// course of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRole {
    pub username: String,
    pub org: String,
    #[serde(default)]
    pub course_key: Option<CourseKey>,
    pub role: String,
}

impl AccessRole {
    pub fn grants_author_access(&self, username: &str, course: &CourseKey) -> bool {
        if self.username != username || !AUTHOR_ROLES.contains(&self.role.as_str()) {
            return false;
        }

        match &self.course_key {
            Some(key) => key == course,
            None => self.org == course.org(),
        }
    }
}

#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Course and org roles only. Global staff are handled by [`authorize`].
    async fn has_author_access(
        &self,
        user: &AuthenticatedUser,
        course: &CourseKey,
    ) -> Result<bool, StoreError>;
}

pub struct MemoryAccessPolicy {
    roles: Vec<AccessRole>,
}

impl MemoryAccessPolicy {
    pub fn new(roles: Vec<AccessRole>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl AccessPolicy for MemoryAccessPolicy {
    async fn has_author_access(
        &self,
        user: &AuthenticatedUser,
        course: &CourseKey,
    ) -> Result<bool, StoreError> {
        Ok(self
            .roles
            .iter()
            .any(|r| r.grants_author_access(&user.username, course)))
    }
}

/// Proof that a user passed the author access check for a course. Only [`authorize`]
/// hands these out.
#[derive(Debug, Clone)]
pub struct CourseAuthor {
    user: AuthenticatedUser,
    course: CourseKey,
}

impl CourseAuthor {
    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn course(&self) -> &CourseKey {
        &self.course
    }
}

pub async fn authorize(
    policy: &dyn AccessPolicy,
    user: AuthenticatedUser,
    course: CourseKey,
) -> Result<CourseAuthor, ValidationError> {
    let allowed = user.is_staff || policy.has_author_access(&user, &course).await?;

    if !allowed {
        tracing::info!(user = %user.username, course = %course, "author access denied");
        return Err(ValidationError::AccessDenied {
            username: user.username,
            course: course.to_string(),
        });
    }

    Ok(CourseAuthor { user, course })
}
