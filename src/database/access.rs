use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::keys::CourseKey;
use crate::security::access::{AUTHOR_ROLES, AccessPolicy, AccessRole};
use crate::security::token::AuthenticatedUser;
use crate::store::StoreError;

/// Author roles stored in `coursecheck.course_access_role`.
#[derive(Clone)]
pub struct PgAccessPolicy {
    pool: PgPool,
}

impl PgAccessPolicy {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds roles that are not stored yet. Importing the same seed twice changes nothing.
    pub async fn import(&self, roles: &[AccessRole]) -> Result<(), StoreError> {
        let mut transaction = self.pool.begin().await?;

        for role in distinct_roles(roles) {
            sqlx::query(
                "INSERT INTO coursecheck.course_access_role (username, org, course_key, role)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT DO NOTHING;",
            )
            .bind(&role.username)
            .bind(&role.org)
            .bind(role.course_key.as_ref().map(ToString::to_string))
            .bind(&role.role)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl AccessPolicy for PgAccessPolicy {
    async fn has_author_access(
        &self,
        user: &AuthenticatedUser,
        course: &CourseKey,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS (
                SELECT 1 FROM coursecheck.course_access_role
                WHERE username = $1
                AND role = ANY($2)
                AND (course_key = $3 OR (course_key IS NULL AND org = $4))
            ) AS allowed;",
        )
        .bind(&user.username)
        .bind(AUTHOR_ROLES.to_vec())
        .bind(course.to_string())
        .bind(course.org())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("allowed")?)
    }
}

fn distinct_roles(roles: &[AccessRole]) -> Vec<&AccessRole> {
    let mut distinct: Vec<&AccessRole> = Vec::with_capacity(roles.len());
    for role in roles {
        if !distinct.contains(&role) {
            distinct.push(role);
        }
    }
    distinct
}
