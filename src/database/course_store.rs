//! Course content kept in the `coursecheck.course_blocks` table.
//!
//! A bulk read is one read-only, repeatable-read transaction. Everything it loads is
//! cached for the life of the transaction, so a block is queried at most once per report.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::keys::{CourseKey, UsageKey};
use crate::model::block::{Block, BlockFields};
use crate::model::course::Course;
use crate::store::{CourseRead, CourseStore, StoreError, ensure_in_scope, into_course};

#[derive(Clone)]
pub struct PgCourseStore {
    pool: PgPool,
}

impl PgCourseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces blocks. Used to load seed data into a fresh database.
    pub async fn import(&self, blocks: &[Block]) -> Result<(), StoreError> {
        let mut transaction = self.pool.begin().await?;

        for block in blocks {
            sqlx::query(
                "INSERT INTO coursecheck.course_blocks (usage_key, course_key, block_type, fields, children)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (usage_key) DO UPDATE
                SET fields = EXCLUDED.fields, children = EXCLUDED.children;",
            )
            .bind(block.location.to_string())
            .bind(block.location.course_key().to_string())
            .bind(block.location.block_type())
            .bind(Json(&block.fields))
            .bind(block.children.iter().map(ToString::to_string).collect::<Vec<_>>())
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CourseStore for PgCourseStore {
    async fn bulk_read(&self, course: &CourseKey) -> Result<Box<dyn CourseRead>, StoreError> {
        let mut transaction = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY;")
            .execute(&mut *transaction)
            .await?;

        Ok(Box::new(PgBulkRead {
            course: course.clone(),
            transaction,
            cache: HashMap::new(),
        }))
    }
}

struct PgBulkRead {
    course: CourseKey,
    transaction: Transaction<'static, Postgres>,
    cache: HashMap<UsageKey, Block>,
}

impl PgBulkRead {
    /// Loads every block in `locations` that is not cached yet.
    async fn load(&mut self, locations: &[UsageKey]) -> Result<(), StoreError> {
        let missing = locations
            .iter()
            .filter(|l| !self.cache.contains_key(*l))
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        if missing.is_empty() {
            return Ok(());
        }

        let rows = sqlx::query(
            "SELECT usage_key, fields, children FROM coursecheck.course_blocks
            WHERE course_key = $1 AND usage_key = ANY($2);",
        )
        .bind(self.course.to_string())
        .bind(&missing)
        .fetch_all(&mut *self.transaction)
        .await?;

        debug!(
            course = %self.course,
            requested = missing.len(),
            found = rows.len(),
            "loaded blocks"
        );

        for row in rows {
            let block = block_from_row(&row)?;
            self.cache.insert(block.location.clone(), block);
        }

        Ok(())
    }
}

#[async_trait]
impl CourseRead for PgBulkRead {
    async fn get_course(&mut self, depth: usize) -> Result<Course, StoreError> {
        let location = self.course.course_usage_key();
        self.load(std::slice::from_ref(&location)).await?;

        let block = self
            .cache
            .get(&location)
            .cloned()
            .ok_or_else(|| StoreError::CourseNotFound(self.course.clone()))?;

        let mut level = block.children.clone();
        for _ in 0..depth {
            if level.is_empty() {
                break;
            }
            self.load(&level).await?;
            level = next_level(&self.cache, &level);
        }

        into_course(block)
    }

    async fn get_node(&mut self, location: &UsageKey) -> Result<Block, StoreError> {
        ensure_in_scope(&self.course, location)?;
        self.load(std::slice::from_ref(location)).await?;

        self.cache
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::BlockNotFound(location.clone()))
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.transaction.commit().await?;
        Ok(())
    }
}

/// Children of every block in `level`, in order. Blocks missing from `cache` contribute
/// nothing.
fn next_level(cache: &HashMap<UsageKey, Block>, level: &[UsageKey]) -> Vec<UsageKey> {
    level
        .iter()
        .filter_map(|l| cache.get(l))
        .flat_map(|b| b.children.iter().cloned())
        .collect()
}

fn block_from_row(row: &PgRow) -> Result<Block, StoreError> {
    let raw_location: String = row.try_get("usage_key")?;
    let location = raw_location
        .parse::<UsageKey>()
        .map_err(|e| StoreError::Corrupt {
            location: raw_location.clone(),
            reason: e.to_string(),
        })?;

    let Json(fields): Json<BlockFields> = row.try_get("fields")?;
    let children = parse_children(&raw_location, row.try_get("children")?)?;

    Ok(Block {
        location,
        fields,
        children,
    })
}

fn parse_children(location: &str, raw: Vec<String>) -> Result<Vec<UsageKey>, StoreError> {
    raw.iter()
        .map(|child| {
            child.parse().map_err(|_| StoreError::Corrupt {
                location: location.to_owned(),
                reason: format!("child {child:?} is not a usage key"),
            })
        })
        .collect()
}
