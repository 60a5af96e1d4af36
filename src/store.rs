//! Access to the course content tree.
//!
//! All reads for one report go through a single [`CourseRead`] scope obtained from
//! [`CourseStore::bulk_read`]. The scope is bound to one course, caches what it fetches,
//! and must be released once the report is done, whether it succeeded or not.

use async_trait::async_trait;
use thiserror::Error;

use crate::keys::{CourseKey, UsageKey};
use crate::model::block::Block;
use crate::model::course::Course;

pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("course {0} not found")]
    CourseNotFound(CourseKey),

    #[error("block {0} not found")]
    BlockNotFound(UsageKey),

    #[error("block {location} is outside the bulk read of {course}")]
    OutOfScope { course: CourseKey, location: UsageKey },

    #[error("block {0} is not a course")]
    NotACourse(UsageKey),

    #[error("stored block {location} is corrupt: {reason}")]
    Corrupt { location: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not load seed data: {0}")]
    Seed(String),
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Opens a read scope over one course.
    async fn bulk_read(&self, course: &CourseKey) -> Result<Box<dyn CourseRead>, StoreError>;
}

#[async_trait]
pub trait CourseRead: Send {
    /// Fetches the course block and prefetches `depth` levels of descendants into the
    /// scope's cache.
    async fn get_course(&mut self, depth: usize) -> Result<Course, StoreError>;

    async fn get_node(&mut self, location: &UsageKey) -> Result<Block, StoreError>;

    /// Ends the scope.
    async fn release(self: Box<Self>) -> Result<(), StoreError>;
}

pub(crate) fn ensure_in_scope(course: &CourseKey, location: &UsageKey) -> Result<(), StoreError> {
    if location.course_key() != course {
        return Err(StoreError::OutOfScope {
            course: course.clone(),
            location: location.clone(),
        });
    }
    Ok(())
}

pub(crate) fn into_course(block: Block) -> Result<Course, StoreError> {
    Course::from_block(block).map_err(|b| StoreError::NotACourse(b.location))
}
