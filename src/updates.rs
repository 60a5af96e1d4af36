use async_trait::async_trait;

use crate::keys::UsageKey;
use crate::model::block::CourseUpdate;
use crate::store::{CourseRead, StoreError};

#[async_trait]
pub trait UpdateFeed: Send + Sync {
    /// Live (not deleted) update entries stored at `location`.
    async fn get_updates(
        &self,
        reader: &mut dyn CourseRead,
        location: &UsageKey,
        user_id: &str,
    ) -> Result<Vec<CourseUpdate>, StoreError>;
}

/// Reads updates from the course's `course_info` block. A course that never had an
/// update posted has no such block.
pub struct BlockUpdateFeed;

#[async_trait]
impl UpdateFeed for BlockUpdateFeed {
    async fn get_updates(
        &self,
        reader: &mut dyn CourseRead,
        location: &UsageKey,
        user_id: &str,
    ) -> Result<Vec<CourseUpdate>, StoreError> {
        let block = match reader.get_node(location).await {
            Ok(block) => block,
            Err(StoreError::BlockNotFound(_)) => {
                tracing::debug!(%location, user_id, "no update feed for course");
                return Ok(vec![]);
            }
            Err(e) => return Err(e),
        };

        Ok(block
            .fields
            .items
            .into_iter()
            .filter(|u| !u.is_deleted())
            .collect())
    }
}
