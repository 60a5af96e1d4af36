//! In-process course store, used for seed-file deployments and in tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;

use crate::keys::{CourseKey, UsageKey};
use crate::model::block::Block;
use crate::model::course::Course;
use crate::security::access::AccessRole;
use crate::store::{CourseRead, CourseStore, StoreError, ensure_in_scope, into_course};

/// Counts of what the store was asked to do, so callers can check how reports read the
/// course. Fixed size however many reports run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchJournal {
    pub course_fetches: usize,
    pub last_depth: Option<usize>,
    pub node_fetches: usize,
    pub opened: usize,
    pub released: usize,
}

#[derive(Clone, Default)]
pub struct MemoryCourseStore {
    blocks: Arc<HashMap<UsageKey, Block>>,
    journal: Arc<Mutex<FetchJournal>>,
}

impl MemoryCourseStore {
    pub fn new(blocks: impl IntoIterator<Item = Block>) -> Self {
        let blocks = blocks
            .into_iter()
            .map(|b| (b.location.clone(), b))
            .collect::<HashMap<_, _>>();

        Self {
            blocks: Arc::new(blocks),
            journal: Arc::default(),
        }
    }

    #[cfg(test)]
    pub fn journal(&self) -> FetchJournal {
        self.journal.lock().map(|j| *j).unwrap_or_default()
    }

    fn record(journal: &Mutex<FetchJournal>, f: impl FnOnce(&mut FetchJournal)) {
        if let Ok(mut journal) = journal.lock() {
            f(&mut journal);
        }
    }
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    async fn bulk_read(&self, course: &CourseKey) -> Result<Box<dyn CourseRead>, StoreError> {
        Self::record(&self.journal, |j| j.opened += 1);
        Ok(Box::new(MemoryBulkRead {
            course: course.clone(),
            blocks: Arc::clone(&self.blocks),
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct MemoryBulkRead {
    course: CourseKey,
    blocks: Arc<HashMap<UsageKey, Block>>,
    journal: Arc<Mutex<FetchJournal>>,
}

#[async_trait]
impl CourseRead for MemoryBulkRead {
    async fn get_course(&mut self, depth: usize) -> Result<Course, StoreError> {
        MemoryCourseStore::record(&self.journal, |j| {
            j.course_fetches += 1;
            j.last_depth = Some(depth);
        });

        let block = self
            .blocks
            .get(&self.course.course_usage_key())
            .cloned()
            .ok_or_else(|| StoreError::CourseNotFound(self.course.clone()))?;
        into_course(block)
    }

    async fn get_node(&mut self, location: &UsageKey) -> Result<Block, StoreError> {
        ensure_in_scope(&self.course, location)?;
        MemoryCourseStore::record(&self.journal, |j| j.node_fetches += 1);

        self.blocks
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::BlockNotFound(location.clone()))
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        MemoryCourseStore::record(&self.journal, |j| {
            j.released += 1;
            tracing::debug!(
                course = %self.course,
                opened = j.opened,
                released = j.released,
                course_fetches = j.course_fetches,
                node_fetches = j.node_fetches,
                last_depth = ?j.last_depth,
                "memory bulk read released"
            );
        });
        Ok(())
    }
}

/// Contents of a JSON seed file for the in-memory store.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub blocks: Vec<Block>,
    pub roles: Vec<AccessRole>,
}

impl SeedFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw).map_err(|e| StoreError::Seed(format!("{}: {e}", path.display())))
    }
}
