//! Persistence interface (spec §6.3): consumed by a host application. The
//! core only needs `Save`/`FindById` to behave durably; entries and patches
//! are otherwise opaque. A tiny in-memory/no-op pair is provided so the
//! crate is runnable end-to-end without a host supplying real storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::task::{Task, TaskStatus};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no task with id `{0}`")]
    TaskNotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Clone, Debug, Default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn save(&self, task: &Task) -> Result<(), PersistenceError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Task>, PersistenceError>;
    async fn find_all(&self, filters: TaskFilters) -> Result<Vec<Task>, PersistenceError>;
    async fn update(&self, id: &str, patch: Value) -> Result<(), PersistenceError>;
    async fn delete(&self, id: &str) -> Result<(), PersistenceError>;
    async fn find_recent(&self, n: usize) -> Result<Vec<Task>, PersistenceError>;
    async fn search_by_goal(&self, query: &str) -> Result<Vec<Task>, PersistenceError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEntryType {
    Event,
    StepResult,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub task_id: String,
    pub entry_type: HistoryEntryType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct HistoryQuery {
    pub entry_type: Option<HistoryEntryType>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait ExecutionHistoryRepository: Send + Sync {
    async fn save(&self, entry: HistoryEntry) -> Result<(), PersistenceError>;
    async fn find_by_task_id(&self, task_id: &str, query: HistoryQuery) -> Result<Vec<HistoryEntry>, PersistenceError>;
    async fn delete_by_task_id(&self, task_id: &str) -> Result<(), PersistenceError>;
    async fn get_timeline(&self, task_id: &str) -> Result<Vec<HistoryEntry>, PersistenceError>;
}

/// Process-memory `TaskRepository`, durable only for the life of the
/// process. Good enough to run the end-to-end scenarios without a host
/// supplying a real store.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn save(&self, task: &Task) -> Result<(), PersistenceError> {
        debug!(task_id = %task.id, "InMemoryTaskRepository::save: called");
        self.tasks.lock().expect("task repository lock poisoned").insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Task>, PersistenceError> {
        Ok(self.tasks.lock().expect("task repository lock poisoned").get(id).cloned())
    }

    async fn find_all(&self, filters: TaskFilters) -> Result<Vec<Task>, PersistenceError> {
        let guard = self.tasks.lock().expect("task repository lock poisoned");
        Ok(guard
            .values()
            .filter(|t| filters.status.map_or(true, |s| t.status() == s))
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, _patch: Value) -> Result<(), PersistenceError> {
        let guard = self.tasks.lock().expect("task repository lock poisoned");
        if guard.contains_key(id) {
            Ok(())
        } else {
            Err(PersistenceError::TaskNotFound(id.to_string()))
        }
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        self.tasks.lock().expect("task repository lock poisoned").remove(id);
        Ok(())
    }

    async fn find_recent(&self, n: usize) -> Result<Vec<Task>, PersistenceError> {
        let guard = self.tasks.lock().expect("task repository lock poisoned");
        let mut tasks: Vec<Task> = guard.values().cloned().collect();
        tasks.sort_by_key(|t| std::cmp::Reverse(t.metadata.updated_at));
        tasks.truncate(n);
        Ok(tasks)
    }

    async fn search_by_goal(&self, query: &str) -> Result<Vec<Task>, PersistenceError> {
        let guard = self.tasks.lock().expect("task repository lock poisoned");
        let needle = query.to_lowercase();
        Ok(guard.values().filter(|t| t.goal.to_lowercase().contains(&needle)).cloned().collect())
    }
}

/// No-op `ExecutionHistoryRepository`: accepts writes, returns nothing.
/// Suitable as a default for embedders that don't need execution history.
#[derive(Default)]
pub struct NullHistoryRepository;

#[async_trait]
impl ExecutionHistoryRepository for NullHistoryRepository {
    async fn save(&self, _entry: HistoryEntry) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn find_by_task_id(&self, _task_id: &str, _query: HistoryQuery) -> Result<Vec<HistoryEntry>, PersistenceError> {
        Ok(Vec::new())
    }

    async fn delete_by_task_id(&self, _task_id: &str) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn get_timeline(&self, _task_id: &str) -> Result<Vec<HistoryEntry>, PersistenceError> {
        Ok(Vec::new())
    }
}
