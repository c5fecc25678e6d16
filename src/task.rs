// Task store
//
// Explicit registry of render jobs keyed by task id. Entries are created on
// submit, updated on every phase change, and never removed while the process
// runs.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle phase of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Snapshot of one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub source: PathBuf,
    pub status: TaskStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Shared, cloneable job registry
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<String, TaskRecord>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending job for `source` and return its id.
    pub fn create(&self, source: impl Into<PathBuf>) -> String {
        let id = Uuid::new_v4().to_string();
        let record = TaskRecord {
            id: id.clone(),
            source: source.into(),
            status: TaskStatus::Pending,
            message: "queued".to_string(),
            output: None,
        };
        self.tasks.write().insert(id.clone(), record);
        id
    }

    pub fn mark_processing(&self, id: &str) -> bool {
        self.update(id, |record| {
            record.status = TaskStatus::Processing;
            record.message = "processing".to_string();
        })
    }

    pub fn mark_completed(&self, id: &str, output: impl Into<PathBuf>) -> bool {
        let output = output.into();
        self.update(id, |record| {
            record.status = TaskStatus::Completed;
            record.message = "completed".to_string();
            record.output = Some(output);
        })
    }

    pub fn mark_failed(&self, id: &str, message: impl Into<String>) -> bool {
        let message = message.into();
        self.update(id, |record| {
            record.status = TaskStatus::Failed;
            record.message = message;
        })
    }

    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        self.tasks.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// All records, sorted by source path.
    pub fn snapshot(&self) -> Vec<TaskRecord> {
        let mut records: Vec<_> = self.tasks.read().values().cloned().collect();
        records.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.id.cmp(&b.id)));
        records
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks
            .read()
            .values()
            .filter(|r| r.status == status)
            .count()
    }

    // Terminal records are frozen; returns false for unknown or finished ids.
    fn update(&self, id: &str, apply: impl FnOnce(&mut TaskRecord)) -> bool {
        let mut tasks = self.tasks.write();
        match tasks.get_mut(id) {
            Some(record) if !record.status.is_terminal() => {
                apply(record);
                tracing::debug!(task_id = %id, status = ?record.status, "task updated");
                true
            }
            _ => false,
        }
    }
}
