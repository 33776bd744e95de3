use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status reported by the backend for a long-running task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    Error,
    /// Any other status string (e.g. `queued`); treated as still in progress
    #[serde(other)]
    Other,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Error
        )
    }
}

/// One status snapshot of a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEntry {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ProgressEntry {
    pub fn running() -> Self {
        Self {
            status: TaskStatus::Running,
            message: None,
            result: None,
        }
    }
}

/// Envelope returned by the task status endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskProgress {
    #[serde(default)]
    pub progress: Vec<ProgressEntry>,
}

impl TaskProgress {
    /// Only the most recent snapshot decides the task state
    pub fn latest(&self) -> Option<&ProgressEntry> {
        self.progress.last()
    }
}

/// Response of a job submission call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmittedTask {
    pub task_id: String,
}
