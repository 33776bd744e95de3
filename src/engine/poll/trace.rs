//! # Poll Trace Module
//!
//! Records every status check of a poll chain so callers can inspect how a
//! task progressed and why the chain stopped.

use crate::engine::poll::status::{ProgressEntry, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a poll chain ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PollOutcome {
    Completed,
    Failed,
    Errored,
    Cancelled,
    TimedOut,
    /// A status fetch itself failed
    Aborted,
}

/// A single status check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollStep {
    /// 1-based fetch number
    pub attempt: u32,
    /// Status of the latest entry, `None` when the progress list was empty
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

impl PollStep {
    pub fn observed(attempt: u32, entry: Option<&ProgressEntry>) -> Self {
        Self {
            attempt,
            status: entry.map(|e| e.status),
            message: entry.and_then(|e| e.message.clone()),
            at: Utc::now(),
        }
    }
}

/// Complete record of one poll chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollTrace {
    /// Unique id of this chain
    pub chain_id: Uuid,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PollOutcome>,
    pub steps: Vec<PollStep>,
}

impl PollTrace {
    pub fn new(task_id: &str) -> Self {
        Self {
            chain_id: Uuid::now_v7(),
            task_id: task_id.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
            steps: Vec::new(),
        }
    }

    pub fn add_step(&mut self, step: PollStep) {
        self.steps.push(step);
    }

    pub fn finish(&mut self, outcome: PollOutcome) {
        self.outcome = Some(outcome);
        self.finished_at = Some(Utc::now());
    }

    /// Number of status fetches that returned
    pub fn attempts(&self) -> usize {
        self.steps.len()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Some(PollOutcome::Completed)
    }

    /// Last message reported by the backend, if any
    pub fn last_message(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|s| s.message.as_deref())
    }
}
