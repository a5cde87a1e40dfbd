//! Task event envelope published by the task service.
//!
//! The hub never decodes these; the type documents the wire contract for
//! producers and lets tests build realistic payloads. Events are published
//! on `tasks.<kind>` and delivered to clients exactly as published.

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// What happened to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    /// A task was created.
    Created,
    /// A task was modified.
    Updated,
    /// A task was removed.
    Deleted,
}

impl TaskEventKind {
    /// Returns the subject suffix for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// JSON envelope emitted once per task mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Kind of mutation.
    #[serde(rename = "type")]
    pub kind: TaskEventKind,
    /// Task identifier.
    pub task_id: i64,
    /// Board the task belongs to.
    pub board_id: i64,
    /// Task title at emission time.
    #[serde(default)]
    pub title: String,
    /// Set only when the task is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Emission time, seconds since the Unix epoch.
    pub timestamp: i64,
}

impl TaskEvent {
    /// Builds an event stamped with the current time.
    #[must_use]
    pub fn new(kind: TaskEventKind, task_id: i64, board_id: i64, title: impl Into<String>) -> Self {
        Self {
            kind,
            task_id,
            board_id,
            title: title.into(),
            completed: None,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Marks the event as describing a completed task.
    #[must_use]
    pub const fn completed(mut self) -> Self {
        self.completed = Some(true);
        self
    }

    /// Subject this event is published on, e.g. `tasks.created`.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("tasks.{}", self.kind.as_str())
    }

    /// Serializes the envelope into the bytes published to the broker.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_payload(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}
