use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ResourceRow;
use crate::tasks::store::TaskRow;

/// Task state machine. In practice transitions move forward only:
/// TODO → IN_PROGRESS (timer start) → DONE (timer stop). Generic field
/// updates may write any status directly, bypassing the timer invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    /// Lenient parse — unknown labels fall back to TODO so a hand-edited
    /// database row cannot wedge the engine.
    pub fn parse(s: &str) -> Self {
        match s {
            "IN_PROGRESS" => TaskStatus::InProgress,
            "DONE" => TaskStatus::Done,
            _ => TaskStatus::Todo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "LOW" => Priority::Low,
            "HIGH" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// API-facing task: the stored row plus its resolved relation id sets.
///
/// Relations are id references, not embedded objects — the task graph is
/// self-referential (dependencies, parent/subtasks) and is kept as an arena
/// keyed by id, resolved on read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Minutes between start and end; 0 when either is unset. Derived, never
    /// independently settable.
    pub time_spent: i64,
    pub priority: Priority,
    pub status: TaskStatus,
    pub assigned_user_id: Option<String>,
    pub dependency_ids: Vec<String>,
    pub subtask_ids: Vec<String>,
    pub parent_task_id: Option<String>,
    pub resources: Vec<ResourceRow>,
    pub recurrence_rule: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Task {
    pub fn from_parts(
        row: TaskRow,
        dependency_ids: Vec<String>,
        subtask_ids: Vec<String>,
        resources: Vec<ResourceRow>,
    ) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            end_time: row.end_time,
            time_spent: row.time_spent,
            priority: Priority::parse(&row.priority),
            status: TaskStatus::parse(&row.status),
            assigned_user_id: row.assigned_user_id,
            dependency_ids,
            subtask_ids,
            parent_task_id: row.parent_task_id,
            resources,
            recurrence_rule: row.recurrence_rule,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Minute-difference between two RFC 3339 timestamps; 0 when either is
/// absent or unparsable.
pub fn time_spent_minutes(start: Option<&str>, end: Option<&str>) -> i64 {
    let (Some(start), Some(end)) = (start, end) else {
        return 0;
    };
    let (Ok(start), Ok(end)) = (
        DateTime::parse_from_rfc3339(start),
        DateTime::parse_from_rfc3339(end),
    ) else {
        return 0;
    };
    (end.with_timezone(&Utc) - start.with_timezone(&Utc)).num_minutes()
}
