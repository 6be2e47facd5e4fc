use anyhow::Result;
use serde::Serialize;

use crate::tasks::model::TaskStatus;
use crate::tasks::store::TaskStore;

/// Task-completion counts for the reporting route.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,
    pub todo_tasks: i64,
}

/// Count tasks by status across the whole table.
pub async fn completion_report(store: &TaskStore) -> Result<CompletionReport> {
    let mut report = CompletionReport::default();
    for task in store.list_all_tasks().await? {
        report.total_tasks += 1;
        match TaskStatus::parse(&task.status) {
            TaskStatus::Done => report.completed_tasks += 1,
            TaskStatus::InProgress => report.in_progress_tasks += 1,
            TaskStatus::Todo => report.todo_tasks += 1,
        }
    }
    Ok(report)
}

/// Per-user workload: status counts over one user's assigned tasks.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserDashboard {
    pub todo_count: i64,
    pub in_progress_count: i64,
    pub done_count: i64,
    pub total_count: i64,
}

pub async fn user_dashboard(store: &TaskStore, user_id: &str) -> Result<UserDashboard> {
    let mut dashboard = UserDashboard::default();
    for task in store.list_tasks_by_assignee(user_id).await? {
        dashboard.total_count += 1;
        match TaskStatus::parse(&task.status) {
            TaskStatus::Done => dashboard.done_count += 1,
            TaskStatus::InProgress => dashboard.in_progress_count += 1,
            TaskStatus::Todo => dashboard.todo_count += 1,
        }
    }
    Ok(dashboard)
}
