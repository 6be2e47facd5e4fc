use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::storage::Storage;
use crate::tasks::model::{time_spent_minutes, Priority, Task, TaskStatus};
use crate::tasks::store::{TaskInsert, TaskRow, TaskStore};

/// Creation payload. Timer state and status are owned by the engine — a new
/// task always starts as TODO with no timer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: Priority,
    #[serde(default)]
    pub assigned_user_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Full-replace update payload — every field overwrites the stored value,
/// nothing is merged. Status may be written directly here, bypassing the
/// timer invariants (legacy API behavior).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default)]
    pub subtask_ids: Vec<String>,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub resource_ids: Vec<String>,
}

/// Task lifecycle engine: creation with dependency wiring, timer transitions,
/// dependency-completion fan-out, assignment.
///
/// Side-effect order is fixed: store mutation first, then notification
/// emission. Notifications are fire-and-forget and never roll back or fail
/// the triggering operation.
pub struct LifecycleEngine {
    store: Arc<TaskStore>,
    storage: Arc<Storage>,
    notifier: Arc<Notifier>,
    clock: Arc<dyn Clock>,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<TaskStore>,
        storage: Arc<Storage>,
        notifier: Arc<Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            storage,
            notifier,
            clock,
        }
    }

    fn now(&self) -> String {
        self.clock.now().to_rfc3339()
    }

    /// Resolve a task row into its API shape (relations as id sets).
    async fn assemble(&self, row: TaskRow) -> Result<Task> {
        let dependency_ids = self.store.dependency_ids(&row.id).await?;
        let subtask_ids = self.store.subtask_ids(&row.id).await?;
        let resource_ids = self.store.resource_ids(&row.id).await?;
        let resources = self.storage.list_resources_by_ids(&resource_ids).await?;
        Ok(Task::from_parts(row, dependency_ids, subtask_ids, resources))
    }

    async fn load(&self, id: &str) -> Result<TaskRow> {
        self.store
            .get_task(id)
            .await?
            .ok_or_else(|| Error::not_found("Task", id))
    }

    /// Create a task with an optional dependency set.
    ///
    /// Dependency ids are resolved by bulk lookup; ids that do not exist are
    /// silently dropped — the created task's dependency set is the subset
    /// that resolved, and no error is raised for the rest.
    pub async fn create_task(&self, new: &NewTask, dependency_ids: &[String]) -> Result<Task> {
        let resolved: Vec<String> = self
            .store
            .list_tasks_by_ids(dependency_ids)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let row = self
            .store
            .insert_task(
                &TaskInsert {
                    title: new.title.clone(),
                    description: new.description.clone(),
                    priority: new.priority.as_str().to_string(),
                    status: TaskStatus::Todo.as_str().to_string(),
                    assigned_user_id: new.assigned_user_id.clone(),
                    parent_task_id: new.parent_task_id.clone(),
                    recurrence_rule: new.recurrence_rule.clone(),
                    created_by: new.created_by.clone(),
                },
                &self.now(),
            )
            .await?;

        if !resolved.is_empty() {
            self.store.replace_dependencies(&row.id, &resolved).await?;
        }
        debug!(task_id = %row.id, deps = resolved.len(), "task created");
        self.assemble(row).await
    }

    /// Start the work timer: TODO → IN_PROGRESS.
    ///
    /// A timer can be started at most once — there is no reset path, so a
    /// stopped task cannot restart its timer.
    pub async fn start_timer(&self, id: &str) -> Result<Task> {
        let row = self.load(id).await?;
        if row.start_time.is_some() {
            return Err(Error::InvalidState(format!(
                "Timer is already running for task id: {id}"
            )));
        }
        let now = self.now();
        self.store
            .set_timer_started(id, &now, TaskStatus::InProgress.as_str())
            .await?;
        self.assemble(self.load(id).await?).await
    }

    /// Stop the work timer: IN_PROGRESS → DONE, recompute `timeSpent`, then
    /// notify every not-yet-done dependent's assignee that this dependency
    /// completed. The fan-out is best-effort and not transactional with the
    /// stop itself.
    pub async fn stop_timer(&self, id: &str) -> Result<Task> {
        let row = self.load(id).await?;
        let Some(start_time) = row.start_time.as_deref() else {
            return Err(Error::InvalidState(format!(
                "Timer has not been started for task id: {id}"
            )));
        };
        if row.end_time.is_some() {
            return Err(Error::InvalidState(format!(
                "Timer is already stopped for task id: {id}"
            )));
        }

        let end_time = self.now();
        let time_spent = time_spent_minutes(Some(start_time), Some(&end_time));
        self.store
            .set_timer_stopped(id, &end_time, time_spent, TaskStatus::Done.as_str())
            .await?;

        for dependent in self.store.dependents_of(id).await? {
            if TaskStatus::parse(&dependent.status) == TaskStatus::Done {
                continue;
            }
            if let Some(assignee) = dependent.assigned_user_id.as_deref() {
                self.notifier
                    .send(
                        assignee,
                        &format!(
                            "Dependency '{}' completed for task '{}'",
                            row.title, dependent.title
                        ),
                    )
                    .await;
            }
        }

        self.assemble(self.load(id).await?).await
    }

    /// Full-replace update of title, description, priority, status, subtask
    /// set, recurrence rule, and resource set.
    ///
    /// Subtask replacement adopts the new set and deletes former subtasks
    /// dropped from it (orphan-removal, not detach). A status
    /// change notifies the assignee.
    pub async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task> {
        let row = self.load(id).await?;
        let prior_status = TaskStatus::parse(&row.status);
        let now = self.now();

        self.store
            .update_task_fields(
                id,
                &update.title,
                update.description.as_deref(),
                update.priority.as_str(),
                update.status.as_str(),
                update.recurrence_rule.as_deref(),
                &now,
            )
            .await?;

        // Subtasks: adopt the new set, delete orphans.
        let adopted: HashSet<String> = self
            .store
            .list_tasks_by_ids(&update.subtask_ids)
            .await?
            .into_iter()
            .map(|t| t.id)
            .filter(|child| child != id)
            .collect();
        let current = self.store.subtask_ids(id).await?;
        for child in &adopted {
            self.store.set_parent(child, Some(id), &now).await?;
        }
        for former in current {
            if !adopted.contains(&former) {
                self.store.delete_task(&former).await?;
            }
        }

        // Resources: silent-drop resolution, then full replace.
        let resolved: Vec<String> = self
            .storage
            .list_resources_by_ids(&update.resource_ids)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.store.replace_resources(id, &resolved).await?;

        if update.status != prior_status {
            if let Some(assignee) = row.assigned_user_id.as_deref() {
                self.notifier
                    .send(
                        assignee,
                        &format!(
                            "Your task '{}' status changed to {}",
                            update.title,
                            update.status.as_str()
                        ),
                    )
                    .await;
            }
        }

        self.assemble(self.load(id).await?).await
    }

    /// Delete a task. Owned subtasks and link rows go with it.
    pub async fn delete_task(&self, id: &str) -> Result<()> {
        self.load(id).await?;
        self.store.delete_task(id).await?;
        Ok(())
    }

    pub async fn assign_task_to_user(&self, task_id: &str, user_id: &str) -> Result<Task> {
        let row = self.load(task_id).await?;
        let user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found("User", user_id))?;
        self.store.set_assignee(task_id, &user.id, &self.now()).await?;
        self.notifier
            .send(
                &user.id,
                &format!("Task '{}' has been assigned to you.", row.title),
            )
            .await;
        self.assemble(self.load(task_id).await?).await
    }

    /// Replace a task's resource set. Unknown resource ids are silently
    /// dropped, same as dependency resolution.
    pub async fn assign_resources(&self, task_id: &str, resource_ids: &[String]) -> Result<Task> {
        self.load(task_id).await?;
        let resolved: Vec<String> = self
            .storage
            .list_resources_by_ids(resource_ids)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.store.replace_resources(task_id, &resolved).await?;
        self.assemble(self.load(task_id).await?).await
    }

    pub async fn get_task(&self, id: &str) -> Result<Task> {
        let row = self.load(id).await?;
        self.assemble(row).await
    }

    /// Offset-paged listing plus the total row count for the page envelope.
    pub async fn list_tasks(&self, page: i64, size: i64) -> Result<(Vec<Task>, i64)> {
        let size = size.max(1);
        let rows = self.store.list_tasks(size, page.max(0) * size).await?;
        let total = self.store.count_tasks().await?;
        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            tasks.push(self.assemble(row).await?);
        }
        Ok((tasks, total))
    }
}
