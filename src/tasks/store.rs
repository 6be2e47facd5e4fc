use anyhow::{anyhow, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::storage::with_timeout;

// ─── Row types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub time_spent: i64,
    pub priority: String,
    pub status: String,
    pub assigned_user_id: Option<String>,
    pub parent_task_id: Option<String>,
    pub recurrence_rule: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub fn is_recurring(&self) -> bool {
        self.recurrence_rule
            .as_deref()
            .map(|r| !r.is_empty())
            .unwrap_or(false)
    }
}

/// Fields for a fresh task row. Id, timestamps, and timer state are owned by
/// the store/engine, not the caller.
#[derive(Debug, Clone, Default)]
pub struct TaskInsert {
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub assigned_user_id: Option<String>,
    pub parent_task_id: Option<String>,
    pub recurrence_rule: Option<String>,
    pub created_by: Option<String>,
}

/// Task table plus its dependency/resource link tables. Shares the SQLite
/// pool with [`crate::storage::Storage`].
#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ─── Task rows ──────────────────────────────────────────────────────────

    pub async fn insert_task(&self, insert: &TaskInsert, now: &str) -> Result<TaskRow> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO tasks
             (id, title, description, priority, status, assigned_user_id, parent_task_id,
              recurrence_rule, created_by, time_spent, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(&insert.title)
        .bind(&insert.description)
        .bind(&insert.priority)
        .bind(&insert.status)
        .bind(&insert.assigned_user_id)
        .bind(&insert.parent_task_id)
        .bind(&insert.recurrence_rule)
        .bind(&insert.created_by)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        self.get_task(&id)
            .await?
            .ok_or_else(|| anyhow!("task not found after insert"))
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Offset-paged listing, newest first.
    pub async fn list_tasks(&self, limit: i64, offset: i64) -> Result<Vec<TaskRow>> {
        let pool = self.pool.clone();
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM tasks ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&pool)
            .await?)
        })
        .await
    }

    /// Full table scan — used by the scheduler passes and the stop-timer
    /// dependency fan-out. Bounds feasible scale; an accepted limitation.
    pub async fn list_all_tasks(&self) -> Result<Vec<TaskRow>> {
        let pool = self.pool.clone();
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM tasks ORDER BY created_at ASC")
                .fetch_all(&pool)
                .await?)
        })
        .await
    }

    pub async fn count_tasks(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Bulk lookup by id. Unknown ids are silently omitted — the caller gets
    /// the subset that resolves, never an error for the rest.
    pub async fn list_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<TaskRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM tasks WHERE id IN ({placeholders})");
        let mut query = sqlx::query_as(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn list_tasks_by_assignee(&self, user_id: &str) -> Result<Vec<TaskRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM tasks WHERE assigned_user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Replace the mutable scalar fields of a task (full-replace update).
    #[allow(clippy::too_many_arguments)]
    pub async fn update_task_fields(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
        priority: &str,
        status: &str,
        recurrence_rule: Option<&str>,
        now: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, priority = ?, status = ?,
             recurrence_rule = ?, updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(description)
        .bind(priority)
        .bind(status)
        .bind(recurrence_rule)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_timer_started(&self, id: &str, start_time: &str, status: &str) -> Result<()> {
        sqlx::query(
            "UPDATE tasks SET start_time = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(start_time)
        .bind(status)
        .bind(start_time)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_timer_stopped(
        &self,
        id: &str,
        end_time: &str,
        time_spent: i64,
        status: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE tasks SET end_time = ?, time_spent = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(end_time)
        .bind(time_spent)
        .bind(status)
        .bind(end_time)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_status(&self, id: &str, status: &str, now: &str) -> Result<()> {
        sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_assignee(&self, id: &str, user_id: &str, now: &str) -> Result<()> {
        sqlx::query("UPDATE tasks SET assigned_user_id = ?, updated_at = ? WHERE id = ?")
            .bind(user_id)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        // Subtasks and link rows go with it via ON DELETE CASCADE.
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Dependencies ───────────────────────────────────────────────────────

    /// Replace a task's dependency set. No cycle detection — a task may
    /// depend on itself or form cycles; only completion notification reads
    /// this relation.
    pub async fn replace_dependencies(&self, task_id: &str, dependency_ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM task_dependencies WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        for dep_id in dependency_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO task_dependencies (task_id, dependency_id) VALUES (?, ?)",
            )
            .bind(task_id)
            .bind(dep_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn dependency_ids(&self, task_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT dependency_id FROM task_dependencies WHERE task_id = ? ORDER BY dependency_id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Tasks whose dependency set contains `dependency_id`.
    pub async fn dependents_of(&self, dependency_id: &str) -> Result<Vec<TaskRow>> {
        Ok(sqlx::query_as(
            "SELECT t.* FROM tasks t
             JOIN task_dependencies d ON d.task_id = t.id
             WHERE d.dependency_id = ?",
        )
        .bind(dependency_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ─── Subtasks ───────────────────────────────────────────────────────────

    pub async fn subtask_ids(&self, task_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT id FROM tasks WHERE parent_task_id = ? ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn set_parent(&self, child_id: &str, parent_id: Option<&str>, now: &str) -> Result<()> {
        sqlx::query("UPDATE tasks SET parent_task_id = ?, updated_at = ? WHERE id = ?")
            .bind(parent_id)
            .bind(now)
            .bind(child_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Resources ──────────────────────────────────────────────────────────

    pub async fn replace_resources(&self, task_id: &str, resource_ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM task_resources WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        for resource_id in resource_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO task_resources (task_id, resource_id) VALUES (?, ?)",
            )
            .bind(task_id)
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn resource_ids(&self, task_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT resource_id FROM task_resources WHERE task_id = ? ORDER BY resource_id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
