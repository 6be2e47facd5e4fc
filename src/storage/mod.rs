use anyhow::{Context as _, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the daemon indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
pub(crate) async fn with_timeout<T>(
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

// ─── Row types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Coarse authorization label: ADMIN | PROJECT_MANAGER | TEAM_LEADER |
    /// TEAM_MEMBER | EXTERNAL_VIEWER.
    pub role: String,
    /// JSON array of permission strings.
    pub permissions: String,
    /// `<salt>$<sha256 hex>` — never serialized to the API.
    pub password_hash: String,
    pub totp_secret: Option<String>,
    pub two_factor_enabled: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub message: String,
    #[serde(rename = "read")]
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRow {
    pub id: String,
    pub name: String,
    pub resource_type: Option<String>,
    pub created_at: String,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("taskd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                // Subtask cascade delete and link-table cleanup rely on FKs.
                .foreign_keys(true)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            use sqlx::ConnectOptions;
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    /// Used to create a TaskStore that shares the same SQLite connection.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        let stmts = [
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                permissions TEXT NOT NULL DEFAULT '[]',
                password_hash TEXT NOT NULL,
                totp_secret TEXT,
                two_factor_enabled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS auth_tokens (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                start_time TEXT,
                end_time TEXT,
                time_spent INTEGER NOT NULL DEFAULT 0,
                priority TEXT NOT NULL,
                status TEXT NOT NULL,
                assigned_user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
                parent_task_id TEXT REFERENCES tasks(id) ON DELETE CASCADE,
                recurrence_rule TEXT,
                created_by TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS task_dependencies (
                task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                dependency_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                PRIMARY KEY (task_id, dependency_id)
            )",
            "CREATE TABLE IF NOT EXISTS resources (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                resource_type TEXT,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS task_resources (
                task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                resource_id TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
                PRIMARY KEY (task_id, resource_id)
            )",
            "CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                message TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_tasks_assigned_user ON tasks(assigned_user_id)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_task_id)",
            "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id)",
        ];
        for stmt in stmts {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .context("Failed to run database migrations")?;
        }
        Ok(())
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        role: &str,
        password_hash: &str,
    ) -> Result<UserRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, username, email, role, permissions, password_hash, created_at)
             VALUES (?, ?, ?, ?, '[]', ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(role)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_user(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after insert"))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_users(&self) -> Result<Vec<UserRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM users ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    pub async fn update_user_profile(
        &self,
        id: &str,
        username: &str,
        email: &str,
        role: &str,
        password_hash: Option<&str>,
    ) -> Result<()> {
        if let Some(hash) = password_hash {
            sqlx::query(
                "UPDATE users SET username = ?, email = ?, role = ?, password_hash = ? WHERE id = ?",
            )
            .bind(username)
            .bind(email)
            .bind(role)
            .bind(hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE users SET username = ?, email = ?, role = ? WHERE id = ?")
                .bind(username)
                .bind(email)
                .bind(role)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn set_user_permissions(&self, id: &str, permissions_json: &str) -> Result<()> {
        sqlx::query("UPDATE users SET permissions = ? WHERE id = ?")
            .bind(permissions_json)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_two_factor(&self, id: &str, totp_secret: &str) -> Result<()> {
        sqlx::query("UPDATE users SET totp_secret = ?, two_factor_enabled = 1 WHERE id = ?")
            .bind(totp_secret)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Auth tokens ────────────────────────────────────────────────────────

    pub async fn insert_token(&self, token: &str, user_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn user_for_token(&self, token: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as(
            "SELECT u.* FROM users u JOIN auth_tokens t ON t.user_id = u.id WHERE t.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?)
    }

    // ─── Notifications ──────────────────────────────────────────────────────

    pub async fn create_notification(&self, user_id: &str, message: &str) -> Result<NotificationRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO notifications (id, user_id, message, is_read, created_at)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(message)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(NotificationRow {
            id,
            user_id: user_id.to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: now,
        })
    }

    pub async fn list_notifications_for_user(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ─── Resources ──────────────────────────────────────────────────────────

    pub async fn create_resource(&self, name: &str, resource_type: Option<&str>) -> Result<ResourceRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO resources (id, name, resource_type, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(resource_type)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(ResourceRow {
            id,
            name: name.to_string(),
            resource_type: resource_type.map(|s| s.to_string()),
            created_at: now,
        })
    }

    /// Bulk lookup by id. Unknown ids are silently omitted from the result —
    /// callers treat the returned set as the resolved subset.
    pub async fn list_resources_by_ids(&self, ids: &[String]) -> Result<Vec<ResourceRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM resources WHERE id IN ({placeholders})");
        let mut query = sqlx::query_as(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}
