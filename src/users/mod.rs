use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::{Storage, UserRow};

/// Coarse authorization label gating route access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    ProjectManager,
    TeamLeader,
    TeamMember,
    ExternalViewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::ProjectManager => "PROJECT_MANAGER",
            Role::TeamLeader => "TEAM_LEADER",
            Role::TeamMember => "TEAM_MEMBER",
            Role::ExternalViewer => "EXTERNAL_VIEWER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "PROJECT_MANAGER" => Some(Role::ProjectManager),
            "TEAM_LEADER" => Some(Role::TeamLeader),
            "TEAM_MEMBER" => Some(Role::TeamMember),
            "EXTERNAL_VIEWER" => Some(Role::ExternalViewer),
            _ => None,
        }
    }
}

/// API-facing user. The password hash never leaves the storage layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub two_factor_enabled: bool,
    pub created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let permissions = serde_json::from_str(&row.permissions).unwrap_or_default();
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            role: row.role,
            permissions,
            two_factor_enabled: row.two_factor_enabled,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub role: String,
    /// New plaintext password; omit to keep the current one.
    pub password: Option<String>,
}

// ─── Password hashing ────────────────────────────────────────────────────────

/// Salted SHA-256 digest, stored as `<salt>$<hex>`.
fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

// ─── UserDirectory ───────────────────────────────────────────────────────────

/// User registration, credentials, roles, and permission sets.
#[derive(Clone)]
pub struct UserDirectory {
    storage: Arc<Storage>,
}

impl UserDirectory {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn register(&self, reg: &Registration) -> Result<User> {
        if self.storage.get_user_by_username(&reg.username).await?.is_some() {
            return Err(Error::InvalidState("Username already exists".into()));
        }
        if self.storage.get_user_by_email(&reg.email).await?.is_some() {
            return Err(Error::InvalidState("Email already exists".into()));
        }
        let role = Role::parse(&reg.role)
            .ok_or_else(|| Error::InvalidState(format!("Unknown role: {}", reg.role)))?;
        let row = self
            .storage
            .create_user(
                &reg.username,
                &reg.email,
                role.as_str(),
                &hash_password(&reg.password),
            )
            .await?;
        Ok(row.into())
    }

    /// Check credentials and return the user. Both an unknown username and a
    /// wrong password surface as Unauthorized — the boundary maps either to
    /// 401.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserRow> {
        let row = self
            .storage
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid credentials".into()))?;
        if !verify_password(password, &row.password_hash) {
            return Err(Error::Unauthorized("Invalid credentials".into()));
        }
        Ok(row)
    }

    /// Issue an opaque bearer token for a logged-in user.
    pub async fn issue_token(&self, user_id: &str) -> Result<String> {
        let token = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        self.storage.insert_token(&token, user_id).await?;
        Ok(token)
    }

    pub async fn user_for_token(&self, token: &str) -> Result<Option<UserRow>> {
        Ok(self.storage.user_for_token(token).await?)
    }

    pub async fn get(&self, id: &str) -> Result<UserRow> {
        self.storage
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("User", id))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = self.storage.list_users().await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn update_permissions(&self, id: &str, permissions: &[String]) -> Result<User> {
        self.get(id).await?;
        let json = serde_json::to_string(permissions).map_err(anyhow::Error::from)?;
        self.storage.set_user_permissions(id, &json).await?;
        Ok(self.get(id).await?.into())
    }

    pub async fn update(&self, id: &str, update: &UserUpdate) -> Result<User> {
        self.get(id).await?;
        let role = Role::parse(&update.role)
            .ok_or_else(|| Error::InvalidState(format!("Unknown role: {}", update.role)))?;
        let new_hash = update.password.as_deref().map(hash_password);
        self.storage
            .update_user_profile(
                id,
                &update.username,
                &update.email,
                role.as_str(),
                new_hash.as_deref(),
            )
            .await?;
        Ok(self.get(id).await?.into())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.get(id).await?;
        self.storage.delete_user(id).await?;
        Ok(())
    }

    pub async fn enable_two_factor(&self, id: &str, totp_secret: &str) -> Result<()> {
        self.get(id).await?;
        self.storage.set_two_factor(id, totp_secret).await?;
        Ok(())
    }

    /// Two-factor check. Users without 2FA pass trivially; for enabled users
    /// the code is accepted unconditionally — real TOTP validation is not
    /// implemented (see DESIGN.md).
    pub async fn verify_two_factor(&self, id: &str, _code: &str) -> Result<bool> {
        let row = self.get(id).await?;
        if !row.two_factor_enabled {
            return Ok(true);
        }
        Ok(true)
    }
}
