use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::db::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Unverified,
    Verified,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Unverified => "unverified",
            UserStatus::Verified => "verified",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unverified" => Some(UserStatus::Unverified),
            "verified" => Some(UserStatus::Verified),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Normal,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Normal => "normal",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "normal" | "user" => Some(Role::Normal),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub name: Option<String>,
    pub photo: Option<String>,
    pub status: UserStatus,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetRole {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug)]
pub enum CreateUserOutcome {
    Created(User),
    AlreadyExists,
}

const USER_COLUMNS: &str = "email, name, photo, status, role, created_at, updated_at";

pub struct Users<'a> {
    db: &'a Database,
}

impl<'a> Users<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Inserts the user unless the email is already registered. The check and
    /// the insert are one statement, so concurrent signups cannot both win.
    pub async fn create_user(&self, input: CreateUser) -> Result<CreateUserOutcome> {
        let query = format!(
            r#"
            INSERT INTO users (email, name, photo)
            VALUES (?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            RETURNING {USER_COLUMNS}
        "#
        );

        let _guard = self.db.write_lock().await;
        let mut rows = self
            .db
            .connection()
            .query(
                &query,
                libsql::params![input.email.trim(), input.name, input.photo],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(CreateUserOutcome::Created(self.row_to_user(&row)?)),
            None => Ok(CreateUserOutcome::AlreadyExists),
        }
    }

    pub async fn get_user(&self, email: &str) -> Result<Option<User>> {
        let _guard = self.db.read_lock().await;
        self.fetch_user(email).await
    }

    async fn fetch_user(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");

        let mut rows = self
            .db
            .connection()
            .query(&query, libsql::params![email])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(self.row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, email ASC");

        let _guard = self.db.read_lock().await;
        let mut rows = self.db.connection().query(&query, ()).await?;
        let mut users = Vec::new();

        while let Some(row) = rows.next().await? {
            users.push(self.row_to_user(&row)?);
        }

        Ok(users)
    }

    /// `None` if the user does not exist, otherwise the number of rows that
    /// actually changed (0 when already verified).
    pub async fn verify_user(&self, email: &str) -> Result<Option<u64>> {
        self.set_field(email, "status", UserStatus::Verified.as_str())
            .await
    }

    pub async fn set_role(&self, email: &str, role: Role) -> Result<Option<u64>> {
        self.set_field(email, "role", role.as_str()).await
    }

    async fn set_field(&self, email: &str, column: &str, value: &str) -> Result<Option<u64>> {
        let query = format!(
            r#"
            UPDATE users
            SET {column} = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE email = ? AND {column} != ?
        "#
        );

        let _guard = self.db.write_lock().await;
        if self.fetch_user(email).await?.is_none() {
            return Ok(None);
        }
        let modified = self
            .db
            .connection()
            .execute(&query, libsql::params![value, email, value])
            .await?;
        Ok(Some(modified))
    }

    fn row_to_user(&self, row: &libsql::Row) -> Result<User> {
        let status_str: String = row.get(3)?;
        let status = UserStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid user status: {}", status_str))?;
        let role_str: String = row.get(4)?;
        let role =
            Role::from_str(&role_str).ok_or_else(|| anyhow::anyhow!("Invalid role: {}", role_str))?;

        Ok(User {
            email: row.get(0)?,
            name: row.get(1)?,
            photo: row.get(2)?,
            status,
            role,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}
