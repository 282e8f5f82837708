use crate::models::user::User;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user `{0}` not found")]
    NotFound(Uuid),
    #[error("user with email or username already exists")]
    AlreadyExists,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type UserResult<T> = Result<T, UserError>;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
}

/// Minimal user directory: just enough for ownership checks.
#[derive(Clone)]
pub struct UserService {
    pub db: Arc<SqlitePool>,
}

impl UserService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Register a user. Username is trimmed, email trimmed and lowercased.
    pub async fn create(&self, new: NewUser) -> UserResult<User> {
        let username = new.username.trim();
        let email = new.email.trim().to_lowercase();
        let full_name = new.full_name.trim();

        if username.is_empty() || email.is_empty() || full_name.is_empty() {
            return Err(UserError::Invalid("All fields are required".into()));
        }
        if !email.contains('@') {
            return Err(UserError::Invalid("Email is invalid".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email,
            full_name: full_name.to_string(),
            created_at: Utc::now(),
        };

        match sqlx::query(
            "INSERT INTO users (id, username, email, full_name, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.created_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => Err(UserError::AlreadyExists),
            Err(err) => Err(UserError::Sqlx(err)),
        }
    }

    pub async fn find(&self, id: Uuid) -> UserResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, email, full_name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?)
    }

    pub async fn get(&self, id: Uuid) -> UserResult<User> {
        self.find(id).await?.ok_or(UserError::NotFound(id))
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
