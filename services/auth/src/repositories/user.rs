//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

/// Errors raised while creating accounts
#[derive(Debug, Error)]
pub enum UserRepositoryError {
    #[error("Username or email already registered")]
    Duplicate,

    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Hash a plaintext password with argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String, UserRepositoryError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserRepositoryError::Hash(e.to_string()))
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user and attach the named roles in one transaction
    ///
    /// Role names must already exist in the `roles` table; unknown names are skipped.
    pub async fn create(
        &self,
        new_user: &NewUser,
        roles: &[String],
    ) -> Result<User, UserRepositoryError> {
        info!("Creating new user: {}", new_user.username);

        let password_hash = hash_password(&new_user.password)?;

        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => UserRepositoryError::Duplicate,
            _ => UserRepositoryError::Database(e),
        })?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE name = ANY($2)
            "#,
        )
        .bind(user.id)
        .bind(roles)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Created user {} with roles {:?}", user.id, roles);
        Ok(user)
    }

    /// Find a user by username or email
    pub async fn find_by_username_or_email(&self, username_or_email: &str) -> Result<Option<User>> {
        info!("Finding user by username or email: {}", username_or_email);

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1"
        ))
        .bind(username_or_email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        info!("Finding user by ID: {}", id);

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Role names held by a user, sorted
    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    /// Number of registered users
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Verify a user's password
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        verify_password_hash(&user.password_hash, password)
    }
}

/// Check a plaintext password against a stored argon2 hash
pub fn verify_password_hash(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("Str0ng!pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password_hash(&hash, "Str0ng!pass").unwrap());
        assert!(!verify_password_hash(&hash, "wrong").unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("Str0ng!pass").unwrap();
        let b = hash_password("Str0ng!pass").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password_hash("not-a-hash", "anything").is_err());
    }
}
