//! Session management using Redis
//!
//! One session per user: the current refresh token, stored under
//! `session:<user id>` for the refresh token's lifetime.

use anyhow::Result;
use common::cache::RedisPool;
use tracing::info;
use uuid::Uuid;

fn session_key(user_id: Uuid) -> String {
    format!("session:{}", user_id)
}

/// Session manager for handling user sessions in Redis
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    ttl_seconds: u64,
}

impl SessionManager {
    /// Create a new session manager whose sessions live for `ttl_seconds`
    pub fn new(redis_pool: RedisPool, ttl_seconds: u64) -> Self {
        Self {
            redis_pool,
            ttl_seconds,
        }
    }

    /// Store (or replace) the session for a user
    pub async fn store_session(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Storing session for user: {}", user_id);

        self.redis_pool
            .set(&session_key(user_id), refresh_token, Some(self.ttl_seconds))
            .await
    }

    /// Delete a session for a user
    pub async fn delete_session(&self, user_id: Uuid) -> Result<()> {
        info!("Deleting session for user: {}", user_id);

        self.redis_pool.delete(&session_key(user_id)).await
    }

    /// Whether `refresh_token` is the user's current session
    pub async fn is_session_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool> {
        let stored_token = self.redis_pool.get(&session_key(user_id)).await?;

        Ok(stored_token.as_deref() == Some(refresh_token))
    }

    /// Get Redis health status
    pub async fn health_check(&self) -> Result<bool> {
        self.redis_pool.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::cache::RedisConfig;

    #[test]
    fn test_session_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            session_key(id),
            "session:00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_session_lifecycle() -> Result<()> {
        let pool = RedisPool::new(&RedisConfig::from_env()?).await?;
        let sessions = SessionManager::new(pool, 30);
        let user_id = Uuid::new_v4();

        sessions.store_session(user_id, "token-a").await?;
        assert!(sessions.is_session_valid(user_id, "token-a").await?);
        assert!(!sessions.is_session_valid(user_id, "token-b").await?);

        sessions.store_session(user_id, "token-b").await?;
        assert!(!sessions.is_session_valid(user_id, "token-a").await?);

        sessions.delete_session(user_id).await?;
        assert!(!sessions.is_session_valid(user_id, "token-b").await?);

        Ok(())
    }
}
