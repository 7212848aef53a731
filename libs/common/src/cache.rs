//! Redis cache used for refresh-token sessions and the token blacklist
//!
//! Keys are namespaced by the callers (`session:<user>`, `blacklisted_token:<jwt>`);
//! this module only exposes string get/set with optional TTL.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Handle to a Redis server; cheap to clone
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Open a client for the configured server
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    /// Set a key-value pair with optional TTL
    ///
    /// A TTL of zero seconds stores nothing; the value would already be expired.
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.get_connection().await?;

        match ttl_seconds {
            Some(0) => {}
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }

        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> RedisConfig {
        RedisConfig {
            url: "redis://localhost:6379".to_string(),
        }
    }

    #[tokio::test]
    async fn test_client_open_rejects_bad_url() {
        let config = RedisConfig {
            url: "not a redis url".to_string(),
        };
        assert!(RedisPool::new(&config).await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_set_get_exists_delete() -> Result<()> {
        let pool = RedisPool::new(&local_config()).await?;
        assert!(pool.health_check().await?);

        let key = "tamarindo_test_key";
        pool.set(key, "value", Some(5)).await?;
        assert_eq!(pool.get(key).await?, Some("value".to_string()));
        assert!(pool.exists(key).await?);

        pool.delete(key).await?;
        assert_eq!(pool.get(key).await?, None);
        assert!(!pool.exists(key).await?);

        Ok(())
    }
}
