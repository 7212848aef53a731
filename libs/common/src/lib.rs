//! Shared building blocks for the Tamarindo Park services
//!
//! Database connectivity and migrations, the Redis cache, error types, service
//! settings, and the role/permission resolver used by both the auth and api
//! services.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     println!("Database health check: {}", health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
pub mod rbac;
pub mod settings;
