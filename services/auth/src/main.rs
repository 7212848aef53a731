use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod jwt;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod session;
mod validation;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    rbac::{PermissionResolver, Role},
    settings::ServerConfig,
};

use crate::{
    jwt::{JwtConfig, JwtService},
    models::NewUser,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    session::SessionManager,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub redis_pool: RedisPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub rate_limiter: RateLimiter,
    pub session_manager: SessionManager,
    pub resolver: Arc<PermissionResolver>,
}

/// Create the first super admin when the users table is empty
///
/// # Environment Variables
/// - `BOOTSTRAP_ADMIN_USERNAME`, `BOOTSTRAP_ADMIN_EMAIL`, `BOOTSTRAP_ADMIN_PASSWORD`
async fn bootstrap_admin(user_repository: &UserRepository) -> Result<()> {
    let (Ok(username), Ok(email), Ok(password)) = (
        std::env::var("BOOTSTRAP_ADMIN_USERNAME"),
        std::env::var("BOOTSTRAP_ADMIN_EMAIL"),
        std::env::var("BOOTSTRAP_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    if user_repository.count().await? > 0 {
        return Ok(());
    }

    let admin = NewUser {
        username,
        email,
        password,
    };
    let user = user_repository
        .create(&admin, &[Role::SuperAdmin.to_string()])
        .await?;
    warn!("Bootstrapped super admin account {}", user.username);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting authentication service");

    let server_config = ServerConfig::from_env("AUTH", "0.0.0.0:3000")?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    // Initialize JWT service
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(jwt_config)?;

    // Initialize Redis connection pool
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let user_repository = UserRepository::new(pool);
    bootstrap_admin(&user_repository).await?;

    let session_manager =
        SessionManager::new(redis_pool.clone(), jwt_service.refresh_token_expiry());
    if !session_manager.health_check().await? {
        anyhow::bail!("Redis did not answer PING");
    }

    let app_state = AppState {
        redis_pool,
        jwt_service,
        user_repository,
        rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
        session_manager,
        resolver: Arc::new(PermissionResolver::default()),
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    info!("Authentication service listening on {}", server_config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
