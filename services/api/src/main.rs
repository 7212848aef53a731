use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod allocator;
mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
mod validation;

use common::{
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    rbac::PermissionResolver,
    settings::ServerConfig,
};

use crate::{
    middleware::{JwtConfig, JwtVerifier},
    repositories::{FairRepository, StandRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting API service");

    let server_config = ServerConfig::from_env("API", "0.0.0.0:3001")?;

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

    let jwt_config = JwtConfig::from_env()?;
    let jwt_verifier = JwtVerifier::new(&jwt_config)?;

    let app_state = AppState {
        fair_repository: FairRepository::new(pool.clone()),
        stand_repository: StandRepository::new(pool),
        resolver: Arc::new(PermissionResolver::default()),
        jwt_verifier,
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    info!("API service listening on {}", server_config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
