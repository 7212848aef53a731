//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::rbac::{PermissionResolver, highest_role, permissions};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    jwt::{TokenType, now_secs},
    middleware::auth_middleware,
    models::{RegisterRequest, UserResponse},
    repositories::UserRepositoryError,
    validation::validate_registration,
};

/// Response for token generation
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request carrying a refresh token
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub username: String,
    pub password: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/register", post(register))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Issue an access/refresh token pair and store the session
async fn issue_tokens(state: &AppState, user_id: Uuid) -> Result<TokenResponse, AuthError> {
    let roles = state
        .user_repository
        .roles_for_user(user_id)
        .await
        .map_err(|e| {
            error!("Failed to load roles for user {}: {}", user_id, e);
            AuthError::InternalServerError
        })?;
    let permissions = state.resolver.permissions_for_roles(&roles);

    let access_token = state
        .jwt_service
        .generate_access_token(user_id, &roles, &permissions)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            AuthError::InternalServerError
        })?;

    let refresh_token = state
        .jwt_service
        .generate_refresh_token(user_id)
        .map_err(|e| {
            error!("Failed to generate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .store_session(user_id, &refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to store session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    })
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Login attempt for user: {}", payload.username);

    let limiter_key = payload.username.to_lowercase();
    let allowed = state
        .rate_limiter
        .is_allowed(&limiter_key)
        .await
        .map_err(|e| {
            error!("Rate limiter failure: {}", e);
            AuthError::InternalServerError
        })?;

    if !allowed {
        warn!("Too many login attempts for {}", payload.username);
        return Err(AuthError::TooManyRequests);
    }

    let user = state
        .user_repository
        .find_by_username_or_email(&payload.username)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    let valid = state
        .user_repository
        .verify_password(&user, &payload.password)
        .map_err(|e| {
            error!("Failed to verify password for user {}: {}", user.id, e);
            AuthError::InternalServerError
        })?;

    if !valid {
        return Err(AuthError::Unauthorized);
    }

    state.rate_limiter.reset(&limiter_key).await;

    let response = issue_tokens(&state, user.id).await?;
    info!("User {} logged in", user.id);

    Ok((StatusCode::OK, Json(response)))
}

/// Refresh token endpoint
///
/// Roles are reloaded from the database so role changes apply on the next refresh.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Token refresh request");

    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            AuthError::InternalServerError
        })?;

    if is_blacklisted {
        return Err(AuthError::Unauthorized);
    }

    let session_valid = state
        .session_manager
        .is_session_valid(claims.sub, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to read session from Redis: {}", e);
            AuthError::InternalServerError
        })?;

    if !session_valid {
        return Err(AuthError::Unauthorized);
    }

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    let roles = state
        .user_repository
        .roles_for_user(user.id)
        .await
        .map_err(|e| {
            error!("Failed to load roles for user {}: {}", user.id, e);
            AuthError::InternalServerError
        })?;
    let permissions = state.resolver.permissions_for_roles(&roles);

    let access_token = state
        .jwt_service
        .generate_access_token(user.id, &roles, &permissions)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            AuthError::InternalServerError
        })?;

    let new_refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, user.id, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .store_session(user.id, &new_refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to update session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    let response = TokenResponse {
        access_token,
        refresh_token: new_refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Logout request");

    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let now = now_secs().map_err(|e| {
        error!("Failed to get current time: {}", e);
        AuthError::InternalServerError
    })?;

    let expiry = claims.exp.saturating_sub(now);
    state
        .jwt_service
        .blacklist_token(&state.redis_pool, &payload.refresh_token, expiry)
        .await
        .map_err(|e| {
            error!("Failed to blacklist token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .delete_session(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to remove session from Redis: {}", e);
            AuthError::InternalServerError
        })?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Decide whether a granter holding `granter_roles` may create an account with `requested`
///
/// The granter needs `users.create`, and its highest role must be allowed to
/// assign every requested role.
pub fn authorize_registration(
    resolver: &PermissionResolver,
    granter_roles: &[String],
    requested: &[String],
) -> Result<(), AuthError> {
    resolver
        .require_permission(granter_roles, permissions::USERS_CREATE)
        .map_err(|denied| AuthError::Forbidden(denied.to_string()))?;

    let granter_role = highest_role(granter_roles);
    match requested
        .iter()
        .find(|role| !resolver.can_assign_role(granter_role.as_str(), role))
    {
        Some(role) => Err(AuthError::Forbidden(format!("Cannot assign role: {}", role))),
        None => Ok(()),
    }
}

/// Account registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Extension(granter_id): Extension<Uuid>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Registration of {} requested by {}", payload.username, granter_id);

    validate_registration(&payload).map_err(AuthError::BadRequest)?;

    let granter_roles = state
        .user_repository
        .roles_for_user(granter_id)
        .await
        .map_err(|e| {
            error!("Failed to load roles for user {}: {}", granter_id, e);
            AuthError::InternalServerError
        })?;

    authorize_registration(&state.resolver, &granter_roles, &payload.roles).inspect_err(|e| {
        warn!("User {} refused registration of {}: {:?}", granter_id, payload.username, e);
    })?;

    let (new_user, mut roles) = payload.into_parts();
    roles.sort();
    roles.dedup();

    let user = state
        .user_repository
        .create(&new_user, &roles)
        .await
        .map_err(|e| {
            if matches!(e, UserRepositoryError::Duplicate) {
                return AuthError::Conflict(e.to_string());
            }
            error!("Failed to create user: {}", e);
            AuthError::InternalServerError
        })?;

    Ok((StatusCode::CREATED, Json(UserResponse::new(user, roles))))
}

/// Custom error type for authentication errors
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    TooManyRequests,
    InternalServerError,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AuthError::Unauthorized => "Unauthorized".to_string(),
            AuthError::Forbidden(message)
            | AuthError::BadRequest(message)
            | AuthError::Conflict(message) => message,
            AuthError::TooManyRequests => "Too many login attempts".to_string(),
            AuthError::InternalServerError => "Internal server error".to_string(),
        };

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
