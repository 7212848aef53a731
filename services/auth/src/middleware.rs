//! Bearer authentication for account management endpoints

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::error;

use crate::{AppState, jwt::TokenType, routes::AuthError};

/// Require a valid, non-blacklisted access token and expose its subject
///
/// Inserts the caller's user id (`Uuid`) into the request extensions. Roles are
/// not taken from the token; handlers reload them from the database.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::Unauthorized)?;
    let token = bearer.token();

    let claims = state.jwt_service.validate_token(token).map_err(|e| {
        error!("Failed to validate token: {}", e);
        AuthError::Unauthorized
    })?;

    if claims.token_type != TokenType::Access {
        return Err(AuthError::Unauthorized);
    }

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            AuthError::InternalServerError
        })?;

    if is_blacklisted {
        return Err(AuthError::Unauthorized);
    }

    req.extensions_mut().insert(claims.sub);

    Ok(next.run(req).await)
}
