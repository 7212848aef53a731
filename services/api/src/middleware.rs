//! Authentication middleware for JWT token validation
//!
//! Tokens are issued by the auth service. Only the role names are taken from
//! the claims; permissions are recomputed from those roles on every request.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use common::rbac::HasRoles;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User roles
    pub roles: Vec<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<String>,
    /// Computed from `roles` by the permission resolver
    pub permissions: Vec<String>,
}

impl HasRoles for AuthUser {
    fn role_names(&self) -> &[String] {
        &self.roles
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Public key for verifying tokens
    pub public_key: String,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PUBLIC_KEY`: Public key (PEM format) or path to a PEM file
    pub fn from_env() -> anyhow::Result<Self> {
        let public_key = env::var("JWT_PUBLIC_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_PUBLIC_KEY environment variable not set"))?;

        // If the public key looks like a file path, read from file (try CWD, then project root)
        let public_key = if public_key.starts_with("-----BEGIN") {
            public_key
        } else {
            std::fs::read_to_string(&public_key)
                .or_else(|_| {
                    let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
                    path.push(&public_key);
                    std::fs::read_to_string(path)
                })
                .map_err(|e| anyhow::anyhow!("Failed to read public key file: {}", e))?
                .trim()
                .to_string()
        };

        Ok(JwtConfig { public_key })
    }
}

/// Verifies RS256 access tokens
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Build a verifier from the configured public key
    pub fn new(config: &JwtConfig) -> anyhow::Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Decode and validate an access token
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                warn!("Failed to validate token: {}", e);
                ApiError::Unauthorized
            })?
            .claims;

        if claims.token_type != TokenType::Access {
            warn!("Rejected non-access token for user {}", claims.sub);
            return Err(ApiError::Unauthorized);
        }

        Ok(claims)
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.jwt_verifier.verify_access_token(token)?;

    let permissions = state.resolver.permissions_for_roles(&claims.roles);
    debug!(
        "Authenticated user {} with roles {:?}",
        claims.sub, claims.roles
    );

    let user = AuthUser {
        id: claims.sub,
        roles: claims.roles,
        permissions,
    };

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
