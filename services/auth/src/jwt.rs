//! JWT service for token generation, validation, and management
//!
//! Tokens are signed with RS256. Access tokens carry the user's role names and
//! the permissions computed from them at issue time; refresh tokens carry
//! neither. Used refresh tokens are blacklisted in Redis until they expire.

use anyhow::Result;
use common::cache::RedisPool;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use uuid::Uuid;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Private key for signing tokens
    pub private_key: String,
    /// Public key for verifying tokens
    pub public_key: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

/// Read a PEM value, or the file it names (relative to CWD, then the crate root)
fn read_pem(value: String, what: &str) -> Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value);
    }

    let contents = std::fs::read_to_string(&value)
        .or_else(|_| {
            let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            path.push(&value);
            std::fs::read_to_string(path)
        })
        .map_err(|e| anyhow::anyhow!("Failed to read {} file: {}", what, e))?;

    Ok(contents.trim().to_string())
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY`: Private key for signing tokens (PEM format) or path to private key file
    /// - `JWT_PUBLIC_KEY`: Public key for verifying tokens (PEM format) or path to public key file
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var("JWT_PRIVATE_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_PRIVATE_KEY environment variable not set"))?;
        let private_key = read_pem(private_key, "private key")?;

        let public_key = std::env::var("JWT_PUBLIC_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_PUBLIC_KEY environment variable not set"))?;
        let public_key = read_pem(public_key, "public key")?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(604800);

        Ok(JwtConfig {
            private_key,
            public_key,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User roles
    pub roles: Vec<String>,
    /// Permissions computed from `roles` when the token was issued
    pub permissions: Vec<String>,
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

/// Seconds since the Unix epoch
pub fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

fn blacklist_key(token: &str) -> String {
    format!("blacklisted_token:{}", token)
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        let token = encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        roles: &[String],
        permissions: &[String],
    ) -> Result<String> {
        let now = now_secs()?;

        self.sign(&Claims {
            sub: user_id,
            roles: roles.to_vec(),
            permissions: permissions.to_vec(),
            iat: now,
            exp: now + self.config.access_token_expiry,
            token_type: TokenType::Access,
        })
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String> {
        let now = now_secs()?;

        self.sign(&Claims {
            sub: user_id,
            roles: vec![],
            permissions: vec![],
            iat: now,
            exp: now + self.config.refresh_token_expiry,
            token_type: TokenType::Refresh,
        })
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Check if a token is blacklisted in Redis
    pub async fn is_token_blacklisted(&self, redis_pool: &RedisPool, token: &str) -> Result<bool> {
        redis_pool.exists(&blacklist_key(token)).await
    }

    /// Blacklist a token in Redis for `expiry` seconds
    pub async fn blacklist_token(
        &self,
        redis_pool: &RedisPool,
        token: &str,
        expiry: u64,
    ) -> Result<()> {
        redis_pool
            .set(&blacklist_key(token), "1", Some(expiry))
            .await
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }

    /// Rotate a refresh token
    ///
    /// Blacklists the old refresh token for its remaining lifetime and issues a
    /// new one for the same user.
    pub async fn rotate_refresh_token(
        &self,
        redis_pool: &RedisPool,
        user_id: Uuid,
        old_refresh_token: &str,
    ) -> Result<String> {
        let claims = self.validate_token(old_refresh_token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(anyhow::anyhow!("Token is not a refresh token"));
        }

        if claims.sub != user_id {
            return Err(anyhow::anyhow!("Token does not belong to user"));
        }

        let expiry = claims.exp.saturating_sub(now_secs()?);
        self.blacklist_token(redis_pool, old_refresh_token, expiry)
            .await?;

        info!("Rotated refresh token for user {}", user_id);
        self.generate_refresh_token(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const PRIVATE_KEY: &str = include_str!("../../../testdata/jwt_private.pem");
    const PUBLIC_KEY: &str = include_str!("../../../testdata/jwt_public.pem");

    fn test_config() -> JwtConfig {
        JwtConfig {
            private_key: PRIVATE_KEY.to_string(),
            public_key: PUBLIC_KEY.to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = JwtService::new(test_config()).unwrap();
        let user_id = Uuid::new_v4();
        let roles = vec!["fair_admin".to_string()];
        let permissions = vec!["fairs.create".to_string(), "fairs.read".to_string()];

        let token = service
            .generate_access_token(user_id, &roles, &permissions)
            .unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.roles, roles);
        assert_eq!(claims.permissions, permissions);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_refresh_token_carries_no_roles() {
        let service = JwtService::new(test_config()).unwrap();
        let user_id = Uuid::new_v4();

        let token = service.generate_refresh_token(user_id).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert!(claims.roles.is_empty());
        assert!(claims.permissions.is_empty());
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.exp - claims.iat, 604800);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = JwtService::new(test_config()).unwrap();
        let now = now_secs().unwrap();
        let token = service
            .sign(&Claims {
                sub: Uuid::new_v4(),
                roles: vec![],
                permissions: vec![],
                iat: now - 7200,
                exp: now - 3600,
                token_type: TokenType::Access,
            })
            .unwrap();

        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let service = JwtService::new(test_config()).unwrap();
        let token = service
            .generate_access_token(Uuid::new_v4(), &["volunteer".to_string()], &[])
            .unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        parts[2] = "c2lnbmF0dXJl";
        let tampered = parts.join(".");

        assert!(service.validate_token(&tampered).is_err());
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let config = JwtConfig {
            private_key: "not a key".to_string(),
            ..test_config()
        };
        assert!(JwtService::new(config).is_err());
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        unsafe {
            std::env::set_var("JWT_PRIVATE_KEY", PRIVATE_KEY);
            std::env::set_var("JWT_PUBLIC_KEY", PUBLIC_KEY);
            std::env::set_var("JWT_ACCESS_TOKEN_EXPIRY", "60");
            std::env::remove_var("JWT_REFRESH_TOKEN_EXPIRY");
        }

        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.private_key, PRIVATE_KEY);
        assert_eq!(config.access_token_expiry, 60);
        assert_eq!(config.refresh_token_expiry, 604800);

        unsafe {
            std::env::remove_var("JWT_PRIVATE_KEY");
            std::env::remove_var("JWT_PUBLIC_KEY");
            std::env::remove_var("JWT_ACCESS_TOKEN_EXPIRY");
        }
    }

    #[test]
    #[serial]
    fn test_jwt_config_reads_key_files() {
        unsafe {
            std::env::set_var("JWT_PRIVATE_KEY", "../../testdata/jwt_private.pem");
            std::env::set_var("JWT_PUBLIC_KEY", "../../testdata/jwt_public.pem");
        }

        let config = JwtConfig::from_env().unwrap();
        assert!(JwtService::new(config).is_ok());

        unsafe {
            std::env::remove_var("JWT_PRIVATE_KEY");
            std::env::remove_var("JWT_PUBLIC_KEY");
        }
    }
}
