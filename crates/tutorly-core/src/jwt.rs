// JWT token service for locally minted credentials
// Decision: Use HS256 algorithm for simplicity (symmetric key)
// Decision: Every token carries a fresh jti so two credentials are never identical

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

use crate::identity::Identity;

/// Generate a random identifier string (32 hex characters)
fn generate_random_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    hex::encode(bytes)
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWTs
    pub secret: String,
    /// Access token lifetime
    pub access_token_lifetime: StdDuration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        Self {
            secret: hex::encode(bytes),
            access_token_lifetime: StdDuration::from_secs(60 * 60), // 1 hour
        }
    }
}

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessTokenClaims {
    /// Subject (identity uid)
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Token type
    pub token_type: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token ID
    pub jti: String,
}

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generate an access token for an identity
    pub fn generate_access_token(&self, identity: &Identity) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::from_std(self.config.access_token_lifetime)?;

        let claims = AccessTokenClaims {
            sub: identity.uid.clone(),
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            token_type: "access".to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: generate_random_id(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to encode access token")
    }

    /// Validate and decode an access token
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .context("Invalid access token")?;

        if token_data.claims.token_type != "access" {
            anyhow::bail!("Invalid token type");
        }

        Ok(token_data.claims)
    }

    /// Get access token lifetime in seconds
    pub fn access_token_lifetime_secs(&self) -> i64 {
        self.config.access_token_lifetime.as_secs() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            access_token_lifetime: StdDuration::from_secs(900), // 15 minutes
        }
    }

    #[test]
    fn test_generate_access_token() {
        let service = JwtService::new(test_config());
        let identity = Identity::new("u-1", "test@example.com").with_display_name("Test User");
        let token = service.generate_access_token(&identity).unwrap();

        assert!(!token.is_empty());

        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.name.as_deref(), Some("Test User"));
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.exp - claims.iat, service.access_token_lifetime_secs());
    }

    #[test]
    fn test_tokens_are_unique() {
        let service = JwtService::new(test_config());
        let identity = Identity::new("u-1", "test@example.com");
        let first = service.generate_access_token(&identity).unwrap();
        let second = service.generate_access_token(&identity).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new(test_config());
        assert!(service.validate_access_token("invalid-token").is_err());
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let service = JwtService::new(test_config());
        let other = JwtService::new(JwtConfig::default());
        let token = other
            .generate_access_token(&Identity::new("u-1", "test@example.com"))
            .unwrap();
        assert!(service.validate_access_token(&token).is_err());
    }
}
