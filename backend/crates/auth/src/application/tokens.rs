//! Access / refresh token issuing
//!
//! Tokens are stateless. The `token_type` claim keeps a refresh token from
//! being accepted as an access token and vice versa.

use std::sync::Arc;

use chrono::Duration;
use platform::token::{TokenCodec, TokenError};
use serde::{Deserialize, Serialize};

use crate::application::config::AuthConfig;
use crate::domain::value_object::role::{PrincipalKind, Role};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims minted by this service (`exp` / `iat` are added by the codec)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub role: Role,
    pub token_type: TokenType,
}

/// Claims as read off a bearer token before the role check
///
/// `id` and `role` may be missing or unknown; the identity resolver rejects
/// those with a 403 rather than a 401.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UncheckedClaims {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub token_type: Option<TokenType>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct TokenService {
    codec: Arc<TokenCodec>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(codec: Arc<TokenCodec>, config: &AuthConfig) -> Self {
        Self {
            codec,
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    /// Build the codec from `jwt_secret`; an empty secret is rejected
    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let codec = TokenCodec::new(&config.jwt_secret)?;
        Ok(Self::new(Arc::new(codec), config))
    }

    /// Shared codec (the rate limiter keys on token subjects)
    pub fn codec(&self) -> Arc<TokenCodec> {
        self.codec.clone()
    }

    pub fn issue_access(&self, id: i64, role: Role) -> AuthResult<String> {
        self.issue(id, role, TokenType::Access, self.access_ttl)
    }

    pub fn issue_pair(&self, id: i64, role: Role) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(id, role)?,
            refresh_token: self.issue(id, role, TokenType::Refresh, self.refresh_ttl)?,
        })
    }

    fn issue(&self, id: i64, role: Role, token_type: TokenType, ttl: Duration) -> AuthResult<String> {
        let claims = Claims {
            id,
            role,
            token_type,
        };
        self.codec
            .issue(&claims, ttl)
            .map_err(AuthError::TokenIssue)
    }

    /// Verify signature and expiry of a bearer token
    ///
    /// Any failure, including a refresh token presented here, is `InvalidToken`.
    pub fn decode_access(&self, token: &str) -> AuthResult<UncheckedClaims> {
        let claims: UncheckedClaims = self
            .codec
            .decode(token)
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.token_type == Some(TokenType::Refresh) {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Soft-fail check of a refresh token for principals of `kind`
    pub fn validate_refresh(&self, token: &str, kind: PrincipalKind) -> Option<Claims> {
        self.codec
            .validate_refresh::<Claims>(token)
            .filter(|claims| claims.token_type == TokenType::Refresh && kind.accepts(claims.role))
    }
}
