//! Application Configuration
//!
//! Configuration for the Auth application layer. Built once at startup and
//! passed down explicitly.

use chrono::Duration;
use platform::password::{CredentialHasher, DEFAULT_COST, MIN_COST, PasswordHashError};

/// Shortest signing secret accepted by the startup checks
pub const MIN_SECRET_LENGTH: usize = 32;

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime (7 days)
    pub refresh_token_ttl: Duration,
    /// Password reset token lifetime (60 minutes)
    pub reset_token_ttl: Duration,
    /// bcrypt cost factor
    pub bcrypt_cost: u32,
    /// Base URL for links in emails
    pub frontend_url: String,
    /// Product name used in email subjects
    pub project_name: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("reset_token_ttl", &self.reset_token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("frontend_url", &self.frontend_url)
            .field("project_name", &self.project_name)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            reset_token_ttl: Duration::minutes(60),
            bcrypt_cost: DEFAULT_COST,
            frontend_url: "http://localhost:3000".to_string(),
            project_name: "Auth Service".to_string(),
        }
    }
}

impl AuthConfig {
    /// Create config with a random signing secret (for development)
    pub fn with_random_secret() -> Self {
        Self {
            jwt_secret: platform::crypto::random_url_token(48),
            ..Default::default()
        }
    }

    /// Random secret and the cheapest bcrypt cost
    pub fn development() -> Self {
        Self {
            bcrypt_cost: MIN_COST,
            ..Self::with_random_secret()
        }
    }

    pub fn secret_is_strong(&self) -> bool {
        self.jwt_secret.chars().count() >= MIN_SECRET_LENGTH
    }

    pub fn hasher(&self) -> Result<CredentialHasher, PasswordHashError> {
        CredentialHasher::new(self.bcrypt_cost)
    }

    /// Reset link placed in the email
    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.frontend_url.trim_end_matches('/'),
            token
        )
    }
}
