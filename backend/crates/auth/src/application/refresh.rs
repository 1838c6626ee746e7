//! Refresh Use Case
//!
//! Stateless: a valid refresh token of the right principal kind yields a new
//! access token with the same `id` and `role`. The refresh token itself is
//! not rotated.

use std::sync::Arc;

use crate::application::tokens::TokenService;
use crate::domain::value_object::role::PrincipalKind;
use crate::error::{AuthError, AuthResult};

pub struct RefreshAccess {
    tokens: Arc<TokenService>,
    kind: PrincipalKind,
}

impl RefreshAccess {
    pub fn new(tokens: Arc<TokenService>, kind: PrincipalKind) -> Self {
        Self { tokens, kind }
    }

    pub fn execute(&self, refresh_token: &str) -> AuthResult<String> {
        let claims = self
            .tokens
            .validate_refresh(refresh_token, self.kind)
            .ok_or(AuthError::InvalidRefreshToken)?;

        let access = self.tokens.issue_access(claims.id, claims.role)?;
        tracing::debug!(principal_id = claims.id, role = %claims.role, "Access token refreshed");
        Ok(access)
    }
}
