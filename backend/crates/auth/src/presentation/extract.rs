//! Principal extractors
//!
//! Each one runs the identity resolver against the request's bearer token.
//! Handlers that take one of these never see an unauthenticated request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use platform::client::bearer_token;

use crate::application::role_gate::{require_superadmin, require_superuser};
use crate::domain::entity::{Admin, Principal, User};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::role::PrincipalKind;
use crate::error::AuthError;
use crate::presentation::handlers::AuthAppState;

/// Any active user
pub struct CurrentUser(pub User);

/// Any active admin
pub struct CurrentAdmin(pub Admin);

/// Active user with `is_superuser`
pub struct SuperUser(pub User);

/// Active admin with `is_superadmin`
pub struct SuperAdmin(pub Admin);

async fn resolve<R: AuthStore>(
    parts: &Parts,
    state: &AuthAppState<R>,
    kind: PrincipalKind,
) -> Result<Principal, AuthError> {
    state
        .resolver()
        .resolve(bearer_token(&parts.headers), kind)
        .await
}

impl<R: AuthStore> FromRequestParts<AuthAppState<R>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthAppState<R>,
    ) -> Result<Self, Self::Rejection> {
        state
            .resolver()
            .resolve_user(bearer_token(&parts.headers))
            .await
            .map(Self)
    }
}

impl<R: AuthStore> FromRequestParts<AuthAppState<R>> for CurrentAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthAppState<R>,
    ) -> Result<Self, Self::Rejection> {
        state
            .resolver()
            .resolve_admin(bearer_token(&parts.headers))
            .await
            .map(Self)
    }
}

impl<R: AuthStore> FromRequestParts<AuthAppState<R>> for SuperUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthAppState<R>,
    ) -> Result<Self, Self::Rejection> {
        let principal = resolve(parts, state, PrincipalKind::User).await?;
        require_superuser(principal).map(Self)
    }
}

impl<R: AuthStore> FromRequestParts<AuthAppState<R>> for SuperAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthAppState<R>,
    ) -> Result<Self, Self::Rejection> {
        let principal = resolve(parts, state, PrincipalKind::Admin).await?;
        require_superadmin(principal).map(Self)
    }
}
