//! Identity Resolver
//!
//! Computed fresh on every request, nothing is cached:
//!
//! 1. Extract  - bearer token present, else 401 `MissingToken`
//! 2. Decode   - signature / expiry, else 401 `InvalidToken`
//! 3. Role     - `id` and a role of the expected kind, else 403
//! 4. Lookup   - principal exists, else 404
//! 5. Active   - `is_active`, else 403
//!
//! The `role` claim is the only discriminator between users and admins, so a
//! user token never resolves as an admin even when the ids collide.

use std::sync::Arc;

use kernel::id::{AdminId, UserId};

use crate::application::tokens::TokenService;
use crate::domain::entity::{Admin, Principal, User};
use crate::domain::repository::{AdminRepository, UserRepository};
use crate::domain::value_object::role::{PrincipalKind, Role};
use crate::error::{AuthError, AuthResult};

pub struct IdentityResolver<U, A>
where
    U: UserRepository,
    A: AdminRepository,
{
    users: Arc<U>,
    admins: Arc<A>,
    tokens: Arc<TokenService>,
}

impl<U, A> IdentityResolver<U, A>
where
    U: UserRepository,
    A: AdminRepository,
{
    pub fn new(users: Arc<U>, admins: Arc<A>, tokens: Arc<TokenService>) -> Self {
        Self {
            users,
            admins,
            tokens,
        }
    }

    /// Resolve the bearer token (already stripped of `Bearer `) into a principal of `kind`
    pub async fn resolve(&self, bearer: Option<&str>, kind: PrincipalKind) -> AuthResult<Principal> {
        let token = bearer.ok_or(AuthError::MissingToken)?;
        let claims = self.tokens.decode_access(token)?;

        let role = claims
            .role
            .as_deref()
            .and_then(Role::from_code)
            .filter(|role| kind.accepts(*role))
            .ok_or(AuthError::RoleMismatch(kind))?;
        let id = claims.id.ok_or(AuthError::RoleMismatch(kind))?;

        let principal = match kind {
            PrincipalKind::User => self
                .users
                .find_by_id(UserId::from_i64(id))
                .await?
                .map(Principal::User),
            PrincipalKind::Admin => self
                .admins
                .find_by_id(AdminId::from_i64(id))
                .await?
                .map(Principal::Admin),
        }
        .ok_or(AuthError::NotFound {
            resource: kind.label(),
            id,
        })?;

        if !principal.is_active() {
            tracing::warn!(principal_id = id, role = %role, "Inactive principal presented a valid token");
            return Err(AuthError::AccountInactive(kind));
        }

        tracing::debug!(principal_id = id, role = %role, "Principal resolved");
        Ok(principal)
    }

    pub async fn resolve_user(&self, bearer: Option<&str>) -> AuthResult<User> {
        self.resolve(bearer, PrincipalKind::User)
            .await?
            .into_user()
            .ok_or_else(|| AuthError::Internal("resolved principal is not a user".to_string()))
    }

    pub async fn resolve_admin(&self, bearer: Option<&str>) -> AuthResult<Admin> {
        self.resolve(bearer, PrincipalKind::Admin)
            .await?
            .into_admin()
            .ok_or_else(|| AuthError::Internal("resolved principal is not an admin".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::AuthConfig;
    use crate::domain::entity::{NewAdmin, NewUser};
    use crate::domain::value_object::{
        email::Email, password::PasswordHash, username::Username,
    };
    use crate::infra::memory::InMemoryAuthRepository;
    use chrono::Duration;
    use platform::token::TokenCodec;
    use serde::Serialize;

    struct Fixture {
        repo: Arc<InMemoryAuthRepository>,
        tokens: Arc<TokenService>,
        resolver: IdentityResolver<InMemoryAuthRepository, InMemoryAuthRepository>,
        codec: Arc<TokenCodec>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let tokens = Arc::new(TokenService::from_config(&AuthConfig::with_random_secret()).unwrap());
        Fixture {
            resolver: IdentityResolver::new(repo.clone(), repo.clone(), tokens.clone()),
            codec: tokens.codec(),
            repo,
            tokens,
        }
    }

    async fn add_user(repo: &InMemoryAuthRepository, name: &str, active: bool) -> User {
        let mut new = NewUser::new(
            Username::new(name).unwrap(),
            Email::new(format!("{name}@x.com")).unwrap(),
            None,
            PasswordHash::from_db("hash"),
        );
        new.is_active = active;
        UserRepository::create(repo, new).await.unwrap()
    }

    async fn add_admin(repo: &InMemoryAuthRepository, name: &str) -> Admin {
        let new = NewAdmin::new(
            Username::new(name).unwrap(),
            Email::new(format!("{name}@x.com")).unwrap(),
            PasswordHash::from_db("hash"),
            false,
        );
        AdminRepository::create(repo, new).await.unwrap()
    }

    #[tokio::test]
    async fn test_resolves_active_user() {
        let f = fixture();
        let user = add_user(&f.repo, "alice", true).await;
        let token = f.tokens.issue_access(user.id.as_i64(), user.role()).unwrap();

        let resolved = f.resolver.resolve_user(Some(&token)).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let f = fixture();
        let err = f.resolver.resolve(None, PrincipalKind::User).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let f = fixture();
        let err = f
            .resolver
            .resolve(Some("garbage"), PrincipalKind::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_user_token_on_admin_resolver_is_forbidden() {
        let f = fixture();
        let user = add_user(&f.repo, "alice", true).await;
        // an admin with the same id exists
        add_admin(&f.repo, "boss").await;
        let token = f.tokens.issue_access(user.id.as_i64(), user.role()).unwrap();

        let err = f
            .resolver
            .resolve(Some(&token), PrincipalKind::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RoleMismatch(PrincipalKind::Admin)));
    }

    #[tokio::test]
    async fn test_missing_role_is_forbidden() {
        #[derive(Serialize)]
        struct Bare {
            id: i64,
        }
        let f = fixture();
        let token = f.codec.issue(&Bare { id: 1 }, Duration::minutes(5)).unwrap();
        let err = f
            .resolver
            .resolve(Some(&token), PrincipalKind::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RoleMismatch(PrincipalKind::User)));
    }

    #[tokio::test]
    async fn test_unknown_subject_is_not_found() {
        let f = fixture();
        let token = f.tokens.issue_access(404, Role::User).unwrap();
        let err = f
            .resolver
            .resolve(Some(&token), PrincipalKind::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound { resource: "User", id: 404 }));
    }

    #[tokio::test]
    async fn test_inactive_user_is_forbidden() {
        let f = fixture();
        let user = add_user(&f.repo, "sleepy", false).await;
        let token = f.tokens.issue_access(user.id.as_i64(), user.role()).unwrap();
        let err = f
            .resolver
            .resolve(Some(&token), PrincipalKind::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive(PrincipalKind::User)));
    }

    #[tokio::test]
    async fn test_resolves_admin() {
        let f = fixture();
        let admin = add_admin(&f.repo, "boss").await;
        let token = f.tokens.issue_access(admin.id.as_i64(), admin.role()).unwrap();
        let resolved = f.resolver.resolve_admin(Some(&token)).await.unwrap();
        assert_eq!(resolved.username.as_str(), "boss");
    }
}
