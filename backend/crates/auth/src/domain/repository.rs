//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the infrastructure layer.
//!
//! Every implementation maps unique-constraint races to the same field-specific
//! 409 errors the use cases raise on their pre-checks.

use chrono::{DateTime, Utc};
use kernel::id::{AdminId, PasswordResetTokenId, UserId};

use crate::domain::entity::{Admin, NewAdmin, NewUser, PasswordResetToken, User};
use crate::domain::value_object::password::PasswordHash;
use crate::error::AuthResult;

/// Listing filter for users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub is_active: Option<bool>,
}

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert and return the stored user
    async fn create(&self, user: NewUser) -> AuthResult<User>;

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>>;

    /// Exact, case-sensitive match
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Persist profile fields (`username`, `email`, `full_name`, `updated_at`)
    async fn update(&self, user: &User) -> AuthResult<()>;

    /// Persist `password_hash` and `updated_at`
    async fn update_password(&self, user: &User) -> AuthResult<()>;

    /// Newest first
    async fn list(&self, filter: UserFilter, limit: i64, offset: i64) -> AuthResult<Vec<User>>;

    async fn count(&self, filter: UserFilter) -> AuthResult<i64>;
}

/// Admin repository trait
#[trait_variant::make(AdminRepository: Send)]
pub trait LocalAdminRepository {
    async fn create(&self, admin: NewAdmin) -> AuthResult<Admin>;

    async fn find_by_id(&self, id: AdminId) -> AuthResult<Option<Admin>>;

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Admin>>;

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Admin>>;

    async fn count(&self) -> AuthResult<i64>;
}

/// Password reset token repository trait
#[trait_variant::make(PasswordResetRepository: Send)]
pub trait LocalPasswordResetRepository {
    /// Mark every unused token of `user_id` as used, then insert a new one.
    ///
    /// Both steps run in one transaction, so a user never holds two valid tokens.
    async fn issue(
        &self,
        user_id: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<PasswordResetToken>;

    async fn find_by_digest(&self, token_digest: &str) -> AuthResult<Option<PasswordResetToken>>;

    /// Mark the token used, store the new hash and stamp `updated_at`, atomically.
    ///
    /// Returns `false` (and writes nothing) if the token was no longer unused.
    async fn consume(
        &self,
        token_id: PasswordResetTokenId,
        user_id: UserId,
        new_hash: &PasswordHash,
    ) -> AuthResult<bool>;
}

/// Storage connectivity probe for `/health`
#[trait_variant::make(HealthCheck: Send)]
pub trait LocalHealthCheck {
    async fn ping(&self) -> AuthResult<()>;
}

/// Everything the HTTP layer needs from one storage backend
pub trait AuthStore:
    UserRepository + AdminRepository + PasswordResetRepository + HealthCheck + Sync + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository + AdminRepository + PasswordResetRepository + HealthCheck + Sync + 'static
{
}
