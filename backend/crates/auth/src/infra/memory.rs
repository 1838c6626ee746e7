//! In-memory Repository
//!
//! Same semantics as [`PgAuthRepository`](super::postgres::PgAuthRepository),
//! uniqueness included, behind a single `RwLock` so multi-step writes are atomic.
//! Used by tests and local experiments without a database.

use chrono::{DateTime, Utc};
use kernel::id::{AdminId, PasswordResetTokenId, UserId};
use tokio::sync::RwLock;

use crate::domain::entity::{Admin, NewAdmin, NewUser, PasswordResetToken, User};
use crate::domain::repository::{
    AdminRepository, HealthCheck, PasswordResetRepository, UserFilter, UserRepository,
};
use crate::domain::value_object::password::PasswordHash;
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    admins: Vec<Admin>,
    reset_tokens: Vec<PasswordResetToken>,
    // Serial sequences, one per table
    user_seq: i64,
    admin_seq: i64,
    token_seq: i64,
}

impl Tables {
    fn user_conflict(&self, username: &str, email: &str, except: Option<UserId>) -> Option<AuthError> {
        let others = || self.users.iter().filter(move |u| Some(u.id) != except);
        if others().any(|u| u.username.as_str() == username) {
            return Some(AuthError::UsernameTaken(username.to_string()));
        }
        if others().any(|u| u.email.as_str() == email) {
            return Some(AuthError::EmailTaken(email.to_string()));
        }
        None
    }
}

#[derive(Default)]
pub struct InMemoryAuthRepository {
    tables: RwLock<Tables>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every reset token ever issued to `user_id`, oldest first
    pub async fn reset_tokens_for(&self, user_id: UserId) -> Vec<PasswordResetToken> {
        self.tables
            .read()
            .await
            .reset_tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Move `expires_at` of every token of `user_id`
    pub async fn expire_reset_tokens_for(&self, user_id: UserId, expires_at: DateTime<Utc>) {
        let mut tables = self.tables.write().await;
        for token in tables.reset_tokens.iter_mut().filter(|t| t.user_id == user_id) {
            token.expires_at = expires_at;
        }
    }

    /// Toggle `is_active` without going through a use case
    pub async fn set_user_active(&self, user_id: UserId, active: bool) {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.is_active = active;
        }
    }

    /// Grant or revoke `is_superuser`. No endpoint does this.
    pub async fn set_user_superuser(&self, user_id: UserId, superuser: bool) {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.is_superuser = superuser;
        }
    }
}

impl UserRepository for InMemoryAuthRepository {
    async fn create(&self, user: NewUser) -> AuthResult<User> {
        let mut tables = self.tables.write().await;
        if let Some(err) = tables.user_conflict(user.username.as_str(), user.email.as_str(), None) {
            return Err(err);
        }
        tables.user_seq += 1;
        let user = user.into_user(UserId::from_i64(tables.user_seq), Utc::now());
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.username.as_str() == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email.as_str() == email).cloned())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(err) = tables.user_conflict(user.username.as_str(), user.email.as_str(), Some(user.id)) {
            return Err(err);
        }
        let stored = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(AuthError::NotFound {
                resource: "User",
                id: user.id.as_i64(),
            })?;
        stored.username = user.username.clone();
        stored.email = user.email.clone();
        stored.full_name = user.full_name.clone();
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn update_password(&self, user: &User) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(AuthError::NotFound {
                resource: "User",
                id: user.id.as_i64(),
            })?;
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn list(&self, filter: UserFilter, limit: i64, offset: i64) -> AuthResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .iter()
            .filter(|u| filter.is_active.is_none_or(|active| u.is_active == active))
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_i64().cmp(&a.id.as_i64()))
        });
        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, filter: UserFilter) -> AuthResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .users
            .iter()
            .filter(|u| filter.is_active.is_none_or(|active| u.is_active == active))
            .count();
        Ok(count as i64)
    }
}

impl AdminRepository for InMemoryAuthRepository {
    async fn create(&self, admin: NewAdmin) -> AuthResult<Admin> {
        let mut tables = self.tables.write().await;
        if tables.admins.iter().any(|a| a.username == admin.username) {
            return Err(AuthError::UsernameTaken(admin.username.into_inner()));
        }
        if tables.admins.iter().any(|a| a.email == admin.email) {
            return Err(AuthError::EmailTaken(admin.email.into_db()));
        }
        tables.admin_seq += 1;
        let admin = admin.into_admin(AdminId::from_i64(tables.admin_seq), Utc::now());
        tables.admins.push(admin.clone());
        Ok(admin)
    }

    async fn find_by_id(&self, id: AdminId) -> AuthResult<Option<Admin>> {
        let tables = self.tables.read().await;
        Ok(tables.admins.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Admin>> {
        let tables = self.tables.read().await;
        Ok(tables
            .admins
            .iter()
            .find(|a| a.username.as_str() == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Admin>> {
        let tables = self.tables.read().await;
        Ok(tables.admins.iter().find(|a| a.email.as_str() == email).cloned())
    }

    async fn count(&self) -> AuthResult<i64> {
        Ok(self.tables.read().await.admins.len() as i64)
    }
}

impl PasswordResetRepository for InMemoryAuthRepository {
    async fn issue(
        &self,
        user_id: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<PasswordResetToken> {
        let mut tables = self.tables.write().await;
        for token in tables
            .reset_tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && !t.used)
        {
            token.used = true;
        }

        tables.token_seq += 1;
        let token = PasswordResetToken {
            id: PasswordResetTokenId::from_i64(tables.token_seq),
            user_id,
            token_digest: token_digest.to_string(),
            expires_at,
            used: false,
            created_at: Utc::now(),
        };
        tables.reset_tokens.push(token.clone());
        Ok(token)
    }

    async fn find_by_digest(&self, token_digest: &str) -> AuthResult<Option<PasswordResetToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_tokens
            .iter()
            .find(|t| t.token_digest == token_digest)
            .cloned())
    }

    async fn consume(
        &self,
        token_id: PasswordResetTokenId,
        user_id: UserId,
        new_hash: &PasswordHash,
    ) -> AuthResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(token) = tables
            .reset_tokens
            .iter_mut()
            .find(|t| t.id == token_id && t.user_id == user_id && !t.used)
        else {
            return Ok(false);
        };
        token.used = true;

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::NotFound {
                resource: "User",
                id: user_id.as_i64(),
            })?;
        user.set_password_hash(new_hash.clone());
        Ok(true)
    }
}

impl HealthCheck for InMemoryAuthRepository {
    async fn ping(&self) -> AuthResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{email::Email, username::Username};
    use chrono::Duration;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser::new(
            Username::new(name).unwrap(),
            Email::new(email).unwrap(),
            None,
            PasswordHash::from_db("hash"),
        )
    }

    #[tokio::test]
    async fn test_user_and_admin_ids_are_independent() {
        let repo = InMemoryAuthRepository::new();
        let user = UserRepository::create(&repo, new_user("alice", "alice@x.com"))
            .await
            .unwrap();
        let admin = AdminRepository::create(
            &repo,
            NewAdmin::new(
                Username::new("alice").unwrap(),
                Email::new("alice@x.com").unwrap(),
                PasswordHash::from_db("hash"),
                false,
            ),
        )
        .await
        .unwrap();
        assert_eq!(user.id.as_i64(), 1);
        assert_eq!(admin.id.as_i64(), 1);
    }

    #[tokio::test]
    async fn test_update_enforces_uniqueness() {
        let repo = InMemoryAuthRepository::new();
        UserRepository::create(&repo, new_user("alice", "alice@x.com")).await.unwrap();
        let mut bob = UserRepository::create(&repo, new_user("bob", "bob@x.com")).await.unwrap();

        bob.set_email(Email::new("alice@x.com").unwrap());
        let err = UserRepository::update(&repo, &bob).await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn test_issue_supersedes_and_consume_is_single_use() {
        let repo = InMemoryAuthRepository::new();
        let user = UserRepository::create(&repo, new_user("alice", "alice@x.com")).await.unwrap();
        let expires = Utc::now() + Duration::minutes(60);

        let first = repo.issue(user.id, "d1", expires).await.unwrap();
        let second = repo.issue(user.id, "d2", expires).await.unwrap();

        let tokens = repo.reset_tokens_for(user.id).await;
        assert!(tokens[0].used);
        assert!(!tokens[1].used);

        let hash = PasswordHash::from_db("new-hash");
        assert!(!repo.consume(first.id, user.id, &hash).await.unwrap());
        assert!(repo.consume(second.id, user.id, &hash).await.unwrap());
        assert!(!repo.consume(second.id, user.id, &hash).await.unwrap());

        let stored = UserRepository::find_by_id(&repo, user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash.as_str(), "new-hash");
    }
}
