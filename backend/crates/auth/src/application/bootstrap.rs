//! First superadmin
//!
//! `POST /admins/register` needs a superadmin, so the very first one is
//! created at startup from configuration. Nothing happens once any admin exists.

use std::sync::Arc;

use platform::password::CredentialHasher;

use crate::application::register::{RegisterAdmin, RegisterAdminInput};
use crate::domain::entity::Admin;
use crate::domain::repository::AdminRepository;
use crate::error::AuthResult;

/// Credentials of the initial superadmin
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

pub struct BootstrapSuperadmin<A>
where
    A: AdminRepository,
{
    admins: Arc<A>,
    hasher: CredentialHasher,
}

impl<A> BootstrapSuperadmin<A>
where
    A: AdminRepository,
{
    pub fn new(admins: Arc<A>, hasher: CredentialHasher) -> Self {
        Self { admins, hasher }
    }

    /// Returns the created admin, or `None` when admins already exist
    pub async fn execute(&self, input: BootstrapAdmin) -> AuthResult<Option<Admin>> {
        if self.admins.count().await? > 0 {
            tracing::debug!("Admins already present, skipping superadmin bootstrap");
            return Ok(None);
        }

        let admin = RegisterAdmin::new(self.admins.clone(), self.hasher)
            .execute(RegisterAdminInput {
                username: input.username,
                email: input.email,
                password: input.password,
                is_superadmin: true,
            })
            .await?;

        tracing::info!(admin_id = %admin.id, "Initial superadmin created");
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryAuthRepository;
    use platform::password::MIN_COST;

    fn input() -> BootstrapAdmin {
        BootstrapAdmin {
            username: "root".to_string(),
            email: "root@x.com".to_string(),
            password: "Sup3rSecret!".to_string(),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let bootstrap = BootstrapSuperadmin::new(repo.clone(), CredentialHasher::new(MIN_COST).unwrap());

        let admin = bootstrap.execute(input()).await.unwrap().unwrap();
        assert!(admin.is_superadmin);

        assert!(bootstrap.execute(input()).await.unwrap().is_none());
        assert_eq!(AdminRepository::count(&*repo).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_weak_password() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let bootstrap = BootstrapSuperadmin::new(repo.clone(), CredentialHasher::new(MIN_COST).unwrap());

        let weak = BootstrapAdmin {
            password: "short".to_string(),
            ..input()
        };
        tokio_test::assert_err!(bootstrap.execute(weak).await);
        assert_eq!(AdminRepository::count(&*repo).await.unwrap(), 0);
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", input());
        assert!(!debug.contains("Sup3rSecret!"));
    }
}
