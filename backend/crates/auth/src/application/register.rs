//! Registration Use Cases
//!
//! Creates users and admins. Username is checked before email so the more
//! specific 409 wins; a unique-violation race in the repository maps to the
//! same errors.

use std::sync::Arc;

use platform::email::EmailQueue;
use platform::password::CredentialHasher;

use crate::application::config::AuthConfig;
use crate::application::mail;
use crate::domain::entity::{Admin, NewAdmin, NewUser, User};
use crate::domain::repository::{AdminRepository, UserRepository};
use crate::domain::value_object::{
    email::Email, full_name::FullName, password::{PasswordHash, RawPassword},
    username::Username,
};
use crate::error::{AuthError, AuthResult};

/// Register user input
pub struct RegisterUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Register user use case
pub struct RegisterUser<U>
where
    U: UserRepository,
{
    users: Arc<U>,
    hasher: CredentialHasher,
    mailer: EmailQueue,
    config: Arc<AuthConfig>,
}

impl<U> RegisterUser<U>
where
    U: UserRepository,
{
    pub fn new(
        users: Arc<U>,
        hasher: CredentialHasher,
        mailer: EmailQueue,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            users,
            hasher,
            mailer,
            config,
        }
    }

    pub async fn execute(&self, input: RegisterUserInput) -> AuthResult<User> {
        let username = Username::new(&input.username)?;
        let email = Email::new(input.email)?;
        let full_name = FullName::parse(input.full_name.as_deref())?;
        let password = RawPassword::new(input.password)?;

        if self.users.find_by_username(username.as_str()).await?.is_some() {
            tracing::warn!(username = %username, "Registration failed: username already exists");
            return Err(AuthError::UsernameTaken(username.into_inner()));
        }
        if self.users.find_by_email(email.as_str()).await?.is_some() {
            tracing::warn!(email = %email, "Registration failed: email already exists");
            return Err(AuthError::EmailTaken(email.into_db()));
        }

        let password_hash = PasswordHash::from_raw(&password, &self.hasher)?;
        let user = self
            .users
            .create(NewUser::new(username, email, full_name, password_hash))
            .await?;

        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            "User registered"
        );

        let display_name = user
            .full_name
            .as_ref()
            .map(|n| n.as_str())
            .unwrap_or(user.username.as_str());
        self.mailer
            .enqueue(mail::welcome(&self.config, user.email.as_str(), display_name));

        Ok(user)
    }
}

/// Register admin input
pub struct RegisterAdminInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_superadmin: bool,
}

/// Register admin use case (caller must already be a superadmin)
pub struct RegisterAdmin<A>
where
    A: AdminRepository,
{
    admins: Arc<A>,
    hasher: CredentialHasher,
}

impl<A> RegisterAdmin<A>
where
    A: AdminRepository,
{
    pub fn new(admins: Arc<A>, hasher: CredentialHasher) -> Self {
        Self { admins, hasher }
    }

    pub async fn execute(&self, input: RegisterAdminInput) -> AuthResult<Admin> {
        let username = Username::new(&input.username)?;
        let email = Email::new(input.email)?;
        let password = RawPassword::new(input.password)?;

        if self.admins.find_by_username(username.as_str()).await?.is_some() {
            tracing::warn!(username = %username, "Admin registration failed: username already exists");
            return Err(AuthError::UsernameTaken(username.into_inner()));
        }
        if self.admins.find_by_email(email.as_str()).await?.is_some() {
            tracing::warn!(email = %email, "Admin registration failed: email already exists");
            return Err(AuthError::EmailTaken(email.into_db()));
        }

        let password_hash = PasswordHash::from_raw(&password, &self.hasher)?;
        let admin = self
            .admins
            .create(NewAdmin::new(username, email, password_hash, input.is_superadmin))
            .await?;

        tracing::info!(
            admin_id = %admin.id,
            username = %admin.username,
            is_superadmin = admin.is_superadmin,
            "Admin registered"
        );

        Ok(admin)
    }
}
