//! Change Password Use Case

use std::sync::Arc;

use platform::password::CredentialHasher;

use crate::domain::entity::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::password::{PasswordHash, RawPassword};
use crate::error::{AuthError, AuthResult};

pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

pub struct ChangePassword<U>
where
    U: UserRepository,
{
    users: Arc<U>,
    hasher: CredentialHasher,
}

impl<U> ChangePassword<U>
where
    U: UserRepository,
{
    pub fn new(users: Arc<U>, hasher: CredentialHasher) -> Self {
        Self { users, hasher }
    }

    pub async fn execute(&self, mut user: User, input: ChangePasswordInput) -> AuthResult<User> {
        if !user
            .password_hash
            .verify_plain(&input.current_password, &self.hasher)
        {
            tracing::warn!(user_id = %user.id, "Password change failed: current password mismatch");
            return Err(AuthError::IncorrectPassword);
        }

        let new_password = RawPassword::for_field(input.new_password, "new_password")?;
        if user.password_hash.verify(&new_password, &self.hasher)? {
            return Err(AuthError::BadRequest(
                "New password must be different from current password".into(),
            ));
        }

        let hash = PasswordHash::from_raw(&new_password, &self.hasher)?;
        user.set_password_hash(hash);
        self.users.update_password(&user).await?;

        tracing::info!(user_id = %user.id, "Password changed");

        Ok(user)
    }
}
