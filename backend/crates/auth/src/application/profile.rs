//! Profile Update Use Case
//!
//! Partial update of the caller's own profile. Uniqueness is rechecked only
//! for values that actually change.

use std::sync::Arc;

use crate::domain::entity::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, full_name::FullName, username::Username};
use crate::error::{AuthError, AuthResult};

/// Absent fields are left untouched
#[derive(Debug, Default)]
pub struct UpdateProfileInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

pub struct UpdateProfile<U>
where
    U: UserRepository,
{
    users: Arc<U>,
}

impl<U> UpdateProfile<U>
where
    U: UserRepository,
{
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    pub async fn execute(&self, mut user: User, input: UpdateProfileInput) -> AuthResult<User> {
        // validate everything before touching storage
        let username = input.username.map(Username::new).transpose()?;
        let email = input.email.map(Email::new).transpose()?;
        let full_name = input
            .full_name
            .map(|name| FullName::parse(Some(&name)))
            .transpose()?;

        if let Some(username) = username {
            if username != user.username {
                if self.users.find_by_username(username.as_str()).await?.is_some() {
                    return Err(AuthError::UsernameTaken(username.into_inner()));
                }
                user.set_username(username);
            }
        }

        if let Some(email) = email {
            if email != user.email {
                if self.users.find_by_email(email.as_str()).await?.is_some() {
                    return Err(AuthError::EmailTaken(email.into_db()));
                }
                user.set_email(email);
            }
        }

        if let Some(full_name) = full_name {
            user.set_full_name(full_name);
        }

        user.touch();
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Profile updated");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::NewUser;
    use crate::domain::value_object::password::PasswordHash;
    use crate::infra::memory::InMemoryAuthRepository;

    async fn add_user(repo: &InMemoryAuthRepository, name: &str) -> User {
        UserRepository::create(
            repo,
            NewUser::new(
                Username::new(name).unwrap(),
                Email::new(format!("{name}@x.com")).unwrap(),
                None,
                PasswordHash::from_db("hash"),
            ),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_full_name_and_email() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let user = add_user(&repo, "alice").await;
        let created = user.updated_at;

        let updated = UpdateProfile::new(repo.clone())
            .execute(
                user,
                UpdateProfileInput {
                    email: Some("Alice@New.com".to_string()),
                    full_name: Some("Alice Liddell".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.email.as_str(), "alice@new.com");
        assert_eq!(updated.full_name.as_ref().map(|n| n.as_str()), Some("Alice Liddell"));
        assert!(updated.updated_at >= created);

        let stored = UserRepository::find_by_id(&*repo, updated.id).await.unwrap().unwrap();
        assert_eq!(stored.email.as_str(), "alice@new.com");
    }

    #[tokio::test]
    async fn test_same_username_is_not_a_conflict() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let user = add_user(&repo, "alice").await;
        let result = UpdateProfile::new(repo)
            .execute(
                user,
                UpdateProfileInput {
                    username: Some("alice".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_taken_username_conflicts() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let alice = add_user(&repo, "alice").await;
        add_user(&repo, "bob").await;

        let err = UpdateProfile::new(repo)
            .execute(
                alice,
                UpdateProfileInput {
                    username: Some("bob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken(_)));
        assert_eq!(err.status_code().as_u16(), 409);
    }
}
