//! Login Use Cases
//!
//! Unknown principal, inactive account and wrong password all collapse into
//! the same 401 so the response does not reveal which one failed.

use std::sync::Arc;

use platform::password::CredentialHasher;

use crate::application::tokens::{TokenPair, TokenService};
use crate::domain::entity::{Admin, User};
use crate::domain::repository::{AdminRepository, UserRepository};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

/// Login user input
pub struct LoginUserInput {
    pub username: String,
    pub password: String,
}

/// Login user use case
pub struct LoginUser<U>
where
    U: UserRepository,
{
    users: Arc<U>,
    hasher: CredentialHasher,
    tokens: Arc<TokenService>,
}

impl<U> LoginUser<U>
where
    U: UserRepository,
{
    pub fn new(users: Arc<U>, hasher: CredentialHasher, tokens: Arc<TokenService>) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    pub async fn execute(&self, input: LoginUserInput) -> AuthResult<(User, TokenPair)> {
        let user = match self.users.find_by_username(&input.username).await? {
            Some(user) if user.is_active => user,
            Some(_) => {
                tracing::warn!(username = %input.username, "Login failed: account inactive");
                self.hasher.verify_absent();
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                tracing::warn!(username = %input.username, "Login failed: unknown username");
                self.hasher.verify_absent();
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.password_hash.verify_plain(&input.password, &self.hasher) {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.tokens.issue_pair(user.id.as_i64(), user.role())?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok((user, pair))
    }
}

/// Login admin input (username takes precedence over email)
pub struct LoginAdminInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Login admin use case
pub struct LoginAdmin<A>
where
    A: AdminRepository,
{
    admins: Arc<A>,
    hasher: CredentialHasher,
    tokens: Arc<TokenService>,
}

impl<A> LoginAdmin<A>
where
    A: AdminRepository,
{
    pub fn new(admins: Arc<A>, hasher: CredentialHasher, tokens: Arc<TokenService>) -> Self {
        Self {
            admins,
            hasher,
            tokens,
        }
    }

    pub async fn execute(&self, input: LoginAdminInput) -> AuthResult<(Admin, TokenPair)> {
        let found = match (input.username.as_deref(), input.email) {
            (Some(username), _) => self.admins.find_by_username(username).await?,
            (None, Some(email)) => match Email::new(email) {
                Ok(email) => self.admins.find_by_email(email.as_str()).await?,
                Err(_) => None,
            },
            (None, None) => {
                return Err(AuthError::BadRequest(
                    "Either username or email must be provided".into(),
                ));
            }
        };

        let admin = match found {
            Some(admin) if admin.is_active => admin,
            _ => {
                tracing::warn!("Admin login failed: unknown or inactive account");
                self.hasher.verify_absent();
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !admin.password_hash.verify_plain(&input.password, &self.hasher) {
            tracing::warn!(admin_id = %admin.id, "Admin login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.tokens.issue_pair(admin.id.as_i64(), admin.role())?;

        tracing::info!(admin_id = %admin.id, "Admin logged in");

        Ok((admin, pair))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::AuthConfig;
    use crate::domain::entity::{NewAdmin, NewUser};
    use crate::domain::value_object::{
        password::{PasswordHash, RawPassword},
        role::Role,
        username::Username,
    };
    use crate::infra::memory::InMemoryAuthRepository;
    use platform::password::MIN_COST;

    const PASSWORD: &str = "Secur3Pass!";

    struct Fixture {
        repo: Arc<InMemoryAuthRepository>,
        hasher: CredentialHasher,
        tokens: Arc<TokenService>,
    }

    fn fixture() -> Fixture {
        Fixture {
            repo: Arc::new(InMemoryAuthRepository::new()),
            hasher: CredentialHasher::new(MIN_COST).unwrap(),
            tokens: Arc::new(TokenService::from_config(&AuthConfig::with_random_secret()).unwrap()),
        }
    }

    fn hash(hasher: &CredentialHasher) -> PasswordHash {
        PasswordHash::from_raw(&RawPassword::new(PASSWORD.to_string()).unwrap(), hasher).unwrap()
    }

    async fn add_user(f: &Fixture, active: bool) -> User {
        let mut new = NewUser::new(
            Username::new("alice").unwrap(),
            Email::new("alice@x.com").unwrap(),
            None,
            hash(&f.hasher),
        );
        new.is_active = active;
        UserRepository::create(&*f.repo, new).await.unwrap()
    }

    fn login(f: &Fixture, password: &str) -> (LoginUser<InMemoryAuthRepository>, LoginUserInput) {
        (
            LoginUser::new(f.repo.clone(), f.hasher, f.tokens.clone()),
            LoginUserInput {
                username: "alice".to_string(),
                password: password.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_login_issues_pair() {
        let f = fixture();
        let user = add_user(&f, true).await;
        let (use_case, input) = login(&f, PASSWORD);
        let (logged_in, pair) = use_case.execute(input).await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let claims = f.tokens.decode_access(&pair.access_token).unwrap();
        assert_eq!(claims.id, Some(user.id.as_i64()));
        assert_eq!(claims.role.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn test_wrong_password_and_inactive_are_indistinguishable() {
        let f = fixture();
        add_user(&f, true).await;
        let (use_case, input) = login(&f, "WrongPass1!");
        let wrong = use_case.execute(input).await.unwrap_err();

        let f = fixture();
        add_user(&f, false).await;
        let (use_case, input) = login(&f, PASSWORD);
        let inactive = use_case.execute(input).await.unwrap_err();

        let f = fixture();
        let (use_case, input) = login(&f, PASSWORD);
        let unknown = use_case.execute(input).await.unwrap_err();

        for err in [wrong, inactive, unknown] {
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn test_admin_login_by_email() {
        let f = fixture();
        let admin = AdminRepository::create(
            &*f.repo,
            NewAdmin::new(
                Username::new("boss").unwrap(),
                Email::new("boss@x.com").unwrap(),
                hash(&f.hasher),
                true,
            ),
        )
        .await
        .unwrap();

        let use_case = LoginAdmin::new(f.repo.clone(), f.hasher, f.tokens.clone());
        let (logged_in, pair) = use_case
            .execute(LoginAdminInput {
                username: None,
                email: Some("BOSS@x.com".to_string()),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, admin.id);
        let claims = f.tokens.decode_access(&pair.access_token).unwrap();
        assert_eq!(claims.role.as_deref(), Some(Role::Superadmin.code()));
    }

    #[tokio::test]
    async fn test_admin_login_requires_identifier() {
        let f = fixture();
        let use_case = LoginAdmin::new(f.repo.clone(), f.hasher, f.tokens.clone());
        let err = use_case
            .execute(LoginAdminInput {
                username: None,
                email: None,
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);
    }
}
