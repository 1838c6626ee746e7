//! Password Reset Use Cases
//!
//! 状態遷移: none → issued → (used | expired | superseded)
//!
//! - Forgot: 登録有無に関わらず同じメッセージを返す (アカウント列挙対策)
//! - Reset: 使用済み・期限切れ・存在しないトークンは同一の 400
//!
//! The emailed token is random; only its SHA-256 digest is stored.

use std::sync::Arc;

use chrono::Utc;
use platform::crypto::{random_url_token, sha256_hex};
use platform::email::EmailQueue;
use platform::password::CredentialHasher;

use crate::application::config::AuthConfig;
use crate::application::mail;
use crate::domain::repository::{PasswordResetRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    password::{PasswordHash, RawPassword},
    role::PrincipalKind,
};
use crate::error::{AuthError, AuthResult};

/// Random bytes in an emailed reset token
pub const RESET_TOKEN_BYTES: usize = 32;

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If your email is registered, you will receive a password reset link shortly.";

pub const RESET_PASSWORD_MESSAGE: &str =
    "Password has been reset successfully. You can now login with your new password.";

pub fn digest(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

pub struct ForgotPassword<U, P>
where
    U: UserRepository,
    P: PasswordResetRepository,
{
    users: Arc<U>,
    resets: Arc<P>,
    mailer: EmailQueue,
    config: Arc<AuthConfig>,
}

impl<U, P> ForgotPassword<U, P>
where
    U: UserRepository,
    P: PasswordResetRepository,
{
    pub fn new(users: Arc<U>, resets: Arc<P>, mailer: EmailQueue, config: Arc<AuthConfig>) -> Self {
        Self {
            users,
            resets,
            mailer,
            config,
        }
    }

    /// Always returns [`FORGOT_PASSWORD_MESSAGE`] unless the email is malformed
    /// or storage fails
    pub async fn execute(&self, email: String) -> AuthResult<&'static str> {
        let email = Email::new(email)?;

        let user = match self.users.find_by_email(email.as_str()).await? {
            Some(user) if user.is_active => user,
            Some(user) => {
                tracing::info!(user_id = %user.id, "Password reset requested for inactive account");
                return Ok(FORGOT_PASSWORD_MESSAGE);
            }
            None => {
                tracing::info!("Password reset requested for unknown email");
                return Ok(FORGOT_PASSWORD_MESSAGE);
            }
        };

        let token = random_url_token(RESET_TOKEN_BYTES);
        let expires_at = Utc::now() + self.config.reset_token_ttl;
        let issued = self
            .resets
            .issue(user.id, &digest(&token), expires_at)
            .await?;

        let display_name = user
            .full_name
            .as_ref()
            .map(|n| n.as_str())
            .unwrap_or(user.email.as_str());
        self.mailer.enqueue(mail::password_reset(
            &self.config,
            user.email.as_str(),
            display_name,
            &token,
        ));

        tracing::info!(
            user_id = %user.id,
            token_id = %issued.id,
            expires_at = %issued.expires_at,
            "Password reset token issued"
        );

        Ok(FORGOT_PASSWORD_MESSAGE)
    }
}

pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
}

pub struct ResetPassword<U, P>
where
    U: UserRepository,
    P: PasswordResetRepository,
{
    users: Arc<U>,
    resets: Arc<P>,
    hasher: CredentialHasher,
}

impl<U, P> ResetPassword<U, P>
where
    U: UserRepository,
    P: PasswordResetRepository,
{
    pub fn new(users: Arc<U>, resets: Arc<P>, hasher: CredentialHasher) -> Self {
        Self {
            users,
            resets,
            hasher,
        }
    }

    pub async fn execute(&self, input: ResetPasswordInput) -> AuthResult<&'static str> {
        let token = self
            .resets
            .find_by_digest(&digest(&input.token))
            .await?
            .filter(|token| token.is_valid())
            .ok_or(AuthError::InvalidResetToken)?;

        let user = self
            .users
            .find_by_id(token.user_id)
            .await?
            .ok_or(AuthError::NotFound {
                resource: "User",
                id: token.user_id.as_i64(),
            })?;
        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Password reset refused: account inactive");
            return Err(AuthError::AccountInactive(PrincipalKind::User));
        }

        let new_password = RawPassword::for_field(input.new_password, "new_password")?;
        let hash = PasswordHash::from_raw(&new_password, &self.hasher)?;

        // lost the race against a concurrent reset with the same token
        if !self.resets.consume(token.id, user.id, &hash).await? {
            return Err(AuthError::InvalidResetToken);
        }

        tracing::info!(user_id = %user.id, token_id = %token.id, "Password reset completed");

        Ok(RESET_PASSWORD_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{NewUser, User};
    use crate::domain::value_object::username::Username;
    use crate::infra::memory::InMemoryAuthRepository;
    use platform::email::OutgoingEmail;
    use platform::password::MIN_COST;
    use tokio::sync::mpsc::UnboundedReceiver;

    const OLD: &str = "OldPass123!";

    struct Fixture {
        repo: Arc<InMemoryAuthRepository>,
        hasher: CredentialHasher,
        forgot: ForgotPassword<InMemoryAuthRepository, InMemoryAuthRepository>,
        reset: ResetPassword<InMemoryAuthRepository, InMemoryAuthRepository>,
        outbox: UnboundedReceiver<OutgoingEmail>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let hasher = CredentialHasher::new(MIN_COST).unwrap();
        let (mailer, outbox) = EmailQueue::channel();
        let config = Arc::new(AuthConfig::development());
        Fixture {
            forgot: ForgotPassword::new(repo.clone(), repo.clone(), mailer, config),
            reset: ResetPassword::new(repo.clone(), repo.clone(), hasher),
            repo,
            hasher,
            outbox,
        }
    }

    async fn add_user(f: &Fixture, name: &str, active: bool) -> User {
        let hash = PasswordHash::from_raw(&RawPassword::new(OLD.to_string()).unwrap(), &f.hasher)
            .unwrap();
        let mut new = NewUser::new(
            Username::new(name).unwrap(),
            Email::new(format!("{name}@x.com")).unwrap(),
            None,
            hash,
        );
        new.is_active = active;
        UserRepository::create(&*f.repo, new).await.unwrap()
    }

    /// Pull the plaintext token out of the reset link in the email body
    fn token_from(email: &OutgoingEmail) -> String {
        let start = email.body.find("token=").unwrap() + "token=".len();
        email.body[start..]
            .split_whitespace()
            .next()
            .unwrap()
            .to_string()
    }

    fn reset_input(token: &str, new_password: &str) -> ResetPasswordInput {
        ResetPasswordInput {
            token: token.to_string(),
            new_password: new_password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_forgot_and_reset() {
        let mut f = fixture();
        let user = add_user(&f, "alice", true).await;

        let message = f.forgot.execute("alice@x.com".to_string()).await.unwrap();
        assert_eq!(message, FORGOT_PASSWORD_MESSAGE);

        let email = f.outbox.recv().await.unwrap();
        assert_eq!(email.to, "alice@x.com");
        let token = token_from(&email);

        // only the digest is stored
        let stored = f.repo.reset_tokens_for(user.id).await;
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].token_digest, token);

        let message = f.reset.execute(reset_input(&token, "NewPass456!")).await.unwrap();
        assert_eq!(message, RESET_PASSWORD_MESSAGE);

        let user = UserRepository::find_by_id(&*f.repo, user.id).await.unwrap().unwrap();
        assert!(user.password_hash.verify_plain("NewPass456!", &f.hasher));
    }

    #[tokio::test]
    async fn test_second_request_supersedes_first() {
        let mut f = fixture();
        let user = add_user(&f, "alice", true).await;

        f.forgot.execute("alice@x.com".to_string()).await.unwrap();
        let first = token_from(&f.outbox.recv().await.unwrap());
        f.forgot.execute("alice@x.com".to_string()).await.unwrap();
        let second = token_from(&f.outbox.recv().await.unwrap());

        let tokens = f.repo.reset_tokens_for(user.id).await;
        assert_eq!(tokens.iter().filter(|t| t.is_valid()).count(), 1);

        let err = f.reset.execute(reset_input(&first, "NewPass456!")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetToken));
        assert!(f.reset.execute(reset_input(&second, "NewPass456!")).await.is_ok());
    }

    #[tokio::test]
    async fn test_replayed_token_is_rejected() {
        let mut f = fixture();
        add_user(&f, "alice", true).await;
        f.forgot.execute("alice@x.com".to_string()).await.unwrap();
        let token = token_from(&f.outbox.recv().await.unwrap());

        f.reset.execute(reset_input(&token, "NewPass456!")).await.unwrap();
        for _ in 0..2 {
            let err = f.reset.execute(reset_input(&token, "Another789!")).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidResetToken));
        }
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_emails_look_the_same() {
        let mut f = fixture();
        add_user(&f, "sleepy", false).await;

        let unknown = f.forgot.execute("nobody@x.com".to_string()).await.unwrap();
        let inactive = f.forgot.execute("sleepy@x.com".to_string()).await.unwrap();
        assert_eq!(unknown, inactive);
        assert!(f.outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_expired_token_leaves_password_unchanged() {
        let mut f = fixture();
        let user = add_user(&f, "alice", true).await;
        f.forgot.execute("alice@x.com".to_string()).await.unwrap();
        let token = token_from(&f.outbox.recv().await.unwrap());

        f.repo
            .expire_reset_tokens_for(user.id, Utc::now() - chrono::Duration::minutes(1))
            .await;

        let err = f.reset.execute(reset_input(&token, "NewPass456!")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetToken));

        let user = UserRepository::find_by_id(&*f.repo, user.id).await.unwrap().unwrap();
        assert!(user.password_hash.verify_plain(OLD, &f.hasher));
    }

    #[tokio::test]
    async fn test_garbage_token_checked_before_password_policy() {
        let f = fixture();
        let err = f.reset.execute(reset_input("garbage", "short")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetToken));
    }
}
