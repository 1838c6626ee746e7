//! Password Reset Token Entity
//!
//! 状態遷移: none → issued → (used | expired | superseded)
//!
//! 平文トークンはメールにのみ載せ、保存するのは SHA-256 ダイジェストだけ。

use chrono::{DateTime, Utc};
use kernel::id::{PasswordResetTokenId, UserId};

#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: PasswordResetTokenId,
    pub user_id: UserId,
    /// Hex SHA-256 of the emailed token
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
    /// Set exactly once: on successful reset or when superseded
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Unused and not yet expired at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
