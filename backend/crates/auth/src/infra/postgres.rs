//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::error::conversions::unique_violation_constraint;
use kernel::id::{AdminId, PasswordResetTokenId, UserId};
use sqlx::PgPool;

use crate::domain::entity::{Admin, NewAdmin, NewUser, PasswordResetToken, User};
use crate::domain::repository::{
    AdminRepository, HealthCheck, PasswordResetRepository, UserFilter, UserRepository,
};
use crate::domain::value_object::{
    email::Email, full_name::FullName, password::PasswordHash, username::Username,
};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Delete reset tokens that are used or past expiry
    pub async fn purge_expired_reset_tokens(&self) -> AuthResult<u64> {
        let deleted = sqlx::query(
            "DELETE FROM password_reset_tokens WHERE used = TRUE OR expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        tracing::info!(tokens_deleted = deleted, "Purged stale password reset tokens");

        Ok(deleted)
    }
}

/// Map a unique violation on a users/admins constraint to the field error
fn map_unique_violation(err: sqlx::Error, username: &str, email: &str) -> AuthError {
    match unique_violation_constraint(&err) {
        Some("users_username_key" | "admins_username_key") => {
            AuthError::UsernameTaken(username.to_string())
        }
        Some("users_email_key" | "admins_email_key") => AuthError::EmailTaken(email.to_string()),
        Some(constraint) => {
            tracing::warn!(constraint, "Unexpected unique violation");
            AuthError::Duplicate("Record")
        }
        None => AuthError::Database(err),
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create(&self, user: NewUser) -> AuthResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (
                username,
                email,
                full_name,
                hashed_password,
                is_active,
                is_superuser
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                id,
                username,
                email,
                full_name,
                hashed_password,
                is_active,
                is_superuser,
                created_at,
                updated_at
            "#,
        )
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.full_name.as_ref().map(|n| n.as_str()))
        .bind(user.password_hash.as_str())
        .bind(user.is_active)
        .bind(user.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, user.username.as_str(), user.email.as_str()))?;

        Ok(row.into_user())
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                username,
                email,
                full_name,
                hashed_password,
                is_active,
                is_superuser,
                created_at,
                updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                username,
                email,
                full_name,
                hashed_password,
                is_active,
                is_superuser,
                created_at,
                updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                username,
                email,
                full_name,
                hashed_password,
                is_active,
                is_superuser,
                created_at,
                updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users SET
                username = $2,
                email = $3,
                full_name = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_i64())
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.full_name.as_ref().map(|n| n.as_str()))
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, user.username.as_str(), user.email.as_str()))?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_password(&self, user: &User) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET hashed_password = $2, updated_at = $3 WHERE id = $1")
            .bind(user.id.as_i64())
            .bind(user.password_hash.as_str())
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, filter: UserFilter, limit: i64, offset: i64) -> AuthResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                username,
                email,
                full_name,
                hashed_password,
                is_active,
                is_superuser,
                created_at,
                updated_at
            FROM users
            WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    async fn count(&self, filter: UserFilter) -> AuthResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE ($1::BOOLEAN IS NULL OR is_active = $1)",
        )
        .bind(filter.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// ============================================================================
// Admin Repository Implementation
// ============================================================================

impl AdminRepository for PgAuthRepository {
    async fn create(&self, admin: NewAdmin) -> AuthResult<Admin> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            INSERT INTO admins (
                username,
                email,
                hashed_password,
                is_active,
                is_superadmin
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING
                id,
                username,
                email,
                hashed_password,
                is_active,
                is_superadmin,
                created_at,
                updated_at
            "#,
        )
        .bind(admin.username.as_str())
        .bind(admin.email.as_str())
        .bind(admin.password_hash.as_str())
        .bind(admin.is_active)
        .bind(admin.is_superadmin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, admin.username.as_str(), admin.email.as_str()))?;

        Ok(row.into_admin())
    }

    async fn find_by_id(&self, id: AdminId) -> AuthResult<Option<Admin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            SELECT
                id,
                username,
                email,
                hashed_password,
                is_active,
                is_superadmin,
                created_at,
                updated_at
            FROM admins
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AdminRow::into_admin))
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Admin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            SELECT
                id,
                username,
                email,
                hashed_password,
                is_active,
                is_superadmin,
                created_at,
                updated_at
            FROM admins
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AdminRow::into_admin))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Admin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            SELECT
                id,
                username,
                email,
                hashed_password,
                is_active,
                is_superadmin,
                created_at,
                updated_at
            FROM admins
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AdminRow::into_admin))
    }

    async fn count(&self) -> AuthResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// ============================================================================
// Password Reset Repository Implementation
// ============================================================================

impl PasswordResetRepository for PgAuthRepository {
    async fn issue(
        &self,
        user_id: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<PasswordResetToken> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent requests for one user. Without it both
        // supersede nothing and the second insert hits the unused-token index.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let superseded = sqlx::query(
            "UPDATE password_reset_tokens SET used = TRUE WHERE user_id = $1 AND used = FALSE",
        )
        .bind(user_id.as_i64())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let row = sqlx::query_as::<_, PasswordResetTokenRow>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, expires_at, used, created_at
            "#,
        )
        .bind(user_id.as_i64())
        .bind(token_digest)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if superseded > 0 {
            tracing::debug!(user_id = %user_id, superseded, "Superseded earlier reset tokens");
        }

        Ok(row.into_token())
    }

    async fn find_by_digest(&self, token_digest: &str) -> AuthResult<Option<PasswordResetToken>> {
        let row = sqlx::query_as::<_, PasswordResetTokenRow>(
            r#"
            SELECT id, user_id, token, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token = $1
            "#,
        )
        .bind(token_digest)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PasswordResetTokenRow::into_token))
    }

    async fn consume(
        &self,
        token_id: PasswordResetTokenId,
        user_id: UserId,
        new_hash: &PasswordHash,
    ) -> AuthResult<bool> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE password_reset_tokens SET used = TRUE WHERE id = $1 AND user_id = $2 AND used = FALSE",
        )
        .bind(token_id.as_i64())
        .bind(user_id.as_i64())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            // nothing written; dropping the transaction rolls it back
            return Ok(false);
        }

        sqlx::query("UPDATE users SET hashed_password = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id.as_i64())
            .bind(new_hash.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

impl HealthCheck for PgAuthRepository {
    async fn ping(&self) -> AuthResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    full_name: Option<String>,
    hashed_password: String,
    is_active: bool,
    is_superuser: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: UserId::from_i64(self.id),
            username: Username::from_db(self.username),
            email: Email::from_db(self.email),
            full_name: self.full_name.map(FullName::from_db),
            password_hash: PasswordHash::from_db(self.hashed_password),
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    email: String,
    hashed_password: String,
    is_active: bool,
    is_superadmin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AdminRow {
    fn into_admin(self) -> Admin {
        Admin {
            id: AdminId::from_i64(self.id),
            username: Username::from_db(self.username),
            email: Email::from_db(self.email),
            password_hash: PasswordHash::from_db(self.hashed_password),
            is_active: self.is_active,
            is_superadmin: self.is_superadmin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PasswordResetTokenRow {
    id: i64,
    user_id: i64,
    /// SHA-256 digest, never the emailed value
    token: String,
    expires_at: DateTime<Utc>,
    used: bool,
    created_at: DateTime<Utc>,
}

impl PasswordResetTokenRow {
    fn into_token(self) -> PasswordResetToken {
        PasswordResetToken {
            id: PasswordResetTokenId::from_i64(self.id),
            user_id: UserId::from_i64(self.user_id),
            token_digest: self.token,
            expires_at: self.expires_at,
            used: self.used,
            created_at: self.created_at,
        }
    }
}
