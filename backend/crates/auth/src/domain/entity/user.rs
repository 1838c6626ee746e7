//! User Entity

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::value_object::{
    email::Email, full_name::FullName, password::PasswordHash, role::Role, username::Username,
};

/// User entity
///
/// `password_hash` never leaves the crate through a response DTO.
#[derive(Debug, Clone)]
pub struct User {
    /// Database-assigned identifier
    pub id: UserId,
    /// Unique, case preserved
    pub username: Username,
    /// Unique, lowercased
    pub email: Email,
    pub full_name: Option<FullName>,
    pub password_hash: PasswordHash,
    /// Inactive users are rejected even with a valid token
    pub is_active: bool,
    /// Grants the superuser gate
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Role carried in issued tokens
    pub fn role(&self) -> Role {
        if self.is_superuser {
            Role::Superuser
        } else {
            Role::User
        }
    }

    pub fn set_username(&mut self, username: Username) {
        self.username = username;
        self.touch();
    }

    pub fn set_email(&mut self, email: Email) {
        self.email = email;
        self.touch();
    }

    pub fn set_full_name(&mut self, full_name: Option<FullName>) {
        self.full_name = full_name;
        self.touch();
    }

    pub fn set_password_hash(&mut self, password_hash: PasswordHash) {
        self.password_hash = password_hash;
        self.touch();
    }

    /// Stamp `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// User before insertion (no id yet)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub full_name: Option<FullName>,
    pub password_hash: PasswordHash,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl NewUser {
    /// Active, non-elevated user
    pub fn new(
        username: Username,
        email: Email,
        full_name: Option<FullName>,
        password_hash: PasswordHash,
    ) -> Self {
        Self {
            username,
            email,
            full_name,
            password_hash,
            is_active: true,
            is_superuser: false,
        }
    }

    /// Materialize with a storage-assigned id
    pub fn into_user(self, id: UserId, now: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            password_hash: self.password_hash,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            created_at: now,
            updated_at: now,
        }
    }
}
