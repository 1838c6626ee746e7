//! Admin Entity

use chrono::{DateTime, Utc};
use kernel::id::AdminId;

use crate::domain::value_object::{
    email::Email, password::PasswordHash, role::Role, username::Username,
};

/// Admin entity
///
/// Lives in its own table; a username may coincide with a user's.
#[derive(Debug, Clone)]
pub struct Admin {
    pub id: AdminId,
    pub username: Username,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub is_active: bool,
    /// Grants the superadmin gate
    pub is_superadmin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    pub fn role(&self) -> Role {
        if self.is_superadmin {
            Role::Superadmin
        } else {
            Role::Admin
        }
    }
}

/// Admin before insertion
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: Username,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub is_active: bool,
    pub is_superadmin: bool,
}

impl NewAdmin {
    pub fn new(
        username: Username,
        email: Email,
        password_hash: PasswordHash,
        is_superadmin: bool,
    ) -> Self {
        Self {
            username,
            email,
            password_hash,
            is_active: true,
            is_superadmin,
        }
    }

    pub fn into_admin(self, id: AdminId, now: DateTime<Utc>) -> Admin {
        Admin {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_active: self.is_active,
            is_superadmin: self.is_superadmin,
            created_at: now,
            updated_at: now,
        }
    }
}
