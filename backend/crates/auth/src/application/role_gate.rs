//! Role Gate
//!
//! Pure checks layered on an already resolved principal. No I/O.

use crate::domain::entity::{Admin, Principal, User};
use crate::domain::value_object::role::Role;
use crate::error::{AuthError, AuthResult};

/// Pass a user with `is_superuser` through unchanged
pub fn require_superuser(principal: Principal) -> AuthResult<User> {
    match principal {
        Principal::User(user) if user.is_superuser => Ok(user),
        _ => Err(AuthError::InsufficientPrivileges(Role::Superuser)),
    }
}

/// Pass an admin with `is_superadmin` through unchanged
pub fn require_superadmin(principal: Principal) -> AuthResult<Admin> {
    match principal {
        Principal::Admin(admin) if admin.is_superadmin => Ok(admin),
        _ => Err(AuthError::InsufficientPrivileges(Role::Superadmin)),
    }
}
