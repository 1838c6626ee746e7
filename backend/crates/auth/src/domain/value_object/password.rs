//! Password Value Objects
//!
//! Domain wrappers over `platform::password`.
//!
//! - [`RawPassword`]: validated user input, zeroized on drop
//! - [`PasswordHash`]: bcrypt hash as stored in `hashed_password`
//!
//! ## Usage
//! ```rust
//! use auth::domain::value_object::password::{PasswordHash, RawPassword};
//! use platform::password::CredentialHasher;
//!
//! let hasher = CredentialHasher::new(4).unwrap();
//! let raw = RawPassword::new("MySecurePass123!".to_string()).unwrap();
//! let hash = PasswordHash::from_raw(&raw, &hasher).unwrap();
//! assert!(hash.verify(&raw, &hasher).unwrap());
//! ```

use std::fmt;

use platform::password::{
    ClearTextPassword, CredentialHasher, HashedPassword, PasswordHashError, PasswordPolicyError,
};

use crate::error::AuthError;

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Raw password from user input
///
/// Memory is automatically zeroized when dropped.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Validate a new password (registration, change, reset)
    ///
    /// Policy violations become a 422 with `details.field = "password"`.
    pub fn new(raw: String) -> Result<Self, AuthError> {
        Self::for_field(raw, "password")
    }

    /// Same as [`new`](Self::new) but reports another field name
    pub fn for_field(raw: String, field: &'static str) -> Result<Self, AuthError> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|e| policy_error(e, field))
    }

    /// Constant-time equality, used to reject no-op password changes
    pub fn matches(&self, other: &RawPassword) -> bool {
        self.0.matches(&other.0)
    }

    pub(crate) fn inner(&self) -> &ClearTextPassword {
        &self.0
    }
}

fn policy_error(err: PasswordPolicyError, field: &'static str) -> AuthError {
    AuthError::Validation {
        field,
        message: err.to_string().into(),
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// Stored Hash
// ============================================================================

/// bcrypt hash of a principal's password
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(HashedPassword);

impl PasswordHash {
    /// Hash a validated password
    pub fn from_raw(raw: &RawPassword, hasher: &CredentialHasher) -> Result<Self, PasswordHashError> {
        hasher.hash(raw.inner()).map(Self)
    }

    /// Wrap the `hashed_password` column
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(HashedPassword::from_stored(value))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Strict verification for validated input
    pub fn verify(&self, raw: &RawPassword, hasher: &CredentialHasher) -> Result<bool, PasswordHashError> {
        hasher.verify(raw.inner(), &self.0)
    }

    /// Lenient verification for login input that never went through the policy
    pub fn verify_plain(&self, candidate: &str, hasher: &CredentialHasher) -> bool {
        hasher.verify_plain(candidate, &self.0)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[HASH]").finish()
    }
}
