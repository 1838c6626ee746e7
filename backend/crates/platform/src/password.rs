//! Password Hashing and Verification
//!
//! bcrypt based credential hashing with:
//! - Salted one-way hashing (cost factor fixed by configuration)
//! - Zeroization of sensitive data
//! - NFKC normalization before hashing and policy checks
//!
//! ## Input limit
//! bcrypt only consumes the first 72 bytes of its input. Longer passwords are
//! rejected by the policy instead of being silently truncated.

use std::fmt;

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Constants
// ============================================================================

/// Minimum password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in bytes (bcrypt input limit)
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Default bcrypt cost
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Lowest cost bcrypt accepts. Only meant for tests.
pub const MIN_COST: u32 = 4;

/// Highest cost bcrypt accepts
pub const MAX_COST: u32 = 31;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    /// Password is too short
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    /// Password is too long
    #[error("Password must be at most {max} bytes (got {actual})")]
    TooLong { max: usize, actual: usize },

    /// Password contains only whitespace
    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    /// Password contains invalid characters (control characters)
    #[error("Password contains invalid control characters")]
    InvalidCharacter,
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Hashing operation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// Stored hash is not a bcrypt hash
    #[error("Invalid password hash format")]
    InvalidHashFormat,

    /// Cost outside bcrypt's accepted range
    #[error("Invalid bcrypt cost: {0}")]
    InvalidCost(u32),
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
///
/// ## Examples
/// ```rust
/// use platform::password::ClearTextPassword;
///
/// let password = ClearTextPassword::new("my_secure_password".to_string()).unwrap();
/// // Password is automatically zeroized when dropped
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a new clear text password with validation
    ///
    /// - Minimum 8 characters
    /// - Maximum 72 bytes
    /// - No control characters
    /// - Not empty/whitespace only
    ///
    /// Unicode is normalized using NFKC before validation.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let mut raw = raw;
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();

        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        // Count Unicode code points, not bytes
        let char_count = normalized.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if normalized.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_BYTES,
                actual: normalized.len(),
            });
        }

        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        Ok(Self(normalized))
    }

    /// Create without validation (for testing or trusted input)
    #[cfg(test)]
    pub fn new_unchecked(raw: String) -> Self {
        Self(raw)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Constant-time equality with another clear text password
    pub fn matches(&self, other: &ClearTextPassword) -> bool {
        crate::crypto::constant_time_eq(self.as_bytes(), other.as_bytes())
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// bcrypt hash in modular crypt format (`$2b$12$...`)
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from a stored hash string (e.g., from database)
    pub fn from_hash_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        if !is_bcrypt_hash(&hash) {
            return Err(PasswordHashError::InvalidHashFormat);
        }
        Ok(Self { hash })
    }

    /// Wrap a stored value without checking it. Verification of a malformed
    /// value fails instead.
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self { hash: s.into() }
    }

    /// Get the hash string for storage
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Cost factor encoded in the hash
    pub fn cost(&self) -> Option<u32> {
        self.hash.get(4..6).and_then(|c| c.parse().ok())
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Credential Hasher
// ============================================================================

/// bcrypt hasher with a fixed cost factor
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Result<Self, PasswordHashError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(PasswordHashError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        let hash = bcrypt::hash(password.as_bytes(), self.cost)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;
        Ok(HashedPassword { hash })
    }

    /// Verify a password against a stored hash
    ///
    /// A mismatch is `Ok(false)`. Only a malformed stored hash is an error.
    pub fn verify(
        &self,
        password: &ClearTextPassword,
        hashed: &HashedPassword,
    ) -> Result<bool, PasswordHashError> {
        if !is_bcrypt_hash(hashed.as_str()) {
            return Err(PasswordHashError::InvalidHashFormat);
        }
        bcrypt::verify(password.as_bytes(), hashed.as_str())
            .map_err(|_| PasswordHashError::InvalidHashFormat)
    }

    /// Verify raw login input without applying the password policy
    ///
    /// Never errors: malformed hashes and oversized input compare as false.
    pub fn verify_plain(&self, password: &str, hashed: &HashedPassword) -> bool {
        let mut normalized: String = password.nfkc().collect();
        let matched = normalized.len() <= MAX_PASSWORD_BYTES
            && is_bcrypt_hash(hashed.as_str())
            && bcrypt::verify(normalized.as_bytes(), hashed.as_str()).unwrap_or(false);
        normalized.zeroize();
        matched
    }

    /// Spend one hash worth of work for a login with no stored hash
    ///
    /// Keeps unknown and inactive accounts as slow as a wrong password.
    pub fn verify_absent(&self) -> bool {
        let _ = bcrypt::hash(ABSENT_ACCOUNT_PASSWORD, self.cost);
        false
    }
}

const ABSENT_ACCOUNT_PASSWORD: &str = "absent-account-password";

fn is_bcrypt_hash(s: &str) -> bool {
    s.len() == 60
        && ["$2a$", "$2b$", "$2x$", "$2y$"]
            .iter()
            .any(|prefix| s.starts_with(prefix))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(MIN_COST).unwrap()
    }

    #[test]
    fn test_verify_absent_never_matches() {
        assert!(!hasher().verify_absent());
    }

    #[test]
    fn test_password_too_short() {
        let result = ClearTextPassword::new("short".to_string());
        assert!(matches!(result, Err(PasswordPolicyError::TooShort { .. })));
    }

    #[test]
    fn test_password_too_long() {
        let long_password = "a".repeat(MAX_PASSWORD_BYTES + 1);
        let result = ClearTextPassword::new(long_password);
        assert!(matches!(result, Err(PasswordPolicyError::TooLong { .. })));
    }

    #[test]
    fn test_multibyte_length_counts_bytes() {
        // 25 chars * 3 bytes = 75 bytes
        let result = ClearTextPassword::new("あ".repeat(25));
        assert!(matches!(result, Err(PasswordPolicyError::TooLong { .. })));
    }

    #[test]
    fn test_password_whitespace_only() {
        let result = ClearTextPassword::new("        ".to_string());
        assert!(matches!(
            result,
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
    }

    #[test]
    fn test_password_control_character() {
        let result = ClearTextPassword::new("abc\u{0007}defgh".to_string());
        assert!(matches!(result, Err(PasswordPolicyError::InvalidCharacter)));
    }

    #[test]
    fn test_unicode_password() {
        let result = ClearTextPassword::new("パスワード安全です!".to_string());
        assert!(result.is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let password = ClearTextPassword::new_unchecked("TestPassword123!".to_string());
        let hashed = hasher().hash(&password).unwrap();

        assert!(hashed.as_str().starts_with("$2b$04$"));
        assert!(hasher().verify(&password, &hashed).unwrap());

        let wrong_password = ClearTextPassword::new_unchecked("WrongPassword123!".to_string());
        assert!(!hasher().verify(&wrong_password, &hashed).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let password = ClearTextPassword::new_unchecked("TestPassword123!".to_string());
        let a = hasher().hash(&password).unwrap();
        let b = hasher().hash(&password).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), b.as_str().len());
    }

    #[test]
    fn test_verify_malformed_hash() {
        let password = ClearTextPassword::new_unchecked("TestPassword123!".to_string());
        let stored = HashedPassword::from_stored("not_a_valid_hash");
        assert!(matches!(
            hasher().verify(&password, &stored),
            Err(PasswordHashError::InvalidHashFormat)
        ));
        assert!(!hasher().verify_plain("TestPassword123!", &stored));
    }

    #[test]
    fn test_verify_plain_accepts_short_input() {
        let password = ClearTextPassword::new_unchecked("short".to_string());
        let hashed = hasher().hash(&password).unwrap();
        assert!(hasher().verify_plain("short", &hashed));
        assert!(!hasher().verify_plain("shorter", &hashed));
    }

    #[test]
    fn test_hash_string_roundtrip() {
        let password = ClearTextPassword::new_unchecked("TestPassword123!".to_string());
        let hashed = hasher().hash(&password).unwrap();

        let restored = HashedPassword::from_hash_string(hashed.as_str().to_string()).unwrap();
        assert_eq!(restored.cost(), Some(MIN_COST));
        assert!(hasher().verify(&password, &restored).unwrap());
    }

    #[test]
    fn test_invalid_cost() {
        assert!(matches!(
            CredentialHasher::new(3),
            Err(PasswordHashError::InvalidCost(3))
        ));
        assert_eq!(CredentialHasher::default().cost(), 12);
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::new_unchecked("secret".to_string());
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));
    }
}
