//! Username Value Object
//!
//! ユーザー名はログインと表示に使う公開識別子。
//!
//! ## 設計方針
//! - NFKC正規化 → 前後の空白除去 → 検証 の順で処理
//! - 大文字小文字は保持し、そのまま一意性の判定に使う
//!
//! ## 不変条件
//! - 長さ: 3〜50文字（正規化後）
//! - ASCII英数字と `_` `-` `.` のみ

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::AuthError;

/// Minimum length for username (in characters)
pub const USERNAME_MIN_LENGTH: usize = 3;

/// Maximum length for username (in characters)
pub const USERNAME_MAX_LENGTH: usize = 50;

const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '-', '.'];

/// Error returned when username validation fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    Empty,
    TooShort { length: usize, min: usize },
    TooLong { length: usize, max: usize },
    InvalidCharacter { char: char, position: usize },
}

impl fmt::Display for UsernameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Username cannot be empty"),
            Self::TooShort { length, min } => {
                write!(f, "Username is too short ({length} chars, minimum {min})")
            }
            Self::TooLong { length, max } => {
                write!(f, "Username is too long ({length} chars, maximum {max})")
            }
            Self::InvalidCharacter { char, position } => write!(
                f,
                "Invalid character '{char}' at position {position}. Only letters, digits, _, - and . are allowed"
            ),
        }
    }
}

impl std::error::Error for UsernameError {}

impl From<UsernameError> for AuthError {
    fn from(err: UsernameError) -> Self {
        AuthError::Validation {
            field: "username",
            message: err.to_string().into(),
        }
    }
}

/// Validated, normalized username
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn new(input: impl AsRef<str>) -> Result<Self, UsernameError> {
        let value = Self::normalize(input.as_ref());
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }

    fn normalize(input: &str) -> String {
        input.nfkc().collect::<String>().trim().to_string()
    }

    fn validate(value: &str) -> Result<(), UsernameError> {
        if value.is_empty() {
            return Err(UsernameError::Empty);
        }

        let length = value.chars().count();
        if length < USERNAME_MIN_LENGTH {
            return Err(UsernameError::TooShort {
                length,
                min: USERNAME_MIN_LENGTH,
            });
        }
        if length > USERNAME_MAX_LENGTH {
            return Err(UsernameError::TooLong {
                length,
                max: USERNAME_MAX_LENGTH,
            });
        }

        for (position, ch) in value.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || ALLOWED_SPECIAL_CHARS.contains(&ch)) {
                return Err(UsernameError::InvalidCharacter { char: ch, position });
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Username").field(&self.0).finish()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(name: Username) -> Self {
        name.0
    }
}
