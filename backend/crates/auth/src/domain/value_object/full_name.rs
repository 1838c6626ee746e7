use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub const FULL_NAME_MAX_LENGTH: usize = 100;

/// 表示用の氏名（任意項目）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FullName(String);

impl FullName {
    /// Blank input means "no name" and yields `Ok(None)`
    pub fn parse(input: Option<&str>) -> Result<Option<Self>, AuthError> {
        let Some(value) = input.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        let length = value.chars().count();
        if length > FULL_NAME_MAX_LENGTH {
            return Err(AuthError::Validation {
                field: "full_name",
                message: format!(
                    "Full name is too long ({length} chars, maximum {FULL_NAME_MAX_LENGTH})"
                )
                .into(),
            });
        }

        Ok(Some(Self(value.to_string())))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_none() {
        assert_eq!(FullName::parse(None).unwrap(), None);
        assert_eq!(FullName::parse(Some("   ")).unwrap(), None);
    }

    #[test]
    fn test_trimmed() {
        let name = FullName::parse(Some("  Alice Liddell ")).unwrap().unwrap();
        assert_eq!(name.as_str(), "Alice Liddell");
    }

    #[test]
    fn test_too_long() {
        let long = "x".repeat(FULL_NAME_MAX_LENGTH + 1);
        assert!(matches!(
            FullName::parse(Some(&long)),
            Err(AuthError::Validation { field: "full_name", .. })
        ));
        assert!(FullName::parse(Some(&"x".repeat(FULL_NAME_MAX_LENGTH))).is_ok());
    }
}
