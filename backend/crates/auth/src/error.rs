//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::email::EmailError;
use platform::password::PasswordHashError;
use platform::token::TokenError;
use serde_json::json;
use thiserror::Error;

use crate::domain::value_object::role::{PrincipalKind, Role};

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` header
    #[error("Missing or invalid authentication token")]
    MissingToken,

    /// Signature, structure or expiry check failed
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Unknown principal, inactive principal or wrong password at login
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    /// Token role does not belong to the resolver's principal kind
    #[error("Not enough permissions - {} role required", .0.label())]
    RoleMismatch(PrincipalKind),

    #[error("{} account is inactive", .0.label())]
    AccountInactive(PrincipalKind),

    /// Role gate rejected a resolved principal
    #[error("Not enough permissions - {} role required", .0.label())]
    InsufficientPrivileges(Role),

    #[error("{resource} not found (ID: {id})")]
    NotFound { resource: &'static str, id: i64 },

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Email '{0}' is already registered")]
    EmailTaken(String),

    /// Unique violation that could not be attributed to a field
    #[error("{0} already exists")]
    Duplicate(&'static str),

    /// Field-level input rejection
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: Cow<'static, str>,
    },

    #[error("Invalid or expired password reset token")]
    InvalidResetToken,

    #[error("{0}")]
    BadRequest(Cow<'static, str>),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] PasswordHashError),

    #[error("Token issuing error: {0}")]
    TokenIssue(#[source] TokenError),

    #[error("Email service error: {0}")]
    Email(#[from] EmailError),

    /// Already classified error from a value object or the kernel
    #[error(transparent)]
    App(#[from] AppError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::IncorrectPassword => ErrorKind::Unauthorized,
            AuthError::RoleMismatch(_)
            | AuthError::AccountInactive(_)
            | AuthError::InsufficientPrivileges(_) => ErrorKind::Forbidden,
            AuthError::NotFound { .. } => ErrorKind::NotFound,
            AuthError::UsernameTaken(_) | AuthError::EmailTaken(_) | AuthError::Duplicate(_) => {
                ErrorKind::Conflict
            }
            AuthError::Validation { .. } => ErrorKind::UnprocessableEntity,
            AuthError::InvalidResetToken | AuthError::BadRequest(_) => ErrorKind::BadRequest,
            AuthError::App(e) => e.kind(),
            AuthError::Database(_)
            | AuthError::Hashing(_)
            | AuthError::TokenIssue(_)
            | AuthError::Email(_)
            | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    ///
    /// 5xx variants keep their cause only as `source`, never in the message.
    pub fn into_app_error(self) -> AppError {
        let message = self.to_string();
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::IncorrectPassword => AppError::authentication(message),
            AuthError::RoleMismatch(_)
            | AuthError::AccountInactive(_)
            | AuthError::InsufficientPrivileges(_) => AppError::authorization(message),
            AuthError::NotFound { resource, id } => AppError::record_not_found(resource, id),
            AuthError::UsernameTaken(_) => duplicate(message, "User", "username"),
            AuthError::EmailTaken(_) => duplicate(message, "User", "email"),
            AuthError::Duplicate(resource) => AppError::duplicate_record(resource, None),
            AuthError::Validation { field, message } => AppError::validation(message)
                .with_details(json!({ "field": field })),
            AuthError::InvalidResetToken => AppError::bad_request(message),
            AuthError::BadRequest(message) => AppError::bad_request(message),
            AuthError::App(e) => e,
            AuthError::Database(e) => AppError::from(e),
            AuthError::Hashing(e) => {
                AppError::internal("Password processing failed").with_source(e)
            }
            AuthError::TokenIssue(e) => AppError::internal("Token issuing failed").with_source(e),
            AuthError::Email(e) => AppError::email_service().with_source(e),
            AuthError::Internal(msg) => AppError::internal(msg),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Hashing(e) => {
                tracing::error!(error = %e, "Password hashing error");
            }
            AuthError::TokenIssue(e) => {
                tracing::error!(error = %e, "Token issuing error");
            }
            AuthError::Email(e) => {
                tracing::error!(error = %e, "Email service error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::MissingToken | AuthError::InvalidToken => {
                tracing::warn!(error = %self, "Bearer token rejected");
            }
            AuthError::RoleMismatch(_) | AuthError::InsufficientPrivileges(_) => {
                tracing::warn!(error = %self, "Access denied");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

fn duplicate(message: String, resource: &str, field: &str) -> AppError {
    AppError::conflict(message).with_details(json!({ "resource": resource, "field": field }))
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.into_app_error().into_response()
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AuthError::InvalidToken,
            other => AuthError::TokenIssue(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::RoleMismatch(PrincipalKind::Admin).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::NotFound { resource: "User", id: 3 }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::UsernameTaken("alice".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AuthError::InvalidResetToken.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            AuthError::RoleMismatch(PrincipalKind::User).to_string(),
            "Not enough permissions - User role required"
        );
        assert_eq!(
            AuthError::AccountInactive(PrincipalKind::Admin).to_string(),
            "Admin account is inactive"
        );
        assert_eq!(
            AuthError::InsufficientPrivileges(Role::Superadmin).to_string(),
            "Not enough permissions - Superadmin role required"
        );
        assert_eq!(
            AuthError::EmailTaken("a@x.com".into()).to_string(),
            "Email 'a@x.com' is already registered"
        );
    }

    #[test]
    fn test_duplicate_carries_field() {
        let app = AuthError::UsernameTaken("alice".into()).into_app_error();
        assert_eq!(app.status_code(), 409);
        assert_eq!(app.message(), "Username 'alice' is already taken");
        assert_eq!(app.name(), "DuplicateRecordError");
        assert_eq!(app.details().unwrap()["field"], "username");

        let app = AuthError::EmailTaken("a@x.com".into()).into_app_error();
        assert_eq!(app.name(), "DuplicateRecordError");
        assert_eq!(app.details().unwrap()["resource"], "User");
        assert_eq!(app.details().unwrap()["field"], "email");
    }

    #[test]
    fn test_not_found_uses_record_format() {
        let app = AuthError::NotFound { resource: "Admin", id: 9 }.into_app_error();
        assert_eq!(app.message(), "Admin not found (ID: 9)");
    }

    #[test]
    fn test_internal_causes_stay_out_of_message() {
        let app = AuthError::Hashing(PasswordHashError::HashingFailed("cost".into()))
            .into_app_error();
        assert_eq!(app.message(), "Password processing failed");
        assert!(std::error::Error::source(&app).is_some());
    }

    #[test]
    fn test_token_error_conversion() {
        assert!(matches!(AuthError::from(TokenError::Invalid), AuthError::InvalidToken));
        assert!(matches!(
            AuthError::from(TokenError::MissingSecret),
            AuthError::TokenIssue(_)
        ));
    }

    #[test]
    fn test_validation_details() {
        let app = AuthError::Validation {
            field: "page_size",
            message: "page_size must be between 1 and 100".into(),
        }
        .into_app_error();
        assert_eq!(app.status_code(), 422);
        assert_eq!(app.details().unwrap()["field"], "page_size");
    }
}
