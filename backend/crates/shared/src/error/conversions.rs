//! Error conversions - From implementations for common error types
//!
//! Provides automatic conversion from common error types to [`AppError`].

use super::app_error::AppError;
#[cfg(feature = "sqlx")]
use super::kind::ErrorKind;

// ============================================================================
// serde_json conversions
// ============================================================================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            AppError::bad_request("The request body is not valid JSON").with_source(err)
        } else {
            AppError::internal("JSON serialization error").with_source(err)
        }
    }
}

// ============================================================================
// SQLx conversions (feature-gated)
// ============================================================================

/// PostgreSQL unique_violation
#[cfg(feature = "sqlx")]
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// 一意制約違反であれば制約名を返す
///
/// リポジトリ層で制約名からフィールド固有の重複エラーへ変換するために使います。
#[cfg(feature = "sqlx")]
pub fn unique_violation_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err)
            if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) =>
        {
            Some(db_err.constraint().unwrap_or_default())
        }
        _ => None,
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::not_found("Record not found").with_source(err),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::service_unavailable(
                    "The service is temporarily unavailable. Please try again later.",
                )
                .with_source(err)
            }
            sqlx::Error::Database(db_err) => {
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                let app_err = match db_err.code().as_deref() {
                    Some(PG_UNIQUE_VIOLATION) => {
                        AppError::conflict("A record with this information already exists")
                            .with_name("DuplicateRecordError")
                    }
                    // Class 53 (insufficient resources), class 57 (operator intervention)
                    Some(code) if code.starts_with("53") || code.starts_with("57") => {
                        AppError::new(
                            ErrorKind::ServiceUnavailable,
                            "The service is temporarily unavailable. Please try again later.",
                        )
                    }
                    _ => AppError::database(),
                };
                app_err.with_source(err)
            }
            _ => AppError::database().with_source(err),
        }
    }
}

// ============================================================================
// Axum conversions (feature-gated)
// ============================================================================

/// ハンドラはエンベロープを自分で整形しない。
///
/// ステータスと [`ErrorReport`](super::envelope::ErrorReport) だけを載せ、
/// 本文の生成は境界のミドルウェアに任せる。
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let report = super::envelope::ErrorReport::from(&self);

        let mut response = status.into_response();
        response.extensions_mut().insert(report);
        response
    }
}
