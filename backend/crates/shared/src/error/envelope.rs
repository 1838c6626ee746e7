//! Error Envelope - the one JSON shape every error response takes
//!
//! `{ error, message, status_code, timestamp, path, request_id?, details? }`

use axum::http::{Method, StatusCode};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use super::app_error::AppError;
use super::kind::ErrorKind;

/// Message used for every unclassified server failure.
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "An unexpected error occurred. Our team has been notified.";

/// 型付きエラーがレスポンス拡張に残す情報
///
/// `source` は含まない。内部情報はログにのみ出す。
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub status_code: u16,
    pub name: String,
    pub message: String,
    pub details: Option<Value>,
}

impl From<&AppError> for ErrorReport {
    fn from(err: &AppError) -> Self {
        Self {
            status_code: err.status_code(),
            name: err.name().to_string(),
            message: err.message().to_string(),
            details: err.details().cloned(),
        }
    }
}

impl ErrorReport {
    /// 型付きエラーを持たないエラーレスポンスをステータスから分類する
    ///
    /// 分類できないステータスは catch-all（500 系 `UnexpectedError`）になる。
    pub fn from_status(status: StatusCode, method: &Method, path: &str) -> Self {
        let Some(kind) = ErrorKind::from_status_code(status.as_u16()) else {
            return Self::unexpected();
        };

        let message: String = match kind {
            ErrorKind::BadRequest => "The request could not be understood by the server".into(),
            ErrorKind::Unauthorized => "Authentication is required".into(),
            ErrorKind::Forbidden => "You do not have permission to perform this action".into(),
            ErrorKind::NotFound => format!("The requested resource '{path}' was not found"),
            ErrorKind::MethodNotAllowed => {
                format!("Method '{method}' is not allowed for this endpoint")
            }
            ErrorKind::Conflict => "A record with this information already exists".into(),
            ErrorKind::UnprocessableEntity => "Request validation failed".into(),
            ErrorKind::TooManyRequests => "Too many requests. Please try again later.".into(),
            ErrorKind::InternalServerError => {
                "An unexpected error occurred. Please try again later.".into()
            }
            ErrorKind::ServiceUnavailable => {
                "The service is temporarily unavailable. Please try again later.".into()
            }
            ErrorKind::GatewayTimeout => {
                "The request took too long to process. Please try again.".into()
            }
        };

        Self {
            status_code: kind.status_code(),
            name: kind.default_name().to_string(),
            message,
            details: None,
        }
    }

    /// catch-all
    pub fn unexpected() -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            name: "UnexpectedError".to_string(),
            message: UNEXPECTED_ERROR_MESSAGE.to_string(),
            details: None,
        }
    }

    /// 5xx の本文には内部メッセージを載せない
    ///
    /// 分類済みの `DatabaseError` / `EmailServiceError` は既に汎用文言なのでそのまま。
    pub fn sanitized(mut self) -> Self {
        let keep = matches!(
            self.name.as_str(),
            "DatabaseError" | "EmailServiceError" | "UnexpectedError"
        );
        if self.status_code >= 500 && !keep {
            self.message = generic_server_message(self.status_code).to_string();
            self.details = None;
        }
        self
    }

    /// リクエスト文脈を加えてエンベロープにする
    pub fn into_envelope(self, path: &str, request_id: Option<String>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.name,
            message: self.message,
            status_code: self.status_code,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: path.to_string(),
            request_id,
            details: self.details,
        }
    }
}

fn generic_server_message(status_code: u16) -> &'static str {
    match status_code {
        503 => "The service is temporarily unavailable. Please try again later.",
        504 => "The request took too long to process. Please try again.",
        _ => "An unexpected error occurred. Please try again later.",
    }
}

/// Serialized error body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    pub timestamp: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}
