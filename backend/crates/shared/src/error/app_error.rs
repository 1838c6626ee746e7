//! Application Error - Unified error type for the application
//!
//! Defines [`AppError`] struct and [`AppResult<T>`] type alias.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use serde_json::{Value, json};

use super::kind::ErrorKind;

/// アプリケーション統一エラー型
///
/// プロジェクト全体で使用する標準エラー型です。
/// HTTP 境界では正規化されたエラーエンベロープに変換されます。
///
/// ## Fields
/// * `kind` - エラーの分類（HTTP ステータスコードにマッピング）
/// * `name` - エンベロープの `error` 名（未設定なら種別の既定名）
/// * `message` - ユーザー向けのエラーメッセージ
/// * `details` - 構造化された補足情報（オプション）
/// * `source` - 元のエラー（オプション、ログ専用でレスポンスには出さない）
///
/// ## Examples
/// ```rust
/// use kernel::error::{app_error::AppError, kind::ErrorKind};
///
/// let err = AppError::new(ErrorKind::NotFound, "User not found");
/// assert_eq!(err.name(), "NotFoundError");
///
/// let err = AppError::record_not_found("User", 42);
/// assert_eq!(err.message(), "User not found (ID: 42)");
/// ```
pub struct AppError {
    kind: ErrorKind,
    name: Option<Cow<'static, str>>,
    message: Cow<'static, str>,
    details: Option<Value>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

/// アプリケーション結果型エイリアス
///
/// `Result<T, AppError>` の省略形です。
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// 新しいエラーを作成
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            name: None,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    // ========================================================================
    // Taxonomy constructors
    // ========================================================================

    /// 401 認証失敗（トークン欠落・不正・期限切れ、資格情報の不一致）
    #[inline]
    pub fn authentication(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// 403 認可失敗（ロール不一致、無効化アカウント、権限不足）
    #[inline]
    pub fn authorization(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// 404 参照先のレコードが存在しない
    pub fn record_not_found(resource: &str, id: impl fmt::Display) -> Self {
        let id = id.to_string();
        Self::new(
            ErrorKind::NotFound,
            format!("{resource} not found (ID: {id})"),
        )
        .with_details(json!({ "resource": resource, "id": id }))
    }

    /// 409 一意制約違反
    pub fn duplicate_record(resource: &str, field: Option<&str>) -> Self {
        let message = match field {
            Some(field) => format!("{resource} with this {field} already exists"),
            None => format!("{resource} already exists"),
        };
        Self::new(ErrorKind::Conflict, message)
            .with_details(json!({ "resource": resource, "field": field }))
    }

    /// 422 入力検証エラー
    #[inline]
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::UnprocessableEntity, message)
    }

    /// 429 レート制限超過
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::new(
            ErrorKind::TooManyRequests,
            "Too many requests. Please try again later.",
        )
        .with_details(json!({ "retry_after": retry_after_secs }))
    }

    /// 500 ストレージ層の未分類エラー
    #[inline]
    pub fn database() -> Self {
        Self::new(
            ErrorKind::InternalServerError,
            "A database error occurred. Please try again later.",
        )
        .with_name("DatabaseError")
    }

    /// 500 メール送信の失敗
    #[inline]
    pub fn email_service() -> Self {
        Self::new(
            ErrorKind::InternalServerError,
            "Failed to send email. Please try again later.",
        )
        .with_name("EmailServiceError")
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    /// 400 Bad Request エラー
    #[inline]
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// 404 Not Found エラー
    #[inline]
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// 409 Conflict エラー
    #[inline]
    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// 500 Internal Server Error
    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    /// 503 Service Unavailable エラー
    #[inline]
    pub fn service_unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// エンベロープの `error` 名を上書き
    #[inline]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 構造化された補足情報を設定
    #[inline]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// 元のエラーを設定（デバッグ用）
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::app_error::{AppError, AppResult};
    ///
    /// fn read_config() -> AppResult<()> {
    ///     std::fs::read_to_string("config.json")
    ///         .map_err(|e| AppError::internal("Failed to read config").with_source(e))?;
    ///     Ok(())
    /// }
    /// ```
    #[inline]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// エラー種別を取得
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP ステータスコードを取得
    #[inline]
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// エンベロープの `error` 名を取得
    #[inline]
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.kind.default_name())
    }

    /// メッセージを取得
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 補足情報を取得
    #[inline]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// サーバーエラーかどうか
    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.kind.is_server_error()
    }

    /// クライアントエラーかどうか
    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.kind.is_client_error()
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder.field("kind", &self.kind);
        builder.field("name", &self.name());
        builder.field("message", &self.message);
        if let Some(details) = &self.details {
            builder.field("details", details);
        }
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

// ============================================================================
// Result extension traits
// ============================================================================

/// `Result<T, E>` を `AppResult<T>` に変換するための拡張トレイト
pub trait ResultExt<T, E> {
    /// エラーを `AppError` に変換し、指定した種別とメッセージでラップ
    fn map_app_err(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> AppResult<T>
    where
        E: Error + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn map_app_err(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> AppResult<T>
    where
        E: Error + Send + Sync + 'static,
    {
        self.map_err(|e| AppError::new(kind, message).with_source(e))
    }
}

/// `Option<T>` を `AppResult<T>` に変換するための拡張トレイト
pub trait OptionExt<T> {
    /// `None` の場合に `AppError` を返す
    fn ok_or_app_err(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> AppResult<T>;

    /// `None` の場合に 404 Not Found を返す
    fn ok_or_not_found(self, message: impl Into<Cow<'static, str>>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_app_err(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> AppResult<T> {
        self.ok_or_else(|| AppError::new(kind, message))
    }

    fn ok_or_not_found(self, message: impl Into<Cow<'static, str>>) -> AppResult<T> {
        self.ok_or_app_err(ErrorKind::NotFound, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_error() {
        let err = AppError::new(ErrorKind::NotFound, "User not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "User not found");
        assert_eq!(err.name(), "NotFoundError");
        assert!(err.details().is_none());
    }

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(AppError::authentication("t").status_code(), 401);
        assert_eq!(AppError::authorization("t").status_code(), 403);
        assert_eq!(AppError::record_not_found("User", 1).status_code(), 404);
        assert_eq!(AppError::duplicate_record("User", None).status_code(), 409);
        assert_eq!(AppError::validation("t").status_code(), 422);
        assert_eq!(AppError::rate_limit(10).status_code(), 429);
        assert_eq!(AppError::database().status_code(), 500);
        assert_eq!(AppError::email_service().status_code(), 500);
    }

    #[test]
    fn test_taxonomy_names() {
        assert_eq!(AppError::authentication("t").name(), "AuthenticationError");
        assert_eq!(AppError::authorization("t").name(), "AuthorizationError");
        assert_eq!(AppError::database().name(), "DatabaseError");
        assert_eq!(AppError::email_service().name(), "EmailServiceError");
        assert_eq!(AppError::internal("t").name(), "InternalServerError");
    }

    #[test]
    fn test_record_not_found_details() {
        let err = AppError::record_not_found("User", 7);
        assert_eq!(err.message(), "User not found (ID: 7)");
        let details = err.details().unwrap();
        assert_eq!(details["resource"], "User");
        assert_eq!(details["id"], "7");
    }

    #[test]
    fn test_duplicate_record_details() {
        let err = AppError::duplicate_record("User", Some("email"));
        assert_eq!(err.message(), "User with this email already exists");
        assert_eq!(err.details().unwrap()["field"], "email");
    }

    #[test]
    fn test_with_name_overrides_default() {
        let err = AppError::bad_request("nope").with_name("InvalidPasswordResetToken");
        assert_eq!(err.name(), "InvalidPasswordResetToken");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = AppError::internal("Failed to read file").with_source(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_display() {
        let err = AppError::not_found("User not found");
        assert_eq!(err.to_string(), "[Not Found] User not found");
    }

    #[test]
    fn test_result_ext() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not found",
        ));
        let app_result = result.map_app_err(ErrorKind::NotFound, "Resource not found");
        assert_eq!(app_result.unwrap_err().status_code(), 404);
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_not_found("Item not found");
        assert_eq!(result.unwrap_err().status_code(), 404);

        let some: Option<i32> = Some(42);
        assert_eq!(some.ok_or_not_found("Item not found").unwrap(), 42);
    }
}
