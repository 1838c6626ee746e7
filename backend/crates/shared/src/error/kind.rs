//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum that maps to HTTP status codes.

use serde::Serialize;

/// エラー種別の列挙体
///
/// HTTP ステータスコードに対応するエラー分類を定義します。
/// 各種別はエンベロープの `error` 名の既定値も持ちます。
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::NotFound;
/// assert_eq!(kind.status_code(), 404);
/// assert_eq!(kind.as_str(), "Not Found");
/// assert_eq!(kind.default_name(), "NotFoundError");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// 400 - Bad Request: リクエストが不正
    BadRequest,
    /// 401 - Unauthorized: 認証失敗（トークン不正・資格情報不一致）
    Unauthorized,
    /// 403 - Forbidden: 権限不足・無効化されたアカウント
    Forbidden,
    /// 404 - Not Found: リソースが見つからない
    NotFound,
    /// 405 - Method Not Allowed
    MethodNotAllowed,
    /// 409 - Conflict: 一意制約違反
    Conflict,
    /// 422 - Unprocessable Entity: 入力検証エラー
    UnprocessableEntity,
    /// 429 - Too Many Requests: レート制限超過
    TooManyRequests,
    /// 500 - Internal Server Error: サーバー内部エラー
    InternalServerError,
    /// 503 - Service Unavailable: サービス利用不可
    ServiceUnavailable,
    /// 504 - Gateway Timeout: 処理時間超過
    GatewayTimeout,
}

impl ErrorKind {
    /// HTTP ステータスコードを取得
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::Unauthorized.status_code(), 401);
    /// assert_eq!(ErrorKind::Conflict.status_code(), 409);
    /// ```
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::Conflict => 409,
            ErrorKind::UnprocessableEntity => 422,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::InternalServerError => 500,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::GatewayTimeout => 504,
        }
    }

    /// HTTP ステータスの標準的な理由フレーズ
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::MethodNotAllowed => "Method Not Allowed",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::UnprocessableEntity => "Unprocessable Entity",
            ErrorKind::TooManyRequests => "Too Many Requests",
            ErrorKind::InternalServerError => "Internal Server Error",
            ErrorKind::ServiceUnavailable => "Service Unavailable",
            ErrorKind::GatewayTimeout => "Gateway Timeout",
        }
    }

    /// エラーエンベロープの `error` フィールドに使う既定の名前
    ///
    /// 個々のエラーは [`AppError::with_name`](super::app_error::AppError::with_name)
    /// で上書きできます（例: `DatabaseError`, `EmailServiceError`）。
    #[inline]
    pub const fn default_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequestError",
            ErrorKind::Unauthorized => "AuthenticationError",
            ErrorKind::Forbidden => "AuthorizationError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::MethodNotAllowed => "MethodNotAllowedError",
            ErrorKind::Conflict => "DuplicateRecordError",
            ErrorKind::UnprocessableEntity => "ValidationError",
            ErrorKind::TooManyRequests => "RateLimitError",
            ErrorKind::InternalServerError => "InternalServerError",
            ErrorKind::ServiceUnavailable => "ServiceUnavailableError",
            ErrorKind::GatewayTimeout => "TimeoutError",
        }
    }

    /// ステータスコードから種別を逆引き
    ///
    /// 分類できないコードは `None` を返します。
    pub const fn from_status_code(code: u16) -> Option<Self> {
        match code {
            400 => Some(ErrorKind::BadRequest),
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            405 => Some(ErrorKind::MethodNotAllowed),
            409 => Some(ErrorKind::Conflict),
            415 | 422 => Some(ErrorKind::UnprocessableEntity),
            429 => Some(ErrorKind::TooManyRequests),
            500 => Some(ErrorKind::InternalServerError),
            503 => Some(ErrorKind::ServiceUnavailable),
            408 | 504 => Some(ErrorKind::GatewayTimeout),
            _ => None,
        }
    }

    /// サーバー側のエラーかどうかを判定
    ///
    /// 5xx系のエラーは `true` を返します。
    /// これらのエラーはログに記録すべきです。
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// クライアント側のエラーかどうかを判定
    #[inline]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
