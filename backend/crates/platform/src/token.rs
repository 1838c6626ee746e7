//! Token Codec - signed, expiring claim tokens
//!
//! HS256 JWTs. The caller's claims are flattened into the payload next to the
//! registered `exp` / `iat` claims. Expiry is checked with zero leeway.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Token errors
///
/// Decoding has a single outward failure on purpose: callers never learn
/// whether the signature, the structure or the expiry was wrong.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token signing secret is empty")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    Encoding(String),

    #[error("Invalid or expired token")]
    Invalid,
}

#[derive(Serialize)]
struct Outgoing<'a, C> {
    #[serde(flatten)]
    claims: &'a C,
    exp: i64,
    iat: i64,
}

#[derive(Deserialize)]
struct Incoming<C> {
    #[serde(flatten)]
    claims: C,
    #[allow(dead_code)]
    exp: i64,
}

/// HS256 encoder/decoder bound to one secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign `claims` with `exp = now + ttl`
    ///
    /// A negative `ttl` yields a token that is already expired.
    pub fn issue<C: Serialize>(&self, claims: &C, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let payload = Outgoing {
            claims,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, then return the caller's claims
    pub fn decode<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        decode::<Incoming<C>>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                TokenError::Invalid
            })
    }

    /// Soft-fail decode used for refresh tokens
    pub fn validate_refresh<C: DeserializeOwned>(&self, token: &str) -> Option<C> {
        self.decode(token).ok()
    }
}
