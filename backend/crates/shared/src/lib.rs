//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of domain vocabulary:
//! - The closed error taxonomy and result aliases
//! - The normalized error envelope rendered at the HTTP boundary
//! - Typed integer identifiers
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    #[cfg(feature = "axum")]
    pub mod envelope;
    pub mod kind;
}
pub mod id;
