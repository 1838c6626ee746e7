//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Credential hashing (bcrypt) and signed tokens (JWT HS256)
//! - Cryptographic utilities (SHA-256, random URL-safe tokens)
//! - Rate limiting infrastructure
//! - Outbound email queue and SMTP worker
//! - HTTP metrics, request extractors and common middleware components

pub mod client;
pub mod crypto;
pub mod email;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod password;
pub mod rate_limit;
pub mod token;
