//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, token service, identity resolver, role gate
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, extractors, router
//!
//! ## Features
//! - User and admin registration / login in separate namespaces
//! - Stateless JWT access + refresh tokens (HS256)
//! - Superuser / superadmin gates
//! - Password change and email-based password reset
//!
//! ## Security Model
//! - Passwords hashed with bcrypt
//! - Every request re-resolves its principal; inactive accounts are refused
//!   even with a valid token
//! - Login failures never reveal which check failed
//! - Reset tokens are single-use, superseded by newer requests, stored as digests

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::bootstrap::{BootstrapAdmin, BootstrapSuperadmin};
pub use application::config::AuthConfig;
pub use domain::repository::{AuthStore, HealthCheck};
pub use error::{AuthError, AuthResult};
pub use infra::memory::InMemoryAuthRepository;
pub use infra::postgres::PgAuthRepository;
pub use presentation::handlers::AuthAppState;
pub use presentation::router::auth_routes;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
