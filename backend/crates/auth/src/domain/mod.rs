//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{Admin, NewAdmin, NewUser, PasswordResetToken, Principal, User};
pub use repository::{
    AdminRepository, AuthStore, HealthCheck, PasswordResetRepository, UserFilter, UserRepository,
};
pub use value_object::role::{PrincipalKind, Role};
