//! Entities

pub mod admin;
pub mod password_reset;
pub mod principal;
pub mod user;

pub use admin::{Admin, NewAdmin};
pub use password_reset::PasswordResetToken;
pub use principal::Principal;
pub use user::{NewUser, User};
