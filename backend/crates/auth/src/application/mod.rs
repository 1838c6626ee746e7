//! Application Layer
//!
//! Use cases and application services.

pub mod bootstrap;
pub mod change_password;
pub mod config;
pub mod identity;
pub mod list_users;
pub mod login;
pub mod mail;
pub mod password_reset;
pub mod profile;
pub mod refresh;
pub mod register;
pub mod role_gate;
pub mod tokens;

// Re-exports
pub use bootstrap::{BootstrapAdmin, BootstrapSuperadmin};
pub use change_password::{ChangePassword, ChangePasswordInput};
pub use config::AuthConfig;
pub use identity::IdentityResolver;
pub use list_users::{ListUsers, ListUsersInput, Page};
pub use login::{LoginAdmin, LoginAdminInput, LoginUser, LoginUserInput};
pub use password_reset::{ForgotPassword, ResetPassword, ResetPasswordInput};
pub use profile::{UpdateProfile, UpdateProfileInput};
pub use refresh::RefreshAccess;
pub use register::{RegisterAdmin, RegisterAdminInput, RegisterUser, RegisterUserInput};
pub use tokens::{Claims, TokenPair, TokenService, TokenType};
