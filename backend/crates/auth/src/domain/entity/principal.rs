use super::{admin::Admin, user::User};
use crate::domain::value_object::role::{PrincipalKind, Role};

/// 認証済みの主体
///
/// 実行時の型判定ではなく、タグで User と Admin を区別する。
#[derive(Debug, Clone)]
pub enum Principal {
    User(User),
    Admin(Admin),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::Admin(_) => PrincipalKind::Admin,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::User(user) => user.role(),
            Principal::Admin(admin) => admin.role(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Principal::User(user) => user.is_active,
            Principal::Admin(admin) => admin.is_active,
        }
    }

    /// Raw id; only meaningful together with [`kind`](Self::kind)
    pub fn id(&self) -> i64 {
        match self {
            Principal::User(user) => user.id.as_i64(),
            Principal::Admin(admin) => admin.id.as_i64(),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Principal::User(user) => user.username.as_str(),
            Principal::Admin(admin) => admin.username.as_str(),
        }
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            Principal::User(user) => Some(user),
            Principal::Admin(_) => None,
        }
    }

    pub fn into_admin(self) -> Option<Admin> {
        match self {
            Principal::Admin(admin) => Some(admin),
            Principal::User(_) => None,
        }
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Principal::User(user)
    }
}

impl From<Admin> for Principal {
    fn from(admin: Admin) -> Self {
        Principal::Admin(admin)
    }
}
