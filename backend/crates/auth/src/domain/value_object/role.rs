use derive_more::Display;
use serde::{Deserialize, Serialize};

/// トークンの `role` クレームに載る役割
///
/// User テーブルと Admin テーブルは独立した名前空間なので、
/// どちらの主体かは役割だけで判別する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[display("user")]
    User,
    #[display("superuser")]
    Superuser,
    #[display("admin")]
    Admin,
    #[display("superadmin")]
    Superadmin,
}

impl Role {
    #[inline]
    pub const fn code(&self) -> &'static str {
        use Role::*;
        match self {
            User => "user",
            Superuser => "superuser",
            Admin => "admin",
            Superadmin => "superadmin",
        }
    }

    /// Capitalized form used in permission messages
    #[inline]
    pub const fn label(&self) -> &'static str {
        use Role::*;
        match self {
            User => "User",
            Superuser => "Superuser",
            Admin => "Admin",
            Superadmin => "Superadmin",
        }
    }

    /// Unknown codes yield `None`; the resolver turns that into a 403
    pub fn from_code(code: &str) -> Option<Self> {
        use Role::*;
        match code {
            "user" => Some(User),
            "superuser" => Some(Superuser),
            "admin" => Some(Admin),
            "superadmin" => Some(Superadmin),
            _ => None,
        }
    }

    #[inline]
    pub const fn kind(&self) -> PrincipalKind {
        match self {
            Role::User | Role::Superuser => PrincipalKind::User,
            Role::Admin | Role::Superadmin => PrincipalKind::Admin,
        }
    }

    #[inline]
    pub const fn is_elevated(&self) -> bool {
        matches!(self, Role::Superuser | Role::Superadmin)
    }
}

/// 主体の種別（タグ付き共用体のタグ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PrincipalKind {
    #[display("User")]
    User,
    #[display("Admin")]
    Admin,
}

impl PrincipalKind {
    /// Roles a resolver of this kind accepts
    pub const fn accepted_roles(&self) -> &'static [Role] {
        match self {
            PrincipalKind::User => &[Role::User, Role::Superuser],
            PrincipalKind::Admin => &[Role::Admin, Role::Superadmin],
        }
    }

    #[inline]
    pub fn accepts(&self, role: Role) -> bool {
        self.accepted_roles().contains(&role)
    }

    /// Resource name in messages and `details`
    #[inline]
    pub const fn label(&self) -> &'static str {
        match self {
            PrincipalKind::User => "User",
            PrincipalKind::Admin => "Admin",
        }
    }

    /// Role minted at login
    #[inline]
    pub const fn role_for(&self, elevated: bool) -> Role {
        match (self, elevated) {
            (PrincipalKind::User, false) => Role::User,
            (PrincipalKind::User, true) => Role::Superuser,
            (PrincipalKind::Admin, false) => Role::Admin,
            (PrincipalKind::Admin, true) => Role::Superadmin,
        }
    }
}
