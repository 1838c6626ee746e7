//! User Listing Use Case

use std::sync::Arc;

use crate::domain::entity::User;
use crate::domain::repository::{UserFilter, UserRepository};
use crate::error::{AuthError, AuthResult};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default)]
pub struct ListUsersInput {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub is_active: Option<bool>,
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        Self {
            items,
            total,
            page,
            page_size,
            total_pages: (total + page_size - 1) / page_size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

pub struct ListUsers<U>
where
    U: UserRepository,
{
    users: Arc<U>,
}

impl<U> ListUsers<U>
where
    U: UserRepository,
{
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    pub async fn execute(&self, input: ListUsersInput) -> AuthResult<Page<User>> {
        let page = input.page.unwrap_or(DEFAULT_PAGE);
        if page < 1 {
            return Err(AuthError::Validation {
                field: "page",
                message: "page must be greater than or equal to 1".into(),
            });
        }
        let page_size = input.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AuthError::Validation {
                field: "page_size",
                message: format!("page_size must be between 1 and {MAX_PAGE_SIZE}").into(),
            });
        }

        let filter = UserFilter {
            is_active: input.is_active,
        };
        let offset = (page - 1).saturating_mul(page_size);
        let items = self.users.list(filter, page_size, offset).await?;
        let total = self.users.count(filter).await?;

        Ok(Page::new(items, total, page, page_size))
    }
}
