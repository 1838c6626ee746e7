//! Auth Router

use axum::{
    Router,
    routing::{get, post},
};

use crate::domain::repository::AuthStore;
use crate::presentation::handlers::{self, AuthAppState};

/// `/users`, `/admins` and `/password`, merged
pub fn auth_routes<R: AuthStore>(state: AuthAppState<R>) -> Router {
    // A nested "/" only matches the bare prefix, so the listing is
    // registered here under both spellings
    Router::new()
        .route("/users", get(handlers::list_users_as_superuser::<R>))
        .route("/users/", get(handlers::list_users_as_superuser::<R>))
        .nest("/users", user_routes())
        .nest("/admins", admin_routes())
        .nest("/password", password_routes())
        .with_state(state)
}

fn user_routes<R: AuthStore>() -> Router<AuthAppState<R>> {
    Router::new()
        .route("/register", post(handlers::register_user::<R>))
        .route("/login", post(handlers::login_user::<R>))
        .route("/refresh", post(handlers::refresh_user::<R>))
        .route(
            "/me",
            get(handlers::current_user).put(handlers::update_current_user::<R>),
        )
        .route("/change-password", post(handlers::change_password::<R>))
}

fn admin_routes<R: AuthStore>() -> Router<AuthAppState<R>> {
    Router::new()
        .route("/register", post(handlers::register_admin::<R>))
        .route("/login", post(handlers::login_admin::<R>))
        .route("/refresh", post(handlers::refresh_admin::<R>))
        .route("/me", get(handlers::current_admin))
        .route("/users", get(handlers::list_users_as_admin::<R>))
}

fn password_routes<R: AuthStore>() -> Router<AuthAppState<R>> {
    Router::new()
        .route("/forgot-password", post(handlers::forgot_password::<R>))
        .route("/reset-password", post(handlers::reset_password::<R>))
}
