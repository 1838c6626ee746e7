//! HTTP Handlers
//!
//! Handlers never build error bodies: they return `AuthError` and the error
//! envelope middleware renders it.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use platform::email::EmailQueue;
use platform::extract::{ValidJson, ValidQuery};
use platform::password::CredentialHasher;

use crate::application::config::AuthConfig;
use crate::application::{
    ChangePassword, ChangePasswordInput, ForgotPassword, IdentityResolver, ListUsers,
    ListUsersInput, LoginAdmin, LoginAdminInput, LoginUser, LoginUserInput, RefreshAccess,
    RegisterAdmin, RegisterAdminInput, RegisterUser, RegisterUserInput, ResetPassword,
    ResetPasswordInput, TokenService, UpdateProfile, UpdateProfileInput,
};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::role::PrincipalKind;
use crate::error::AuthResult;
use crate::presentation::dto::{
    AccessTokenResponse, AdminLoginRequest, AdminResponse, BEARER, ChangePasswordRequest,
    ForgotPasswordRequest, ListUsersQuery, LoginRequest, MessageResponse, PageResponse,
    RefreshRequest, RegisterAdminRequest, RegisterUserRequest, ResetPasswordRequest,
    TokenResponse, UpdateProfileRequest, UserResponse,
};
use crate::presentation::extract::{CurrentAdmin, CurrentUser, SuperAdmin, SuperUser};

/// Shared state for auth handlers
pub struct AuthAppState<R>
where
    R: AuthStore,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub tokens: Arc<TokenService>,
    pub hasher: CredentialHasher,
    pub mailer: EmailQueue,
}

// Manual impl: `R` itself need not be `Clone`
impl<R> Clone for AuthAppState<R>
where
    R: AuthStore,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
            tokens: self.tokens.clone(),
            hasher: self.hasher,
            mailer: self.mailer.clone(),
        }
    }
}

impl<R> AuthAppState<R>
where
    R: AuthStore,
{
    /// Build the signing codec and hasher from `config`
    pub fn new(repo: Arc<R>, config: AuthConfig, mailer: EmailQueue) -> AuthResult<Self> {
        let tokens = Arc::new(TokenService::from_config(&config)?);
        let hasher = config.hasher()?;
        Ok(Self {
            repo,
            config: Arc::new(config),
            tokens,
            hasher,
            mailer,
        })
    }

    pub fn resolver(&self) -> IdentityResolver<R, R> {
        IdentityResolver::new(self.repo.clone(), self.repo.clone(), self.tokens.clone())
    }
}

// ============================================================================
// Users
// ============================================================================

/// POST /users/register
pub async fn register_user<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<RegisterUserRequest>,
) -> AuthResult<(StatusCode, Json<UserResponse>)> {
    let use_case = RegisterUser::new(
        state.repo.clone(),
        state.hasher,
        state.mailer.clone(),
        state.config.clone(),
    );

    let user = use_case
        .execute(RegisterUserInput {
            username: req.username,
            email: req.email,
            password: req.password,
            full_name: req.full_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /users/login
pub async fn login_user<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let use_case = LoginUser::new(state.repo.clone(), state.hasher, state.tokens.clone());

    let (_, pair) = use_case
        .execute(LoginUserInput {
            username: req.username,
            password: req.password,
        })
        .await?;

    Ok(Json(pair.into()))
}

/// POST /users/refresh
pub async fn refresh_user<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> AuthResult<Json<AccessTokenResponse>> {
    refresh(&state, PrincipalKind::User, &req.refresh_token)
}

/// GET /users/me
pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// PUT /users/me
pub async fn update_current_user<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    CurrentUser(user): CurrentUser,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> AuthResult<Json<UserResponse>> {
    let use_case = UpdateProfile::new(state.repo.clone());

    let user = use_case
        .execute(
            user,
            UpdateProfileInput {
                username: req.username,
                email: req.email,
                full_name: req.full_name,
            },
        )
        .await?;

    Ok(Json(user.into()))
}

/// POST /users/change-password
pub async fn change_password<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    CurrentUser(user): CurrentUser,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> AuthResult<Json<MessageResponse>> {
    let use_case = ChangePassword::new(state.repo.clone(), state.hasher);

    use_case
        .execute(
            user,
            ChangePasswordInput {
                current_password: req.current_password,
                new_password: req.new_password,
            },
        )
        .await?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// GET /users (superuser only)
pub async fn list_users_as_superuser<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    SuperUser(_): SuperUser,
    ValidQuery(query): ValidQuery<ListUsersQuery>,
) -> AuthResult<Json<PageResponse<UserResponse>>> {
    list_users(&state, query).await
}

// ============================================================================
// Admins
// ============================================================================

/// POST /admins/register (superadmin only)
pub async fn register_admin<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    SuperAdmin(caller): SuperAdmin,
    ValidJson(req): ValidJson<RegisterAdminRequest>,
) -> AuthResult<(StatusCode, Json<AdminResponse>)> {
    let use_case = RegisterAdmin::new(state.repo.clone(), state.hasher);

    let admin = use_case
        .execute(RegisterAdminInput {
            username: req.username,
            email: req.email,
            password: req.password,
            is_superadmin: req.is_superadmin,
        })
        .await?;

    tracing::info!(created_by = %caller.id, admin_id = %admin.id, "Admin created by superadmin");

    Ok((StatusCode::CREATED, Json(admin.into())))
}

/// POST /admins/login
pub async fn login_admin<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<AdminLoginRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let use_case = LoginAdmin::new(state.repo.clone(), state.hasher, state.tokens.clone());

    let (_, pair) = use_case
        .execute(LoginAdminInput {
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(pair.into()))
}

/// POST /admins/refresh
pub async fn refresh_admin<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> AuthResult<Json<AccessTokenResponse>> {
    refresh(&state, PrincipalKind::Admin, &req.refresh_token)
}

/// GET /admins/me
pub async fn current_admin(CurrentAdmin(admin): CurrentAdmin) -> Json<AdminResponse> {
    Json(admin.into())
}

/// GET /admins/users
pub async fn list_users_as_admin<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    CurrentAdmin(_): CurrentAdmin,
    ValidQuery(query): ValidQuery<ListUsersQuery>,
) -> AuthResult<Json<PageResponse<UserResponse>>> {
    list_users(&state, query).await
}

// ============================================================================
// Password reset
// ============================================================================

/// POST /password/forgot-password
pub async fn forgot_password<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> AuthResult<Json<MessageResponse>> {
    let use_case = ForgotPassword::new(
        state.repo.clone(),
        state.repo.clone(),
        state.mailer.clone(),
        state.config.clone(),
    );

    let message = use_case.execute(req.email).await?;

    Ok(Json(MessageResponse::new(message)))
}

/// POST /password/reset-password
pub async fn reset_password<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> AuthResult<Json<MessageResponse>> {
    let use_case = ResetPassword::new(state.repo.clone(), state.repo.clone(), state.hasher);

    let message = use_case
        .execute(ResetPasswordInput {
            token: req.token,
            new_password: req.new_password,
        })
        .await?;

    Ok(Json(MessageResponse::new(message)))
}

// ============================================================================
// Shared
// ============================================================================

fn refresh<R: AuthStore>(
    state: &AuthAppState<R>,
    kind: PrincipalKind,
    refresh_token: &str,
) -> AuthResult<Json<AccessTokenResponse>> {
    let access_token = RefreshAccess::new(state.tokens.clone(), kind).execute(refresh_token)?;

    Ok(Json(AccessTokenResponse {
        access_token,
        token_type: BEARER,
    }))
}

async fn list_users<R: AuthStore>(
    state: &AuthAppState<R>,
    query: ListUsersQuery,
) -> AuthResult<Json<PageResponse<UserResponse>>> {
    let page = ListUsers::new(state.repo.clone())
        .execute(ListUsersInput {
            page: query.page,
            page_size: query.page_size,
            is_active: query.is_active,
        })
        .await?;

    Ok(Json(page.into()))
}
