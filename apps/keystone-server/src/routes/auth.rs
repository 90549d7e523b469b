//! Registration, login and user management.
//!
//! The first account registered on an empty database becomes the admin.
//! Later self-registrations are employees; an admin creates accounts with
//! other roles through `POST /api/auth/users`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use keystone_core::validation::validate_password;
use keystone_core::{CoreError, Credentials, NewUser, User};
use serde::Serialize;
use tracing::info;

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/users", post(create_user))
}

async fn register(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    validate_password(&new.password)?;
    let hash = hash_password(&new.password)?;
    let user = state.db.users().register(new, &hash).await?;
    let token = state.jwt.generate_access_token(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: token,
            token_type: "Bearer",
            expires_in: state.jwt.lifetime_secs(),
            user,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<TokenResponse>> {
    let users = state.db.users();
    let user = users
        .find_by_username(&credentials.username)
        .await?
        .filter(|u| verify_password(&credentials.password, &u.password_hash))
        .ok_or(CoreError::InvalidCredentials)?;

    users.touch_last_login(user.id).await?;
    let token = state.jwt.generate_access_token(&user)?;
    info!(username = %user.username, "User logged in");

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in: state.jwt.lifetime_secs(),
        user,
    }))
}

async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.db.users().get(user.id).await?))
}

async fn create_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(new): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    caller.require_admin()?;
    validate_password(&new.password)?;
    let hash = hash_password(&new.password)?;
    let user = state.db.users().create(new, &hash).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
