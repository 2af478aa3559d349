use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RefreshRequest, RegisterRequest, UserResponse,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password, MIN_PASSWORD_LEN},
        repo_types::{NewUser, Role, User},
    },
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/password", put(change_password))
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id, user.role)?;
    let refresh_token = keys.sign_refresh(user.id, user.role)?;
    Ok(AuthResponse {
        success: true,
        access_token,
        refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();

    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation("Password too short"));
    }

    let hash = hash_password(&payload.password)?;
    let new_user = NewUser {
        name,
        email: payload.email.clone(),
        password_hash: Some(hash),
        phone: payload
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        role: Role::User,
    };

    let Some(user) = state.store.create_user(&new_user).await? else {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::conflict("Email already registered"));
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let invalid = AppError::Unauthenticated("Invalid credentials");
    let Some(user) = state.store.find_user_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(invalid);
    };

    // OAuth-linked accounts have no password to check against.
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "password login for account without password");
        return Err(invalid);
    };
    if !verify_password(&payload.password, hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(invalid);
    }
    if !user.is_active() {
        warn!(user_id = %user.id, status = %user.status, "login for inactive account");
        return Err(invalid);
    }

    if let Err(e) = state.store.record_login(user.id).await {
        warn!(error = %e, user_id = %user.id, "record_login failed");
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| AppError::Unauthenticated("Invalid refresh token"))?;

    // Re-read the user so role changes and deletions take effect on refresh.
    let user = state
        .store
        .find_user(claims.sub)
        .await?
        .filter(User::is_active)
        .ok_or(AppError::Unauthenticated("User not found"))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    who: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .store
        .find_user(who.id)
        .await?
        .ok_or(AppError::Unauthenticated("User not found"))?;

    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    who: AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("New password too short"));
    }

    let user = state
        .store
        .find_user(who.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let Some(hash) = user.password_hash.as_deref() else {
        return Err(AppError::validation(
            "Password change not available for social login users",
        ));
    };
    if !verify_password(&payload.current_password, hash)? {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let new_hash = hash_password(&payload.new_password)?;
    state.store.update_password(user.id, &new_hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse::ok("Password updated successfully")))
}
