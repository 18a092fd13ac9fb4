//! Authentication endpoints.
//!
//! Tokens travel as Secure, HttpOnly, SameSite=Strict cookies. Revocation
//! is two-layered: explicit blacklisting by `jti`, and the `token_version`
//! claim checked against the user row so a password change invalidates
//! every outstanding token at once.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use clipflow_core::models::User;
use clipflow_core::AppError;

use crate::error::HttpAppError;
use crate::password::{hash_password, verify_password};
use crate::state::AppState;
use crate::tokens::{Claims, TokenType};

const ACCESS_COOKIE: &str = "access_token";
const REFRESH_COOKIE: &str = "refresh_token";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/token/", post(user_by_token))
        .route("/refresh/", post(refresh))
        .route("/logout/", post(logout))
        .route("/me/", get(me))
        .route("/change_password/", post(change_password))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "msg": "healthy" }))
}

fn auth_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_secure(true);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

fn user_info(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "created_at": user.created_at,
        "avatar_path": user.avatar_path,
    })
}

/// Resolve validated claims to a live user: not blacklisted, user exists,
/// and the token was minted for the current `token_version`.
async fn resolve_user(state: &AppState, claims: &Claims) -> Result<Option<User>, AppError> {
    if state.blacklist.contains(&claims.jti).await? {
        return Ok(None);
    }
    let user = match state.users.get_by_id(claims.user_id()?).await? {
        Some(user) => user,
        None => return Ok(None),
    };
    if user.token_version.to_string() != claims.version {
        return Ok(None);
    }
    Ok(Some(user))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "msg": "could not validate credentials" })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, HttpAppError> {
    if !request.email.contains('@') {
        return Err(AppError::InvalidInput("invalid email address".to_string()).into());
    }
    if request.username.is_empty() || request.username.len() > 32 {
        return Err(AppError::InvalidInput("username must be 1-32 characters".to_string()).into());
    }

    if state.users.get_by_email(&request.email).await?.is_some() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "msg": "email is already registered" })),
        )
            .into_response());
    }
    if state.users.get_by_username(&request.username).await?.is_some() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "msg": "username is already taken" })),
        )
            .into_response());
    }

    let password_hash = hash_password(&request.password)?;
    state
        .users
        .insert(&request.username, &request.email, &password_hash)
        .await?;

    Ok(Json(json!({ "msg": "ok" })).into_response())
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    login: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<Response, HttpAppError> {
    // An identifier containing '@' is an email, anything else a username.
    let user = if request.login.contains('@') {
        state.users.get_by_email(&request.login).await?
    } else {
        state.users.get_by_username(&request.login).await?
    };

    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            return Ok((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "msg": "invalid login or password" })),
            )
                .into_response())
        }
    };

    let access = state.tokens.issue(&user, TokenType::Access)?;
    let refresh = state.tokens.issue(&user, TokenType::Refresh)?;
    let jar = jar
        .add(auth_cookie(ACCESS_COOKIE, access))
        .add(auth_cookie(REFRESH_COOKIE, refresh));

    tracing::info!(user_id = user.id, "User logged in");
    Ok((jar, Json(json!({ "msg": "ok" }))).into_response())
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    token: String,
}

/// Service-to-service lookup: resolve a bearer access token to its user.
async fn user_by_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> Result<Response, HttpAppError> {
    let claims = match state.tokens.verify(&request.token) {
        Ok(claims) if claims.token_type == TokenType::Access => claims,
        _ => return Ok(unauthorized()),
    };
    match resolve_user(&state, &claims).await? {
        Some(user) => Ok(Json(json!({ "msg": "ok", "user": user_info(&user) })).into_response()),
        None => Ok(unauthorized()),
    }
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, HttpAppError> {
    let refresh_token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    let claims = refresh_token
        .as_deref()
        .and_then(|token| state.tokens.verify(token).ok())
        .filter(|claims| claims.token_type == TokenType::Refresh);

    let user = match &claims {
        Some(claims) => resolve_user(&state, claims).await?,
        None => None,
    };

    let (claims, user) = match (claims, user) {
        (Some(claims), Some(user)) => (claims, user),
        _ => {
            let jar = jar
                .add(removal_cookie(ACCESS_COOKIE))
                .add(removal_cookie(REFRESH_COOKIE));
            return Ok((StatusCode::UNAUTHORIZED, jar, Json(json!({ "msg": "could not validate credentials" })))
                .into_response());
        }
    };

    let access = state.tokens.issue(&user, TokenType::Access)?;
    let new_refresh = state.tokens.issue(&user, TokenType::Refresh)?;

    // The old refresh token dies with the rotation.
    state.blacklist.add(&claims).await?;

    let jar = jar
        .add(auth_cookie(ACCESS_COOKIE, access))
        .add(auth_cookie(REFRESH_COOKIE, new_refresh));
    Ok((jar, Json(json!({ "msg": "tokens rotated" }))).into_response())
}

async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, HttpAppError> {
    for cookie_name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        if let Some(cookie) = jar.get(cookie_name) {
            if let Ok(claims) = state.tokens.verify(cookie.value()) {
                state.blacklist.add(&claims).await?;
            }
        }
    }

    let jar = jar
        .add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE));
    Ok((jar, Json(json!({ "msg": "logged out" }))).into_response())
}

async fn me(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response, HttpAppError> {
    let claims = match jar
        .get(ACCESS_COOKIE)
        .and_then(|cookie| state.tokens.verify(cookie.value()).ok())
        .filter(|claims| claims.token_type == TokenType::Access)
    {
        Some(claims) => claims,
        None => return Ok(unauthorized()),
    };
    match resolve_user(&state, &claims).await? {
        Some(user) => Ok(Json(json!({ "msg": "ok", "user": user_info(&user) })).into_response()),
        None => Ok(unauthorized()),
    }
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Response, HttpAppError> {
    let claims = match jar
        .get(ACCESS_COOKIE)
        .and_then(|cookie| state.tokens.verify(cookie.value()).ok())
        .filter(|claims| claims.token_type == TokenType::Access)
    {
        Some(claims) => claims,
        None => return Ok(unauthorized()),
    };
    let user = match resolve_user(&state, &claims).await? {
        Some(user) => user,
        None => return Ok(unauthorized()),
    };

    if !verify_password(&request.old_password, &user.password_hash) {
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "msg": "old password does not match" })),
        )
            .into_response());
    }

    let password_hash = hash_password(&request.new_password)?;
    // Bumps token_version, so every outstanding token (including the one
    // used for this request) is invalidated.
    state.users.update_password(user.id, &password_hash).await?;

    let jar = jar
        .add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE));
    Ok((jar, Json(json!({ "msg": "password changed" }))).into_response())
}
