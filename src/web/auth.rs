use crate::db;
use crate::domain::models::UserRole;
use crate::error::ApiError;
use crate::middleware::RateLimiter;
use crate::state::SharedState;
use crate::web::session::{self, AuthUser};
use argon2::{password_hash::PasswordHash, Argon2, PasswordVerifier};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// 5 attempts per 60 seconds per IP.
static LOGIN_RATE_LIMITER: Lazy<RateLimiter> = Lazy::new(|| RateLimiter::new(5, 60));

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub role: UserRole,
    pub name: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(login))
        .route("/refresh", post(refresh))
        .with_state(state)
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

fn session_cookie(token: &str) -> HeaderMap {
    let secure_flag = if std::env::var("PRODUCTION").is_ok() {
        "; Secure"
    } else {
        ""
    };
    let mut headers = HeaderMap::new();
    if let Ok(value) =
        format!("session={token}; HttpOnly; SameSite=Lax; Path=/{secure_flag}").parse()
    {
        headers.insert(axum::http::header::SET_COOKIE, value);
    }
    headers
}

async fn login(
    headers: HeaderMap,
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let ip = client_ip(&headers);
    if !LOGIN_RATE_LIMITER.check(&ip).await {
        tracing::warn!("Login rate limit exceeded for IP: {}", ip);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let user = db::find_user_by_username(&state.pool, &payload.username)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let parsed_hash = PasswordHash::new(&user.hash).map_err(|_| StatusCode::UNAUTHORIZED)?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = session::sign_session(user.id, user.role, &state.session_key)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let resp = LoginResponse {
        user_id: user.id,
        role: user.role,
        name: user.full_name(),
    };

    Ok((session_cookie(&token), Json(resp)))
}

/// Re-issues a session for a caller whose current token is still valid.
async fn refresh(
    AuthUser(user): AuthUser,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let token = session::sign_session(user.id, user.role, &state.session_key)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to sign session: {e}")))?;

    let resp = LoginResponse {
        user_id: user.id,
        role: user.role,
        name: user.full_name(),
    };

    Ok((session_cookie(&token), Json(resp)))
}
