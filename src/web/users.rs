use crate::db;
use crate::domain::models::{DbUser, UserRole};
use crate::domain::scope::{self, user_scope};
use crate::error::ApiError;
use crate::state::SharedState;
use crate::web::session::AuthUser;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rand_core::OsRng;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Option<UserRole>,
    #[serde(default)]
    pub team: String,
    pub employee_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub team: Option<String>,
    pub employee_id: Option<String>,
    pub is_active: Option<bool>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(deactivate_user),
        )
        .with_state(state)
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?
        .to_string())
}

fn validate_identity_fields(username: &str, email: &str, employee_id: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::validation("username", "username is required"));
    }
    if email.trim().is_empty() || !email.contains('@') {
        return Err(ApiError::validation("email", "a valid email is required"));
    }
    if employee_id.trim().is_empty() {
        return Err(ApiError::validation("employee_id", "employee_id is required"));
    }
    Ok(())
}

fn map_unique_violation(err: sqlx::Error) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("username or employee_id already in use")
        }
        _ => ApiError::Database(err),
    }
}

async fn list_users(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<DbUser>>, ApiError> {
    let users = db::list_users(&state.pool, user_scope(&requester)).await?;
    Ok(Json(users))
}

async fn get_user(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DbUser>, ApiError> {
    let user = db::find_user_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    // Out-of-scope reads behave as missing, not as denials.
    if !scope::can_view_user(&requester, &user) {
        return Err(ApiError::NotFound("user"));
    }

    Ok(Json(user))
}

async fn create_user(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<(StatusCode, Json<DbUser>), ApiError> {
    if requester.role != UserRole::Admin {
        return Err(ApiError::forbidden("admin role required to create users"));
    }

    validate_identity_fields(&payload.username, &payload.email, &payload.employee_id)?;
    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "password",
            "password must be at least 8 characters",
        ));
    }

    let new_user = db::NewUser {
        id: Uuid::new_v4(),
        username: payload.username.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        hash: hash_password(&payload.password)?,
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        role: payload.role.unwrap_or(UserRole::Agent),
        team: payload.team.trim().to_string(),
        employee_id: payload.employee_id.trim().to_string(),
    };

    let user = db::insert_user(&state.pool, &new_user)
        .await
        .map_err(map_unique_violation)?;

    state
        .hooks
        .dispatch(crate::domain::hooks::HookEvent::UserCreated(user.id));

    tracing::info!("User {} created by {}", user.id, requester.id);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<DbUser>, ApiError> {
    let mut user = db::find_user_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let is_admin = requester.role == UserRole::Admin;
    let is_self = requester.id == user.id;
    if !is_admin && !is_self {
        if !scope::can_view_user(&requester, &user) {
            return Err(ApiError::NotFound("user"));
        }
        return Err(ApiError::forbidden("users may only update themselves"));
    }

    if (payload.role.is_some() || payload.is_active.is_some()) && !is_admin {
        return Err(ApiError::forbidden("admin role required to change role or status"));
    }

    if let Some(username) = payload.username {
        user.username = username.trim().to_string();
    }
    if let Some(email) = payload.email {
        user.email = email.trim().to_lowercase();
    }
    if let Some(first_name) = payload.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = payload.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if let Some(team) = payload.team {
        user.team = team.trim().to_string();
    }
    if let Some(employee_id) = payload.employee_id {
        user.employee_id = employee_id.trim().to_string();
    }
    if let Some(role) = payload.role {
        user.role = role;
    }
    if let Some(is_active) = payload.is_active {
        user.is_active = is_active;
    }
    if let Some(password) = payload.password {
        if password.len() < 8 {
            return Err(ApiError::validation(
                "password",
                "password must be at least 8 characters",
            ));
        }
        user.hash = hash_password(&password)?;
    }

    validate_identity_fields(&user.username, &user.email, &user.employee_id)?;

    let user = db::update_user(&state.pool, &user)
        .await
        .map_err(map_unique_violation)?;

    Ok(Json(user))
}

/// Soft delete: accounts are deactivated, never removed.
async fn deactivate_user(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if requester.role != UserRole::Admin {
        return Err(ApiError::forbidden("admin role required to deactivate users"));
    }
    if requester.id == id {
        return Err(ApiError::forbidden("cannot deactivate your own account"));
    }

    db::set_user_active(&state.pool, id, false)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    tracing::info!("User {} deactivated by {}", id, requester.id);
    Ok(StatusCode::NO_CONTENT)
}
