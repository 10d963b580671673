use crate::db;
use crate::domain::models::{DbCriterion, DbUser, UserRole};
use crate::error::ApiError;
use crate::state::SharedState;
use crate::web::session::AuthUser;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Deserialize)]
pub struct CreateCriterionPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub weight: i16,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCriterionPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub weight: Option<i16>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_criteria).post(create_criterion))
        .route(
            "/:id",
            get(get_criterion)
                .put(update_criterion)
                .patch(update_criterion)
                .delete(delete_criterion),
        )
        .with_state(state)
}

fn require_admin(requester: &DbUser) -> Result<(), ApiError> {
    if requester.role != UserRole::Admin {
        return Err(ApiError::forbidden(
            "admin role required to manage evaluation criteria",
        ));
    }
    Ok(())
}

fn validate_criterion(name: &str, weight: i16) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("name", "name is required"));
    }
    if !(1..=100).contains(&weight) {
        return Err(ApiError::validation("weight", "weight must be within 1-100"));
    }
    Ok(())
}

/// Weights are not required to sum to 100; totals normalize over the present
/// weights. An off-100 sum is still usually a configuration mistake, so warn.
async fn warn_on_unbalanced_weights(pool: &PgPool) {
    match db::list_criteria(pool).await {
        Ok(criteria) => {
            let sum: i64 = criteria.iter().map(|c| i64::from(c.weight)).sum();
            if sum != 100 {
                tracing::warn!("evaluation criteria weights sum to {}, not 100", sum);
            }
        }
        Err(e) => tracing::warn!("failed to check criteria weight sum: {}", e),
    }
}

async fn list_criteria(
    AuthUser(_requester): AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<DbCriterion>>, ApiError> {
    let criteria = db::list_criteria(&state.pool).await?;
    Ok(Json(criteria))
}

async fn get_criterion(
    AuthUser(_requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> Result<Json<DbCriterion>, ApiError> {
    let criterion = db::find_criterion_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("criterion"))?;
    Ok(Json(criterion))
}

async fn create_criterion(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Json(payload): Json<CreateCriterionPayload>,
) -> Result<(StatusCode, Json<DbCriterion>), ApiError> {
    require_admin(&requester)?;
    validate_criterion(&payload.name, payload.weight)?;

    let criterion = db::insert_criterion(
        &state.pool,
        payload.name.trim(),
        payload.description.trim(),
        payload.weight,
    )
    .await?;

    warn_on_unbalanced_weights(&state.pool).await;

    tracing::info!("Criterion {} created by {}", criterion.id, requester.id);
    Ok((StatusCode::CREATED, Json(criterion)))
}

async fn update_criterion(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCriterionPayload>,
) -> Result<Json<DbCriterion>, ApiError> {
    require_admin(&requester)?;

    let mut criterion = db::find_criterion_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("criterion"))?;

    if let Some(name) = payload.name {
        criterion.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        criterion.description = description.trim().to_string();
    }
    if let Some(weight) = payload.weight {
        criterion.weight = weight;
    }

    validate_criterion(&criterion.name, criterion.weight)?;

    let criterion = db::update_criterion(&state.pool, &criterion).await?;

    warn_on_unbalanced_weights(&state.pool).await;

    Ok(Json(criterion))
}

async fn delete_criterion(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    require_admin(&requester)?;

    let deleted = db::delete_criterion(&state.pool, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("criterion"));
    }

    tracing::info!("Criterion {} deleted by {}", id, requester.id);
    Ok(StatusCode::NO_CONTENT)
}
