use crate::db;
use crate::domain::scope::call_scope;
use crate::error::ApiError;
use crate::state::SharedState;
use crate::web::calls::CallOut;
use crate::web::session::AuthUser;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

const RECENT_CALLS_LIMIT: i64 = 5;

#[derive(Serialize)]
pub struct DashboardStats {
    pub total_calls: i64,
    pub pending_evaluations: i64,
    pub completed_evaluations: i64,
    pub average_score: f64,
    pub recent_calls: Vec<CallOut>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .with_state(state)
}

/// Same scoping as the call list: agents get their own numbers, experts and
/// admins the whole floor.
async fn get_stats(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<DashboardStats>, ApiError> {
    let scope = call_scope(&requester);

    let counts = db::dashboard_counts(&state.pool, scope).await?;
    let recent = db::recent_calls(&state.pool, scope, RECENT_CALLS_LIMIT).await?;

    let average_score = counts
        .average_score
        .map(|avg| (avg * 100.0).round() / 100.0)
        .unwrap_or(0.0);

    Ok(Json(DashboardStats {
        total_calls: counts.total_calls,
        pending_evaluations: counts.pending_calls,
        completed_evaluations: counts.completed_evaluations,
        average_score,
        recent_calls: recent.into_iter().map(CallOut::from).collect(),
    }))
}
