pub mod auth;
pub mod calls;
pub mod criteria;
pub mod dashboard;
pub mod evaluations;
pub mod session;
pub mod users;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    let api_v1 = Router::new()
        .nest("/users", users::router(state.clone()))
        .nest("/calls", calls::router(state.clone()))
        .nest("/criteria", criteria::router(state.clone()))
        .nest("/evaluations", evaluations::router(state.clone()))
        .nest("/dashboard", dashboard::router(state.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/api/token", auth::router(state))
        .nest("/api/v1", api_v1)
}
