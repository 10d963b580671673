use crate::domain::hooks::PostCommitHooks;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_key: Vec<u8>,
    pub hooks: Arc<PostCommitHooks>,
    /// When set, call status updates must follow the monotonic
    /// pending -> in_progress -> completed table.
    pub strict_status_transitions: bool,
}

pub type SharedState = Arc<AppState>;
