use crate::db::{self, CallWithAgent};
use crate::domain::models::{display_name, CallStatus, UserRole};
use crate::domain::scope::{self, call_scope};
use crate::error::ApiError;
use crate::state::SharedState;
use crate::web::session::AuthUser;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ALLOWED_AUDIO_EXTENSIONS: &[&str] = &["mp3"];
const MAX_PHONE_NUMBER_LEN: usize = 20;

#[derive(Debug, Deserialize)]
pub struct CreateCallPayload {
    pub agent_id: Uuid,
    pub call_date: DateTime<Utc>,
    pub phone_number: String,
    pub duration_secs: i32,
    pub audio_path: String,
    pub queue: String,
    pub status: Option<CallStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCallPayload {
    pub agent_id: Option<Uuid>,
    pub call_date: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
    pub duration_secs: Option<i32>,
    pub audio_path: Option<String>,
    pub queue: Option<String>,
    pub status: Option<CallStatus>,
}

#[derive(Debug, Serialize)]
pub struct CallOut {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub agent_name: String,
    pub call_date: DateTime<Utc>,
    pub phone_number: String,
    pub duration_secs: i32,
    pub audio_path: String,
    pub queue: String,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CallWithAgent> for CallOut {
    fn from(row: CallWithAgent) -> Self {
        let agent_name = display_name(
            &row.agent_username,
            &row.agent_first_name,
            &row.agent_last_name,
        );
        CallOut {
            id: row.call.id,
            agent_id: row.call.agent_id,
            agent_name,
            call_date: row.call.call_date,
            phone_number: row.call.phone_number,
            duration_secs: row.call.duration_secs,
            audio_path: row.call.audio_path,
            queue: row.call.queue,
            status: row.call.status,
            created_at: row.call.created_at,
            updated_at: row.call.updated_at,
        }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_calls).post(create_call))
        .route(
            "/:id",
            get(get_call)
                .put(update_call)
                .patch(update_call)
                .delete(delete_call),
        )
        .with_state(state)
}

/// Only audio uploads are accepted; the stored value is a path whose
/// extension is checked before anything touches the database.
pub fn validate_audio_path(path: &str) -> Result<(), ApiError> {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    if !ALLOWED_AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::validation(
            "mp3_file",
            format!(
                "unsupported file extension '{extension}', allowed: {}",
                ALLOWED_AUDIO_EXTENSIONS.join(", ")
            ),
        ));
    }
    Ok(())
}

fn validate_call_fields(phone_number: &str, duration_secs: i32) -> Result<(), ApiError> {
    if phone_number.trim().is_empty() || phone_number.len() > MAX_PHONE_NUMBER_LEN {
        return Err(ApiError::validation(
            "phone_number",
            format!("phone_number must be 1-{MAX_PHONE_NUMBER_LEN} characters"),
        ));
    }
    if duration_secs < 0 {
        return Err(ApiError::validation(
            "duration_secs",
            "duration must not be negative",
        ));
    }
    Ok(())
}

async fn list_calls(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<CallOut>>, ApiError> {
    let calls = db::list_calls(&state.pool, call_scope(&requester)).await?;
    Ok(Json(calls.into_iter().map(CallOut::from).collect()))
}

async fn get_call(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CallOut>, ApiError> {
    let call = db::find_call_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("call"))?;

    if !scope::can_view_call(&requester, &call) {
        return Err(ApiError::NotFound("call"));
    }

    let agent = db::find_user_by_id(&state.pool, call.agent_id)
        .await?
        .ok_or(ApiError::NotFound("agent"))?;

    Ok(Json(CallOut::from(CallWithAgent {
        call,
        agent_username: agent.username,
        agent_first_name: agent.first_name,
        agent_last_name: agent.last_name,
    })))
}

async fn create_call(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Json(payload): Json<CreateCallPayload>,
) -> Result<(StatusCode, Json<CallOut>), ApiError> {
    // Agents may only ingest their own calls.
    if requester.role == UserRole::Agent && payload.agent_id != requester.id {
        return Err(ApiError::forbidden(
            "agents may only create calls for themselves",
        ));
    }

    validate_audio_path(&payload.audio_path)?;
    validate_call_fields(&payload.phone_number, payload.duration_secs)?;

    let agent = db::find_user_by_id(&state.pool, payload.agent_id)
        .await?
        .ok_or(ApiError::NotFound("agent"))?;

    let new_call = db::NewCall {
        id: Uuid::new_v4(),
        agent_id: agent.id,
        call_date: payload.call_date,
        phone_number: payload.phone_number.trim().to_string(),
        duration_secs: payload.duration_secs,
        audio_path: payload.audio_path,
        queue: payload.queue.trim().to_string(),
        status: payload.status.unwrap_or(CallStatus::Pending),
    };

    let call = db::insert_call(&state.pool, &new_call).await?;

    tracing::info!("Call {} ingested for agent {}", call.id, agent.id);
    Ok((
        StatusCode::CREATED,
        Json(CallOut::from(CallWithAgent {
            call,
            agent_username: agent.username,
            agent_first_name: agent.first_name,
            agent_last_name: agent.last_name,
        })),
    ))
}

async fn update_call(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCallPayload>,
) -> Result<Json<CallOut>, ApiError> {
    let mut call = db::find_call_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("call"))?;

    if !scope::can_view_call(&requester, &call) {
        return Err(ApiError::NotFound("call"));
    }

    if let Some(agent_id) = payload.agent_id {
        if requester.role == UserRole::Agent && agent_id != requester.id {
            return Err(ApiError::forbidden(
                "agents may not reassign calls to other agents",
            ));
        }
        call.agent_id = agent_id;
    }
    if let Some(call_date) = payload.call_date {
        call.call_date = call_date;
    }
    if let Some(phone_number) = payload.phone_number {
        call.phone_number = phone_number.trim().to_string();
    }
    if let Some(duration_secs) = payload.duration_secs {
        call.duration_secs = duration_secs;
    }
    if let Some(audio_path) = payload.audio_path {
        validate_audio_path(&audio_path)?;
        call.audio_path = audio_path;
    }
    if let Some(queue) = payload.queue {
        call.queue = queue.trim().to_string();
    }
    if let Some(status) = payload.status {
        // Any authenticated writer may set any status unless strict
        // transition checking was opted into.
        if state.strict_status_transitions && !call.status.can_transition_to(status) {
            return Err(ApiError::validation(
                "status",
                format!(
                    "invalid status transition {:?} -> {:?}",
                    call.status, status
                ),
            ));
        }
        call.status = status;
    }

    validate_call_fields(&call.phone_number, call.duration_secs)?;

    let agent = db::find_user_by_id(&state.pool, call.agent_id)
        .await?
        .ok_or(ApiError::NotFound("agent"))?;

    let call = db::update_call(&state.pool, &call).await?;

    Ok(Json(CallOut::from(CallWithAgent {
        call,
        agent_username: agent.username,
        agent_first_name: agent.first_name,
        agent_last_name: agent.last_name,
    })))
}

async fn delete_call(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if requester.role != UserRole::Admin {
        return Err(ApiError::forbidden("admin role required to delete calls"));
    }

    let deleted = db::delete_call(&state.pool, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("call"));
    }

    tracing::info!("Call {} deleted by {}", id, requester.id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp3_accepted_case_insensitively() {
        assert!(validate_audio_path("call_records/2025/01/rec.mp3").is_ok());
        assert!(validate_audio_path("REC.MP3").is_ok());
    }

    #[test]
    fn non_audio_extensions_rejected() {
        assert!(validate_audio_path("call_records/rec.wav").is_err());
        assert!(validate_audio_path("rec.txt").is_err());
        assert!(validate_audio_path("no-extension").is_err());
        assert!(validate_audio_path("").is_err());
    }

    #[test]
    fn phone_number_bounds() {
        assert!(validate_call_fields("+905551112233", 120).is_ok());
        assert!(validate_call_fields("", 120).is_err());
        assert!(validate_call_fields(&"9".repeat(21), 120).is_err());
        assert!(validate_call_fields("+905551112233", -1).is_err());
    }
}
