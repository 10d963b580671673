use crate::db::{self, EvaluationDetail};
use crate::domain::hooks::HookEvent;
use crate::domain::models::{display_name, ScoreMap, UserRole};
use crate::domain::scope::{evaluation_scope, CallScope};
use crate::domain::scoring;
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

#[derive(Debug, Deserialize)]
pub struct CreateEvaluationPayload {
    pub call_id: Uuid,
    pub scores: ScoreMap,
    pub comments: String,
    #[serde(default)]
    pub improvement_areas: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEvaluationPayload {
    pub scores: Option<ScoreMap>,
    pub comments: Option<String>,
    pub improvement_areas: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallDetails {
    pub id: Uuid,
    pub agent_name: String,
    pub call_date: DateTime<Utc>,
    pub phone_number: String,
    pub duration_secs: i32,
}

#[derive(Debug, Serialize)]
pub struct EvaluationOut {
    pub id: Uuid,
    pub call_id: Uuid,
    pub call_details: CallDetails,
    pub evaluator_id: Uuid,
    pub evaluator_name: String,
    pub scores: ScoreMap,
    pub total_score: f64,
    pub comments: String,
    pub improvement_areas: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EvaluationDetail> for EvaluationOut {
    fn from(row: EvaluationDetail) -> Self {
        let evaluator_name = display_name(
            &row.evaluator_username,
            &row.evaluator_first_name,
            &row.evaluator_last_name,
        );
        let agent_name = display_name(
            &row.agent_username,
            &row.agent_first_name,
            &row.agent_last_name,
        );
        EvaluationOut {
            id: row.evaluation.id,
            call_id: row.evaluation.call_id,
            call_details: CallDetails {
                id: row.evaluation.call_id,
                agent_name,
                call_date: row.call_date,
                phone_number: row.phone_number,
                duration_secs: row.duration_secs,
            },
            evaluator_id: row.evaluation.evaluator_id,
            evaluator_name,
            scores: row.evaluation.scores.0,
            total_score: row.evaluation.total_score,
            comments: row.evaluation.comments,
            improvement_areas: row.evaluation.improvement_areas,
            created_at: row.evaluation.created_at,
            updated_at: row.evaluation.updated_at,
        }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_evaluations).post(create_evaluation))
        .route(
            "/:id",
            get(get_evaluation).put(update_evaluation).patch(update_evaluation),
        )
        .with_state(state)
}

async fn list_evaluations(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<EvaluationOut>>, ApiError> {
    let rows = db::list_evaluations(&state.pool, evaluation_scope(&requester)).await?;
    Ok(Json(rows.into_iter().map(EvaluationOut::from).collect()))
}

async fn get_evaluation(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationOut>, ApiError> {
    let row = db::find_evaluation_detail(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("evaluation"))?;

    if let CallScope::AgentOnly(agent_id) = evaluation_scope(&requester) {
        if row.agent_id != agent_id {
            return Err(ApiError::NotFound("evaluation"));
        }
    }

    Ok(Json(EvaluationOut::from(row)))
}

async fn create_evaluation(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Json(payload): Json<CreateEvaluationPayload>,
) -> Result<(StatusCode, Json<EvaluationOut>), ApiError> {
    let call = db::find_call_by_id(&state.pool, payload.call_id)
        .await?
        .ok_or(ApiError::NotFound("call"))?;

    if db::find_evaluation_by_call(&state.pool, call.id)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("call already has an evaluation"));
    }

    let criteria = db::list_criteria(&state.pool).await?;
    let total_score = scoring::weighted_total(&payload.scores, &criteria)?;

    let new_evaluation = db::NewEvaluation {
        id: Uuid::new_v4(),
        call_id: call.id,
        // Evaluator identity comes from the session, never the payload.
        evaluator_id: requester.id,
        scores: payload.scores,
        total_score,
        comments: payload.comments,
        improvement_areas: payload.improvement_areas,
    };

    // A concurrent writer loses to the UNIQUE(call_id) constraint here.
    let evaluation = db::insert_evaluation(&state.pool, &new_evaluation)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::conflict("call already has an evaluation")
            }
            _ => ApiError::Database(e),
        })?;

    state.hooks.dispatch(HookEvent::EvaluationCreated(evaluation.id));

    let row = db::find_evaluation_detail(&state.pool, evaluation.id)
        .await?
        .ok_or(ApiError::NotFound("evaluation"))?;

    tracing::info!(
        "Evaluation {} created for call {} by {} (total {})",
        evaluation.id,
        call.id,
        requester.id,
        total_score
    );
    Ok((StatusCode::CREATED, Json(EvaluationOut::from(row))))
}

async fn update_evaluation(
    AuthUser(requester): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEvaluationPayload>,
) -> Result<Json<EvaluationOut>, ApiError> {
    let mut evaluation = db::find_evaluation_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("evaluation"))?;

    if evaluation.evaluator_id != requester.id && requester.role != UserRole::Admin {
        return Err(ApiError::forbidden(
            "only the evaluator or an admin may update an evaluation",
        ));
    }

    if let Some(scores) = payload.scores {
        let criteria = db::list_criteria(&state.pool).await?;
        evaluation.total_score = scoring::weighted_total(&scores, &criteria)?;
        evaluation.scores = sqlx::types::Json(scores);
    }
    if let Some(comments) = payload.comments {
        evaluation.comments = comments;
    }
    if let Some(improvement_areas) = payload.improvement_areas {
        evaluation.improvement_areas = improvement_areas;
    }

    let evaluation = db::update_evaluation(&state.pool, &evaluation).await?;

    let row = db::find_evaluation_detail(&state.pool, evaluation.id)
        .await?
        .ok_or(ApiError::NotFound("evaluation"))?;

    Ok(Json(EvaluationOut::from(row)))
}
