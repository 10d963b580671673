pub mod seed;

use crate::domain::models::{
    CallStatus, DbCall, DbCriterion, DbEvaluation, DbUser, ScoreMap, UserRole,
};
use crate::domain::scope::{CallScope, UserScope};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = r#"
    id,
    username,
    email,
    hash,
    first_name,
    last_name,
    role,
    team,
    employee_id,
    is_active,
    created_at,
    updated_at
"#;

const CALL_COLUMNS: &str = r#"
    id,
    agent_id,
    call_date,
    phone_number,
    duration_secs,
    audio_path,
    queue,
    status,
    created_at,
    updated_at
"#;

#[derive(Debug)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub team: String,
    pub employee_id: String,
}

#[derive(Debug)]
pub struct NewCall {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub call_date: DateTime<Utc>,
    pub phone_number: String,
    pub duration_secs: i32,
    pub audio_path: String,
    pub queue: String,
    pub status: CallStatus,
}

#[derive(Debug)]
pub struct NewEvaluation {
    pub id: Uuid,
    pub call_id: Uuid,
    pub evaluator_id: Uuid,
    pub scores: ScoreMap,
    pub total_score: f64,
    pub comments: String,
    pub improvement_areas: String,
}

/// Call row joined with its agent's name fields for serialization.
#[derive(Debug, FromRow)]
pub struct CallWithAgent {
    #[sqlx(flatten)]
    pub call: DbCall,
    pub agent_username: String,
    pub agent_first_name: String,
    pub agent_last_name: String,
}

/// Evaluation row joined with evaluator and call details.
#[derive(Debug, FromRow)]
pub struct EvaluationDetail {
    #[sqlx(flatten)]
    pub evaluation: DbEvaluation,
    pub evaluator_username: String,
    pub evaluator_first_name: String,
    pub evaluator_last_name: String,
    pub call_date: DateTime<Utc>,
    pub phone_number: String,
    pub duration_secs: i32,
    pub agent_id: Uuid,
    pub agent_username: String,
    pub agent_first_name: String,
    pub agent_last_name: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DbUser>, sqlx::Error> {
    sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Active users only; inactive accounts cannot authenticate.
pub async fn find_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<DbUser>, sqlx::Error> {
    sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active = true"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Users visible to the requester, join-recency first.
pub async fn list_users(pool: &PgPool, scope: UserScope) -> Result<Vec<DbUser>, sqlx::Error> {
    match scope {
        UserScope::All => {
            sqlx::query_as::<_, DbUser>(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
            ))
            .fetch_all(pool)
            .await
        }
        UserScope::ExpertsAndAgents => {
            sqlx::query_as::<_, DbUser>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role IN ('agent', 'expert') ORDER BY created_at DESC"
            ))
            .fetch_all(pool)
            .await
        }
        UserScope::SelfOnly(id) => {
            sqlx::query_as::<_, DbUser>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(id)
            .fetch_all(pool)
            .await
        }
    }
}

pub async fn insert_user(pool: &PgPool, user: &NewUser) -> Result<DbUser, sqlx::Error> {
    sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (id, username, email, hash, first_name, last_name, role, team, employee_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role)
    .bind(&user.team)
    .bind(&user.employee_id)
    .fetch_one(pool)
    .await
}

/// Persists all mutable fields of an already-merged user record.
pub async fn update_user(pool: &PgPool, user: &DbUser) -> Result<DbUser, sqlx::Error> {
    sqlx::query_as::<_, DbUser>(&format!(
        r#"
        UPDATE users
        SET username = $1,
            email = $2,
            hash = $3,
            first_name = $4,
            last_name = $5,
            role = $6,
            team = $7,
            employee_id = $8,
            is_active = $9,
            updated_at = NOW()
        WHERE id = $10
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role)
    .bind(&user.team)
    .bind(&user.employee_id)
    .bind(user.is_active)
    .bind(user.id)
    .fetch_one(pool)
    .await
}

pub async fn set_user_active(
    pool: &PgPool,
    id: Uuid,
    active: bool,
) -> Result<Option<DbUser>, sqlx::Error> {
    sqlx::query_as::<_, DbUser>(&format!(
        r#"
        UPDATE users
        SET is_active = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(active)
    .bind(id)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

pub async fn find_call_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DbCall>, sqlx::Error> {
    sqlx::query_as::<_, DbCall>(&format!(
        "SELECT {CALL_COLUMNS} FROM calls WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Calls visible to the requester, newest call first.
pub async fn list_calls(
    pool: &PgPool,
    scope: CallScope,
) -> Result<Vec<CallWithAgent>, sqlx::Error> {
    let base = r#"
        SELECT c.id, c.agent_id, c.call_date, c.phone_number, c.duration_secs,
               c.audio_path, c.queue, c.status, c.created_at, c.updated_at,
               u.username AS agent_username,
               u.first_name AS agent_first_name,
               u.last_name AS agent_last_name
        FROM calls c
        JOIN users u ON u.id = c.agent_id
    "#;
    match scope {
        CallScope::All => {
            sqlx::query_as::<_, CallWithAgent>(&format!(
                "{base} ORDER BY c.call_date DESC"
            ))
            .fetch_all(pool)
            .await
        }
        CallScope::AgentOnly(agent_id) => {
            sqlx::query_as::<_, CallWithAgent>(&format!(
                "{base} WHERE c.agent_id = $1 ORDER BY c.call_date DESC"
            ))
            .bind(agent_id)
            .fetch_all(pool)
            .await
        }
    }
}

pub async fn insert_call(pool: &PgPool, call: &NewCall) -> Result<DbCall, sqlx::Error> {
    sqlx::query_as::<_, DbCall>(&format!(
        r#"
        INSERT INTO calls (id, agent_id, call_date, phone_number, duration_secs, audio_path, queue, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {CALL_COLUMNS}
        "#
    ))
    .bind(call.id)
    .bind(call.agent_id)
    .bind(call.call_date)
    .bind(&call.phone_number)
    .bind(call.duration_secs)
    .bind(&call.audio_path)
    .bind(&call.queue)
    .bind(call.status)
    .fetch_one(pool)
    .await
}

pub async fn update_call(pool: &PgPool, call: &DbCall) -> Result<DbCall, sqlx::Error> {
    sqlx::query_as::<_, DbCall>(&format!(
        r#"
        UPDATE calls
        SET agent_id = $1,
            call_date = $2,
            phone_number = $3,
            duration_secs = $4,
            audio_path = $5,
            queue = $6,
            status = $7,
            updated_at = NOW()
        WHERE id = $8
        RETURNING {CALL_COLUMNS}
        "#
    ))
    .bind(call.agent_id)
    .bind(call.call_date)
    .bind(&call.phone_number)
    .bind(call.duration_secs)
    .bind(&call.audio_path)
    .bind(&call.queue)
    .bind(call.status)
    .bind(call.id)
    .fetch_one(pool)
    .await
}

/// Removes the call and, via ON DELETE CASCADE, its evaluation.
pub async fn delete_call(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM calls WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Evaluation criteria
// ---------------------------------------------------------------------------

pub async fn list_criteria(pool: &PgPool) -> Result<Vec<DbCriterion>, sqlx::Error> {
    sqlx::query_as::<_, DbCriterion>(
        "SELECT id, name, description, weight FROM evaluation_criteria ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn find_criterion_by_id(
    pool: &PgPool,
    id: i32,
) -> Result<Option<DbCriterion>, sqlx::Error> {
    sqlx::query_as::<_, DbCriterion>(
        "SELECT id, name, description, weight FROM evaluation_criteria WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_criterion(
    pool: &PgPool,
    name: &str,
    description: &str,
    weight: i16,
) -> Result<DbCriterion, sqlx::Error> {
    sqlx::query_as::<_, DbCriterion>(
        r#"
        INSERT INTO evaluation_criteria (name, description, weight)
        VALUES ($1, $2, $3)
        RETURNING id, name, description, weight
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(weight)
    .fetch_one(pool)
    .await
}

pub async fn update_criterion(
    pool: &PgPool,
    criterion: &DbCriterion,
) -> Result<DbCriterion, sqlx::Error> {
    sqlx::query_as::<_, DbCriterion>(
        r#"
        UPDATE evaluation_criteria
        SET name = $1, description = $2, weight = $3
        WHERE id = $4
        RETURNING id, name, description, weight
        "#,
    )
    .bind(&criterion.name)
    .bind(&criterion.description)
    .bind(criterion.weight)
    .bind(criterion.id)
    .fetch_one(pool)
    .await
}

pub async fn delete_criterion(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM evaluation_criteria WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Evaluations
// ---------------------------------------------------------------------------

const EVALUATION_DETAIL_QUERY: &str = r#"
    SELECT e.id, e.call_id, e.evaluator_id, e.scores, e.total_score,
           e.comments, e.improvement_areas, e.created_at, e.updated_at,
           ev.username AS evaluator_username,
           ev.first_name AS evaluator_first_name,
           ev.last_name AS evaluator_last_name,
           c.call_date, c.phone_number, c.duration_secs,
           c.agent_id,
           ag.username AS agent_username,
           ag.first_name AS agent_first_name,
           ag.last_name AS agent_last_name
    FROM evaluations e
    JOIN users ev ON ev.id = e.evaluator_id
    JOIN calls c ON c.id = e.call_id
    JOIN users ag ON ag.id = c.agent_id
"#;

/// Evaluations visible to the requester, newest first. Agent scope follows
/// the owning call's agent, not the evaluator.
pub async fn list_evaluations(
    pool: &PgPool,
    scope: CallScope,
) -> Result<Vec<EvaluationDetail>, sqlx::Error> {
    match scope {
        CallScope::All => {
            sqlx::query_as::<_, EvaluationDetail>(&format!(
                "{EVALUATION_DETAIL_QUERY} ORDER BY e.created_at DESC"
            ))
            .fetch_all(pool)
            .await
        }
        CallScope::AgentOnly(agent_id) => {
            sqlx::query_as::<_, EvaluationDetail>(&format!(
                "{EVALUATION_DETAIL_QUERY} WHERE c.agent_id = $1 ORDER BY e.created_at DESC"
            ))
            .bind(agent_id)
            .fetch_all(pool)
            .await
        }
    }
}

pub async fn find_evaluation_detail(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<EvaluationDetail>, sqlx::Error> {
    sqlx::query_as::<_, EvaluationDetail>(&format!(
        "{EVALUATION_DETAIL_QUERY} WHERE e.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_evaluation_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<DbEvaluation>, sqlx::Error> {
    sqlx::query_as::<_, DbEvaluation>(
        r#"
        SELECT id, call_id, evaluator_id, scores, total_score,
               comments, improvement_areas, created_at, updated_at
        FROM evaluations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_evaluation_by_call(
    pool: &PgPool,
    call_id: Uuid,
) -> Result<Option<DbEvaluation>, sqlx::Error> {
    sqlx::query_as::<_, DbEvaluation>(
        r#"
        SELECT id, call_id, evaluator_id, scores, total_score,
               comments, improvement_areas, created_at, updated_at
        FROM evaluations
        WHERE call_id = $1
        "#,
    )
    .bind(call_id)
    .fetch_optional(pool)
    .await
}

/// The UNIQUE constraint on call_id arbitrates concurrent inserts; a second
/// writer gets a unique violation rather than overwriting the first.
pub async fn insert_evaluation(
    pool: &PgPool,
    evaluation: &NewEvaluation,
) -> Result<DbEvaluation, sqlx::Error> {
    sqlx::query_as::<_, DbEvaluation>(
        r#"
        INSERT INTO evaluations (id, call_id, evaluator_id, scores, total_score, comments, improvement_areas)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, call_id, evaluator_id, scores, total_score,
                  comments, improvement_areas, created_at, updated_at
        "#,
    )
    .bind(evaluation.id)
    .bind(evaluation.call_id)
    .bind(evaluation.evaluator_id)
    .bind(Json(&evaluation.scores))
    .bind(evaluation.total_score)
    .bind(&evaluation.comments)
    .bind(&evaluation.improvement_areas)
    .fetch_one(pool)
    .await
}

pub async fn update_evaluation(
    pool: &PgPool,
    evaluation: &DbEvaluation,
) -> Result<DbEvaluation, sqlx::Error> {
    sqlx::query_as::<_, DbEvaluation>(
        r#"
        UPDATE evaluations
        SET scores = $1,
            total_score = $2,
            comments = $3,
            improvement_areas = $4,
            updated_at = NOW()
        WHERE id = $5
        RETURNING id, call_id, evaluator_id, scores, total_score,
                  comments, improvement_areas, created_at, updated_at
        "#,
    )
    .bind(&evaluation.scores)
    .bind(evaluation.total_score)
    .bind(&evaluation.comments)
    .bind(&evaluation.improvement_areas)
    .bind(evaluation.id)
    .fetch_one(pool)
    .await
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct DashboardCounts {
    pub total_calls: i64,
    pub pending_calls: i64,
    pub completed_evaluations: i64,
    pub average_score: Option<f64>,
}

pub async fn dashboard_counts(
    pool: &PgPool,
    scope: CallScope,
) -> Result<DashboardCounts, sqlx::Error> {
    let (filter, agent_id) = match scope {
        CallScope::All => ("", None),
        CallScope::AgentOnly(id) => (" WHERE c.agent_id = $1", Some(id)),
    };

    let query = format!(
        r#"
        SELECT COUNT(*) AS total_calls,
               COUNT(*) FILTER (WHERE c.status = 'pending') AS pending_calls,
               COUNT(e.id) AS completed_evaluations,
               AVG(e.total_score) AS average_score
        FROM calls c
        LEFT JOIN evaluations e ON e.call_id = c.id
        {filter}
        "#
    );

    let mut q = sqlx::query_as::<_, (i64, i64, i64, Option<f64>)>(&query);
    if let Some(id) = agent_id {
        q = q.bind(id);
    }
    let (total_calls, pending_calls, completed_evaluations, average_score) =
        q.fetch_one(pool).await?;

    Ok(DashboardCounts {
        total_calls,
        pending_calls,
        completed_evaluations,
        average_score,
    })
}

pub async fn recent_calls(
    pool: &PgPool,
    scope: CallScope,
    limit: i64,
) -> Result<Vec<CallWithAgent>, sqlx::Error> {
    let base = r#"
        SELECT c.id, c.agent_id, c.call_date, c.phone_number, c.duration_secs,
               c.audio_path, c.queue, c.status, c.created_at, c.updated_at,
               u.username AS agent_username,
               u.first_name AS agent_first_name,
               u.last_name AS agent_last_name
        FROM calls c
        JOIN users u ON u.id = c.agent_id
    "#;
    match scope {
        CallScope::All => {
            sqlx::query_as::<_, CallWithAgent>(&format!(
                "{base} ORDER BY c.call_date DESC LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(pool)
            .await
        }
        CallScope::AgentOnly(agent_id) => {
            sqlx::query_as::<_, CallWithAgent>(&format!(
                "{base} WHERE c.agent_id = $1 ORDER BY c.call_date DESC LIMIT $2"
            ))
            .bind(agent_id)
            .bind(limit)
            .fetch_all(pool)
            .await
        }
    }
}
