use crate::domain::scoring::ScoringError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Request-scoped error taxonomy. Everything maps to a JSON body of the
/// shape `{"error": <kind>, "detail": <message>, "field": <field>?}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: impl Into<Option<&'static str>>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }
}

impl From<ScoringError> for ApiError {
    fn from(err: ScoringError) -> Self {
        ApiError::validation("scores", err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, field, detail) = match self {
            ApiError::Validation { field, message } => {
                (StatusCode::BAD_REQUEST, "validation", field, message)
            }
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, "forbidden", None, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", None, message),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "not_found",
                None,
                format!("{what} not found"),
            ),
            // Constraint violations that slipped past handler pre-checks,
            // e.g. a concurrent second evaluation for the same call.
            ApiError::Database(err) => match &err {
                sqlx::Error::Database(db) if db.is_unique_violation() => (
                    StatusCode::CONFLICT,
                    "conflict",
                    None,
                    "resource already exists".to_string(),
                ),
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    None,
                    "referenced entity not found".to_string(),
                ),
                _ => {
                    tracing::error!("database error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal",
                        None,
                        "internal server error".to_string(),
                    )
                }
            },
            ApiError::Internal(err) => {
                tracing::error!("internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    None,
                    "internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: kind,
                detail,
                field,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (ApiError::validation("weight", "weight must be 1-100"), StatusCode::BAD_REQUEST),
            (ApiError::forbidden("admin role required"), StatusCode::FORBIDDEN),
            (ApiError::conflict("call already evaluated"), StatusCode::CONFLICT),
            (ApiError::NotFound("call"), StatusCode::NOT_FOUND),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn scoring_errors_surface_as_validation() {
        let err: ApiError = ScoringError::UnknownCriterion(7).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn row_not_found_is_internal_not_404() {
        // RowNotFound means a query bug, not a missing entity; handlers map
        // missing entities through fetch_optional.
        let err = ApiError::Database(sqlx::Error::RowNotFound);
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
