use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Expert,
    Agent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Expert => "expert",
            UserRole::Agent => "agent",
        }
    }

    pub fn parse(raw: &str) -> Option<UserRole> {
        match raw {
            "admin" => Some(UserRole::Admin),
            "expert" => Some(UserRole::Expert),
            "agent" => Some(UserRole::Agent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "call_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    InProgress,
    Completed,
}

impl CallStatus {
    /// Monotonic pending -> in_progress -> completed table. Only consulted
    /// when strict transition checking is enabled; the default mirrors the
    /// permissive behavior where any writer may set any status.
    pub fn can_transition_to(self, next: CallStatus) -> bool {
        use CallStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, InProgress)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (Completed, Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub team: String,
    pub employee_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbUser {
    pub fn full_name(&self) -> String {
        display_name(&self.username, &self.first_name, &self.last_name)
    }
}

/// "First Last", falling back to the username when both name parts are blank.
pub fn display_name(username: &str, first_name: &str, last_name: &str) -> String {
    let name = format!("{first_name} {last_name}");
    let name = name.trim();
    if name.is_empty() {
        username.to_string()
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCall {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub call_date: DateTime<Utc>,
    pub phone_number: String,
    pub duration_secs: i32,
    pub audio_path: String,
    pub queue: String,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCriterion {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub weight: i16,
}

/// Per-criterion scores keyed by criterion id. Keys are validated against
/// the stored criteria before an evaluation is accepted.
pub type ScoreMap = BTreeMap<i32, f64>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbEvaluation {
    pub id: Uuid,
    pub call_id: Uuid,
    pub evaluator_id: Uuid,
    pub scores: Json<ScoreMap>,
    pub total_score: f64,
    pub comments: String,
    pub improvement_areas: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [UserRole::Admin, UserRole::Expert, UserRole::Agent] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("manager"), None);
    }

    #[test]
    fn status_transitions_are_monotonic() {
        use CallStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn full_name_falls_back_to_username() {
        let mut user = sample_user();
        assert_eq!(user.full_name(), "Ayşe Yılmaz");
        user.first_name.clear();
        user.last_name.clear();
        assert_eq!(user.full_name(), "ayse.yilmaz");
    }

    fn sample_user() -> DbUser {
        DbUser {
            id: Uuid::new_v4(),
            username: "ayse.yilmaz".into(),
            email: "ayse@example.com".into(),
            hash: String::new(),
            first_name: "Ayşe".into(),
            last_name: "Yılmaz".into(),
            role: UserRole::Agent,
            team: "Support".into(),
            employee_id: "1002".into(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
