//! Role-based read visibility.
//!
//! Scoping is silent: a filtered list or a NotFound on a single item, never
//! an explicit denial. Explicit write permissions live with the handlers.

use crate::domain::models::{DbCall, DbUser, UserRole};
use uuid::Uuid;

/// Which users a requester may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    /// Admins see everyone.
    All,
    /// Experts see agents and other experts, not admins.
    ExpertsAndAgents,
    /// Agents see only themselves.
    SelfOnly(Uuid),
}

/// Which calls (and, transitively, evaluations) a requester may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallScope {
    All,
    /// Only calls owned by this agent.
    AgentOnly(Uuid),
}

pub fn user_scope(requester: &DbUser) -> UserScope {
    match requester.role {
        UserRole::Admin => UserScope::All,
        UserRole::Expert => UserScope::ExpertsAndAgents,
        UserRole::Agent => UserScope::SelfOnly(requester.id),
    }
}

pub fn call_scope(requester: &DbUser) -> CallScope {
    match requester.role {
        UserRole::Admin | UserRole::Expert => CallScope::All,
        UserRole::Agent => CallScope::AgentOnly(requester.id),
    }
}

/// Evaluations follow the calls they belong to: an agent sees evaluations of
/// their own calls, experts and admins see all of them.
pub fn evaluation_scope(requester: &DbUser) -> CallScope {
    call_scope(requester)
}

pub fn can_view_user(requester: &DbUser, target: &DbUser) -> bool {
    match user_scope(requester) {
        UserScope::All => true,
        UserScope::ExpertsAndAgents => {
            matches!(target.role, UserRole::Agent | UserRole::Expert)
        }
        UserScope::SelfOnly(id) => target.id == id,
    }
}

pub fn can_view_call(requester: &DbUser, call: &DbCall) -> bool {
    match call_scope(requester) {
        CallScope::All => true,
        CallScope::AgentOnly(id) => call.agent_id == id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CallStatus;
    use chrono::Utc;

    fn user(role: UserRole) -> DbUser {
        DbUser {
            id: Uuid::new_v4(),
            username: format!("{}-user", role.as_str()),
            email: format!("{}@example.com", role.as_str()),
            hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            team: String::new(),
            employee_id: Uuid::new_v4().to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn call_for(agent: &DbUser) -> DbCall {
        DbCall {
            id: Uuid::new_v4(),
            agent_id: agent.id,
            call_date: Utc::now(),
            phone_number: "+905551112233".into(),
            duration_secs: 330,
            audio_path: "call_records/test.mp3".into(),
            queue: "Support".into(),
            status: CallStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_sees_everything() {
        let admin = user(UserRole::Admin);
        assert_eq!(user_scope(&admin), UserScope::All);
        assert_eq!(call_scope(&admin), CallScope::All);
    }

    #[test]
    fn expert_sees_agents_and_experts_but_not_admins() {
        let expert = user(UserRole::Expert);
        let admin = user(UserRole::Admin);
        let agent = user(UserRole::Agent);
        let other_expert = user(UserRole::Expert);

        assert!(can_view_user(&expert, &agent));
        assert!(can_view_user(&expert, &other_expert));
        assert!(can_view_user(&expert, &expert));
        assert!(!can_view_user(&expert, &admin));

        assert_eq!(call_scope(&expert), CallScope::All);
    }

    #[test]
    fn agent_sees_only_self_and_own_calls() {
        let agent = user(UserRole::Agent);
        let peer = user(UserRole::Agent);
        let own_call = call_for(&agent);
        let peer_call = call_for(&peer);

        assert!(can_view_user(&agent, &agent));
        assert!(!can_view_user(&agent, &peer));
        assert!(can_view_call(&agent, &own_call));
        assert!(!can_view_call(&agent, &peer_call));
        assert_eq!(evaluation_scope(&agent), CallScope::AgentOnly(agent.id));
    }

    #[test]
    fn visible_call_set_for_agent_is_exactly_their_own() {
        let agent = user(UserRole::Agent);
        let peer = user(UserRole::Agent);
        let calls = vec![call_for(&agent), call_for(&peer), call_for(&agent)];

        let visible: Vec<_> = calls
            .iter()
            .filter(|c| can_view_call(&agent, c))
            .collect();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|c| c.agent_id == agent.id));

        let expert = user(UserRole::Expert);
        assert_eq!(calls.iter().filter(|c| can_view_call(&expert, c)).count(), 3);
    }
}
