//! Offline QA simulation harness.
//!
//! Replays the UI flows (login, evaluation form, role-scoped listings)
//! against in-memory data and records the outcome in the diagnostic test
//! log. Never talks to the database or the HTTP server.

use anyhow::Result;
use callcenter_qm::domain::models::{CallStatus, DbCall, DbCriterion, DbUser, ScoreMap, UserRole};
use callcenter_qm::domain::scope;
use callcenter_qm::domain::scoring;
use callcenter_qm::testlog::{LogLevel, TestLog};
use chrono::Utc;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs/qa_sim.log.json"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut log = TestLog::open(&path)?;
    log.info("QA simulation started")?;

    let mut rng = rand::thread_rng();

    simulate_logins(&mut log, &mut rng)?;
    simulate_evaluation_form(&mut log, &mut rng)?;
    simulate_scoped_listings(&mut log)?;

    log.success("QA simulation finished")?;
    println!("wrote {} entries to {}", log.len(), log.path().display());
    log.close()?;
    Ok(())
}

fn simulate_logins(log: &mut TestLog, rng: &mut impl Rng) -> Result<()> {
    log.info("Login scenario started")?;

    for (username, role) in [("admin", "admin"), ("expert", "expert"), ("agent", "agent")] {
        log.append(
            LogLevel::Info,
            format!("Attempting login as {username}"),
            Some(serde_json::json!({ "username": username, "role": role })),
        )?;

        // 80% simulated success rate.
        if rng.gen_bool(0.8) {
            log.append(
                LogLevel::Success,
                format!("{username} logged in"),
                Some(serde_json::json!({
                    "role": role,
                    "login_time": Utc::now().to_rfc3339(),
                })),
            )?;
        } else {
            log.append(
                LogLevel::Error,
                format!("Login failed for {username}"),
                Some(serde_json::json!({ "error": "invalid username or password" })),
            )?;
        }
    }

    log.info("Login scenario finished")?;
    Ok(())
}

fn default_criteria() -> Vec<DbCriterion> {
    [
        (1, "Greeting", 10),
        (2, "Problem Understanding", 20),
        (3, "Solution Offering", 30),
        (4, "Communication Skills", 25),
        (5, "Closing", 15),
    ]
    .into_iter()
    .map(|(id, name, weight)| DbCriterion {
        id,
        name: name.to_string(),
        description: String::new(),
        weight,
    })
    .collect()
}

fn simulate_evaluation_form(log: &mut TestLog, rng: &mut impl Rng) -> Result<()> {
    log.info("Evaluation form scenario started")?;

    let agent_no = rng.gen_range(1..=5);
    let queues = ["Support", "Sales", "Technical Support", "Complaints"];
    let queue = queues[rng.gen_range(0..queues.len())];
    log.append(
        LogLevel::Info,
        format!("Selected agent {agent_no}"),
        Some(serde_json::json!({
            "queue": queue,
            "phone_number": format!("555{}", rng.gen_range(1_000_000..10_000_000)),
            "duration_secs": rng.gen_range(60..900),
        })),
    )?;

    let criteria = default_criteria();
    let mut scores: ScoreMap = BTreeMap::new();
    for criterion in &criteria {
        let score = rng.gen_range(60..=100) as f64;
        scores.insert(criterion.id, score);
        log.append(
            LogLevel::Debug,
            format!("Scored criterion '{}'", criterion.name),
            Some(serde_json::json!({ "criterion_id": criterion.id, "score": score })),
        )?;
    }

    match scoring::weighted_total(&scores, &criteria) {
        Ok(total) => {
            let verdict = if total >= 80.0 {
                "good"
            } else if total >= 60.0 {
                "average"
            } else {
                "weak"
            };
            log.append(
                LogLevel::Info,
                format!("Computed total score {total:.2}"),
                Some(serde_json::json!({ "verdict": verdict })),
            )?;
            log.success("Evaluation form submitted")?;
        }
        Err(e) => {
            log.error(format!("Scoring failed: {e}"))?;
        }
    }

    log.info("Evaluation form scenario finished")?;
    Ok(())
}

fn simulate_scoped_listings(log: &mut TestLog) -> Result<()> {
    log.info("Scoped listing scenario started")?;

    let admin = fake_user("admin", UserRole::Admin);
    let expert = fake_user("expert", UserRole::Expert);
    let agent_a = fake_user("agent.a", UserRole::Agent);
    let agent_b = fake_user("agent.b", UserRole::Agent);

    let calls = vec![
        fake_call(&agent_a),
        fake_call(&agent_a),
        fake_call(&agent_b),
    ];

    for requester in [&admin, &expert, &agent_a, &agent_b] {
        let visible = calls
            .iter()
            .filter(|c| scope::can_view_call(requester, c))
            .count();
        log.append(
            LogLevel::Info,
            format!("{} sees {visible} of {} calls", requester.username, calls.len()),
            Some(serde_json::json!({ "role": requester.role.as_str() })),
        )?;
    }

    log.info("Scoped listing scenario finished")?;
    Ok(())
}

fn fake_user(username: &str, role: UserRole) -> DbUser {
    DbUser {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        hash: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        role,
        team: "QA".to_string(),
        employee_id: Uuid::new_v4().to_string(),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn fake_call(agent: &DbUser) -> DbCall {
    DbCall {
        id: Uuid::new_v4(),
        agent_id: agent.id,
        call_date: Utc::now(),
        phone_number: "+905551112233".to_string(),
        duration_secs: 330,
        audio_path: "call_records/sim.mp3".to_string(),
        queue: "Support".to_string(),
        status: CallStatus::Pending,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
