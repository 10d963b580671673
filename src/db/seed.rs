use crate::domain::models::UserRole;
use anyhow::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn seed_all(pool: &PgPool) -> Result<()> {
    seed_admin(pool).await?;
    seed_criteria(pool).await?;
    Ok(())
}

/// Bootstrap admin so a fresh deployment can log in. No-op once the
/// username exists.
async fn seed_admin(pool: &PgPool) -> Result<()> {
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@localhost".to_string());
    let password = match std::env::var("ADMIN_PASSWORD") {
        Ok(p) if !p.is_empty() => p,
        _ => {
            tracing::warn!("ADMIN_PASSWORD not set, skipping admin seed");
            return Ok(());
        }
    };

    let salt = SaltString::generate(rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?
        .to_string();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, hash, role, employee_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&username)
    .bind(&email)
    .bind(&hash)
    .bind(UserRole::Admin)
    .bind("0001")
    .execute(pool)
    .await?;

    Ok(())
}

/// Default scoring dimensions, only inserted into an empty criteria table.
async fn seed_criteria(pool: &PgPool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM evaluation_criteria")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let defaults: [(&str, &str, i16); 5] = [
        ("Greeting", "Opening and customer greeting quality", 10),
        ("Problem Understanding", "Identifying the customer's issue", 20),
        ("Solution Offering", "Correctness and clarity of the proposed solution", 30),
        ("Communication Skills", "Tone, pace and language throughout the call", 25),
        ("Closing", "Summary and closing of the conversation", 15),
    ];

    for (name, description, weight) in defaults {
        sqlx::query(
            r#"
            INSERT INTO evaluation_criteria (name, description, weight)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(weight)
        .execute(pool)
        .await?;
    }

    tracing::info!("Seeded {} default evaluation criteria", defaults.len());
    Ok(())
}
