use base64::{engine::general_purpose, Engine as _};
use callcenter_qm::db::seed;
use callcenter_qm::domain::hooks::{HookEvent, PostCommitHooks};
use callcenter_qm::state::{AppState, SharedState};
use callcenter_qm::web;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL missing");
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    let session_key_b64 = std::env::var("SESSION_KEY").expect("SESSION_KEY missing");
    let session_key = general_purpose::STANDARD
        .decode(session_key_b64)
        .expect("SESSION_KEY must be base64");

    seed::seed_all(&pool).await?;

    let strict_status_transitions = std::env::var("STRICT_STATUS_TRANSITIONS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if strict_status_transitions {
        tracing::info!("Strict call status transitions enabled");
    }

    // Post-commit extension point; observability-only for now.
    let mut hooks = PostCommitHooks::new();
    hooks.register(|event| match event {
        HookEvent::UserCreated(id) => tracing::debug!("post-commit: user {} created", id),
        HookEvent::EvaluationCreated(id) => {
            tracing::debug!("post-commit: evaluation {} created", id)
        }
    });

    let shared: SharedState = Arc::new(AppState {
        pool,
        session_key,
        hooks: Arc::new(hooks),
        strict_status_transitions,
    });

    let app = web::routes(shared)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
        let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        format!("0.0.0.0:{}", port)
    });
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
