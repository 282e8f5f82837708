pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Schema applied by `--migrate` and on every start.
pub const SCHEMA_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Build the full application router with middleware and state attached.
pub fn build_router(state: state::AppState, max_upload_bytes: usize) -> Router {
    routes::routes::routes(max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Apply the embedded schema statement by statement.
///
/// Every statement is `IF NOT EXISTS`, so running this twice is harmless.
pub async fn run_migrations(db: &SqlitePool) -> anyhow::Result<()> {
    let statements = SCHEMA_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}
