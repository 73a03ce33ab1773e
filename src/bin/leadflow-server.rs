//! Leadflow API server: wires the Postgres-backed engine into the axum
//! router and serves it.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;

use leadflow_core::config::LeadflowConfig;
use leadflow_core::lifecycle::LeadLifecycle;
use leadflow_core::logging;
use leadflow_core::notify::Notifier;
use leadflow_core::store::postgres::{
    run_migrations, PgAssigneeDirectory, PgLeadStore, PgProjectDirectory, PgStatusCatalog,
};
use leadflow_core::web::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_structured_logging();

    let config = LeadflowConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(&config.database_url)
        .await?;
    run_migrations(&pool).await?;

    let engine = LeadLifecycle::new(
        Arc::new(PgLeadStore::new(pool.clone())),
        Arc::new(PgAssigneeDirectory::new(pool.clone())),
        Arc::new(PgStatusCatalog::new(pool.clone())),
        Arc::new(PgProjectDirectory::new(pool)),
        Notifier::new(config.notify_channel_capacity),
    );

    let app = web::router(AppState::new(engine));
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "leadflow server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
