use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;

/// Creates the PostgreSQL pool backing the task table. Pool size comes
/// from `DB_MAX_CONNECTIONS`; the scheduler and the handlers share it.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    info!(
        max_connections = config.db_max_connections,
        "PostgreSQL pool ready"
    );
    Ok(pool)
}
