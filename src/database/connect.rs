use log::info;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{config::Config, error::QueryError};

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, QueryError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database ({} max connections)", config.max_connections);
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), QueryError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| QueryError::new(format!("Migration failed: {e}")))?;

    Ok(())
}
