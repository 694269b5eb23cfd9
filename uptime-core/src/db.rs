use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use crate::{config::DatabaseConfig, error::Result};

pub type DatabasePool = Pool<Postgres>;

pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
