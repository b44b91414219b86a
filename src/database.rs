use std::{ops::Deref, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// Shared handle to the Postgres pool that the repositories are implemented
/// on.
#[derive(Clone)]
pub struct PostgresConnection(PgPool);

impl PostgresConnection {
    pub fn new(pool: PgPool) -> Self {
        Self(pool)
    }

    /// Open a connection pool.
    ///
    /// # Arguments
    ///
    /// * `database_url` - Connection string for the database.
    /// * `pool_size` - Maximum number of pooled connections.
    /// * `timeout` - How long to wait when acquiring a connection.
    pub async fn connect(
        database_url: &str,
        pool_size: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await?;

        info!(pool_size, "Connected to database.");

        Ok(Self(pool))
    }
}

impl Deref for PostgresConnection {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
