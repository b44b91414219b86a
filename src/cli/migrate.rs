use sqlx::{migrate::Migrator, postgres::PgPoolOptions};
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub struct MigrationOpts {
    pub database_url: String,
}

pub async fn run_migrations(opts: MigrationOpts) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&opts.database_url)
        .await?;

    MIGRATOR.run(&pool).await?;
    info!("Applied database migrations.");

    Ok(())
}
