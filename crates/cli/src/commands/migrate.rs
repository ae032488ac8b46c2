//! Database migration command.
//!
//! Applies the migrations embedded in the worker (`crates/worker/migrations/`)
//! to the master database, the same set the worker runs on startup.
//!
//! # Environment Variables
//!
//! - `MASTERDB_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::SecretString;
use shipline_worker::db;

/// Errors from the migrate command.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the worker's database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("MASTERDB_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("MASTERDB_URL"))?;

    tracing::info!("Connecting to master database...");
    let pool = db::create_pool(&database_url, 1).await?;

    db::run_migrations(&pool).await?;
    pool.close().await;

    tracing::info!("Migrations complete!");
    Ok(())
}
