//! Database migration command.
//!
//! Migrations live in `crates/api/migrations/` and are embedded into this
//! binary at compile time. They are never run automatically at server
//! startup; this command is the explicit lifecycle step.

use super::CommandError;

/// Run all pending database migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
