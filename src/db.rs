//! Database module
//!
//! Database connection and schema verification utilities.

use sqlx::PgPool;

/// Run database migrations
/// Note: We use raw SQL files in migrations/ directory
/// This function can be used to verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Simple connectivity check
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let required_tables = vec!["events", "processed_events", "stats"];

    for table in required_tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    if !check_stats_row(pool).await? {
        return Ok(false);
    }

    Ok(true)
}

/// The `stats` table is a singleton; confirm the `id = 1` row seeded by the
/// migration is present before accepting traffic.
async fn check_stats_row(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM stats WHERE id = 1)")
        .fetch_one(pool)
        .await?;

    if !exists {
        tracing::error!("Singleton stats row (id = 1) does not exist. Please run migrations.");
        return Ok(false);
    }

    Ok(true)
}
