//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Set up the test database: truncate the three core tables and reseed the
/// singleton stats row, leaving a clean slate for each test.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    sqlx::query("TRUNCATE TABLE events, processed_events, stats")
        .execute(&mut *tx)
        .await
        .expect("Failed to clean up DB");

    sqlx::query(
        r#"
        INSERT INTO stats (id, received_count, unique_processed_count, duplicate_dropped_count, started_at, last_updated)
        VALUES (1, 0, 0, 0, NOW(), NOW())
        "#,
    )
    .execute(&mut *tx)
    .await
    .expect("Failed to seed stats row");

    tx.commit().await.expect("Failed to commit transaction");

    pool
}
