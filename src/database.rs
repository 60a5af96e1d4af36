use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::store::StoreError;

pub mod access;
pub mod course_store;

/// Connects to Postgres and creates the schema and tables if they are missing.
pub async fn init_database(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url())
        .await?;

    let mut transaction = pool.begin().await?;

    sqlx::query("CREATE SCHEMA IF NOT EXISTS coursecheck;")
        .execute(&mut *transaction)
        .await?;

    // One row per content block. `fields` holds the block's settings as JSON and
    // `children` the usage keys of its children, in order.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS coursecheck.course_blocks (
            usage_key TEXT PRIMARY KEY,
            course_key TEXT NOT NULL,
            block_type TEXT NOT NULL,
            fields JSONB NOT NULL DEFAULT '{}'::jsonb,
            children TEXT[] NOT NULL DEFAULT '{}'
        );",
    )
    .execute(&mut *transaction)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS course_blocks_course_key
            ON coursecheck.course_blocks (course_key);",
    )
    .execute(&mut *transaction)
    .await?;

    // A NULL course_key makes the role apply to every course of the org.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS coursecheck.course_access_role (
            id INTEGER PRIMARY KEY GENERATED ALWAYS AS IDENTITY,
            username TEXT NOT NULL,
            org TEXT NOT NULL,
            course_key TEXT,
            role TEXT NOT NULL
        );",
    )
    .execute(&mut *transaction)
    .await?;

    // NULLS NOT DISTINCT so org-wide roles (NULL course_key) are unique too.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS course_access_role_unique
            ON coursecheck.course_access_role (username, org, course_key, role)
            NULLS NOT DISTINCT;",
    )
    .execute(&mut *transaction)
    .await?;

    transaction.commit().await?;
    info!(host = %config.host, "database initialized");

    Ok(pool)
}
