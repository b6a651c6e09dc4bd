use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/mealplan-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Tables created by the migrations, in dependency order.
pub const TABLES: [&str; 3] = ["food_items", "meal_plans", "meal_plan_details"];

/// Connect a pool to the configured database.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Apply every embedded migration not yet recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    info!(migrations = MIGRATOR.iter().count(), "database schema up to date");
    Ok(())
}

/// Create the configured database if the server does not have it yet.
///
/// `CREATE DATABASE` takes no bind parameters, so the name must be a plain
/// identifier; anything else is refused before connecting.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    if !db_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("database name {db_name:?} contains invalid characters");
    }

    let maintenance_url = config.maintenance_url();
    let mut conn = PgConnection::connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to connect to maintenance database at {maintenance_url}"))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&mut conn)
            .await
            .context("failed to query pg_database")?;

    if exists {
        info!(db = db_name, "database already exists");
    } else {
        (&mut conn)
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "database created");
    }

    conn.close().await.context("failed to close maintenance connection")
}

/// Row count of every table in [`TABLES`], in that order, from one query.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    // Table names come from a fixed list, never from input.
    let query = TABLES
        .iter()
        .enumerate()
        .map(|(ord, table)| format!("SELECT {ord} AS ord, '{table}' AS name, COUNT(*) AS n FROM {table}"))
        .collect::<Vec<_>>()
        .join(" UNION ALL ")
        + " ORDER BY ord";

    let rows: Vec<(i32, String, i64)> = sqlx::query_as(&query)
        .fetch_all(pool)
        .await
        .context("failed to count table rows")?;
    Ok(rows.into_iter().map(|(_, name, n)| (name, n)).collect())
}
