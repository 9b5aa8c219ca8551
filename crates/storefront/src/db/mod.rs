//! `PostgreSQL` pool and schema migrations.
//!
//! # Tables
//!
//! - `storefront.cart_slot` - Serialized carts keyed by storage slot
//! - `tower_sessions.session` - Shopper sessions (cart tokens)
//!
//! The server never migrates on start-up; run `cartwright migrate` first.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Migrations in `crates/storefront/migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors raised while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A storefront migration failed.
    #[error("storefront migration failed: {0}")]
    Storefront(#[from] MigrateError),

    /// The session table could not be created.
    #[error("session store migration failed: {0}")]
    SessionStore(#[from] sqlx::Error),
}

/// Connect to the storefront database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url.expose_secret())
        .await
}

/// Bring the cart slot and session tables up to date.
///
/// # Errors
///
/// Returns `MigrationError` naming the step that failed.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running storefront migrations");
    MIGRATOR.run(pool).await?;

    tracing::info!("Running session store migrations");
    PostgresStore::new(pool.clone()).migrate().await?;
    Ok(())
}
