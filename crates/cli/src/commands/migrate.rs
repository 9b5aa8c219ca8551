//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cartwright migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Creates `storefront.cart_slot` from `crates/storefront/migrations/` and the
//! session table used by the storefront's `PostgreSQL` session store.

use cartwright_storefront::db;

use super::{CommandError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Storefront migrations complete!");
    Ok(())
}
