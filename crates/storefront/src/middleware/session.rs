//! Session middleware configuration.
//!
//! Sessions only carry the shopper's cart token; the cart itself lives in
//! the cart storage slot named by that token. Sessions are kept in
//! `PostgreSQL` when a database is configured and in memory otherwise.

use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use uuid::Uuid;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cw_session";

/// Session key holding the cart token.
pub const CART_TOKEN_KEY: &str = "cart_token";

/// Session expiry time in seconds (30 days).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Create the session layer over `store`.
///
/// # Arguments
///
/// * `store` - Session store (`MemoryStore` or `PostgresStore`)
/// * `config` - Storefront configuration (for the secure-cookie flag)
#[must_use]
pub fn create_session_layer<S>(store: S, config: &StorefrontConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Get the cart token from the session, if one was issued.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn cart_token(session: &Session) -> Result<Option<String>, tower_sessions::session::Error> {
    session.get::<String>(CART_TOKEN_KEY).await
}

/// Get the cart token from the session, issuing a new one if needed.
///
/// # Errors
///
/// Returns an error if the session store cannot be read or written.
pub async fn ensure_cart_token(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(token) = cart_token(session).await? {
        return Ok(token);
    }

    let token = Uuid::new_v4().to_string();
    session.insert(CART_TOKEN_KEY, &token).await?;
    tracing::debug!(cart_token = %token, "Issued cart token");
    Ok(token)
}
