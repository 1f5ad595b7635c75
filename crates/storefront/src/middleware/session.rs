//! Session middleware configuration and session-held state.
//!
//! Sessions are stored server-side in the active database (or in memory for
//! tests); the cookie only carries a signed session id.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use freshmart_core::Cart;

use crate::config::StorefrontConfig;
use crate::models::session_keys;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "fm_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over any `tower-sessions` store.
///
/// # Arguments
///
/// * `store` - Session store (`SqliteStore`, `PostgresStore`, `MemoryStore`)
/// * `config` - Storefront configuration (for session secret and cookie security)
#[must_use]
pub fn create_session_layer<S>(
    store: S,
    config: &StorefrontConfig,
) -> SessionManagerLayer<S, SignedCookie>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config))
}

/// Derive the cookie signing key from the configured secret.
///
/// Without a secret a random key is used, so sessions do not survive a
/// restart.
fn signing_key(config: &StorefrontConfig) -> Key {
    let Some(secret) = &config.session_secret else {
        tracing::warn!("FRESHMART_SESSION_SECRET not set; using a per-process session key");
        return Key::generate();
    };

    let digest = Sha512::digest(secret.expose_secret().as_bytes());
    Key::try_from(digest.as_slice()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Could not derive session key; using a random one");
        Key::generate()
    })
}

// =============================================================================
// Cart
// =============================================================================

/// Read the cart, treating a missing or unreadable value as empty.
pub async fn load_cart(session: &Session) -> Cart {
    match session.get::<Cart>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable session cart");
            Cart::new()
        }
    }
}

/// Store the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Drop the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_cart(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Cart>(session_keys::CART).await?;
    Ok(())
}

// =============================================================================
// Flash notices
// =============================================================================

/// Queue a notice for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn push_flash(
    session: &Session,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut pending = session
        .get::<Vec<String>>(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    pending.push(message.into());
    session.insert(session_keys::FLASH, pending).await
}

/// Remove and return queued notices.
pub async fn take_flash(session: &Session) -> Vec<String> {
    session
        .remove::<Vec<String>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use freshmart_core::{ProductId, Quantity};
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_cart_round_trips_through_session() {
        let session = session();
        assert!(load_cart(&session).await.is_empty());

        let mut cart = Cart::new();
        cart.add(ProductId::new(2), Quantity::new(3).unwrap());
        save_cart(&session, &cart).await.unwrap();
        assert_eq!(load_cart(&session).await.total_count(), 3);

        clear_cart(&session).await.unwrap();
        assert!(load_cart(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_cart_counts_as_empty() {
        let session = session();
        session
            .insert(session_keys::CART, "not a cart")
            .await
            .unwrap();
        assert_eq!(load_cart(&session).await.total_count(), 0);
    }

    #[tokio::test]
    async fn test_flash_is_drained_once() {
        let session = session();
        push_flash(&session, "first").await.unwrap();
        push_flash(&session, "second").await.unwrap();

        assert_eq!(take_flash(&session).await, ["first", "second"]);
        assert!(take_flash(&session).await.is_empty());
    }
}
