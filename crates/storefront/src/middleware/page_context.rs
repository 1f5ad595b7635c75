//! Per-page layout data.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::models::CurrentUser;

use super::auth::current_user;
use super::session::{load_cart, take_flash};

/// Everything `base.html` needs: signed-in user, cart badge and notices.
///
/// Extracting it drains pending flash notices, so only handlers that render a
/// page should ask for it.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: u64,
    pub flash: Vec<String>,
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self::default());
        };

        Ok(Self {
            user: current_user(parts).await,
            cart_count: load_cart(&session).await.total_count(),
            flash: take_flash(&session).await,
        })
    }
}
