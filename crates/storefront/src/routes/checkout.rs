//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, clear_cart, load_cart, push_flash};
use crate::routes::cart::CartView;
use crate::services::checkout::{CheckoutError, CheckoutService};
use crate::state::AppState;

const EMPTY_CART_NOTICE: &str = "Your cart is empty.";
const NOTHING_TO_ORDER_NOTICE: &str = "None of the products in your cart are available any more.";

/// Checkout review page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/review.html")]
pub struct CheckoutReviewTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Show the cart as it will be ordered.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    page: PageContext,
) -> Result<Response> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        push_flash(&session, EMPTY_CART_NOTICE).await?;
        return Ok(Redirect::to("/products").into_response());
    }

    let cart = CartView::load(state.store(), &cart).await?;
    Ok(CheckoutReviewTemplate { page, cart }.into_response())
}

/// Place the order and send the shopper to its confirmation page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Redirect> {
    let cart = load_cart(&session).await;

    match CheckoutService::new(state.store())
        .place_order(user.id, &cart)
        .await
    {
        Ok(placed) => {
            clear_cart(&session).await?;
            Ok(Redirect::to(&format!(
                "/order-confirmation/{}",
                placed.order_id
            )))
        }
        Err(CheckoutError::EmptyCart) => {
            push_flash(&session, EMPTY_CART_NOTICE).await?;
            Ok(Redirect::to("/products"))
        }
        Err(CheckoutError::NothingToOrder) => {
            clear_cart(&session).await?;
            push_flash(&session, NOTHING_TO_ORDER_NOTICE).await?;
            Ok(Redirect::to("/products"))
        }
        Err(e) => Err(e.into()),
    }
}
