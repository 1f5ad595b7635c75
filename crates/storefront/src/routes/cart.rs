//! Cart route handlers.
//!
//! The cart lives in the session as a [`Cart`] value; every handler loads it,
//! changes it and stores it back before redirecting to the cart page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    http::Method,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use freshmart_core::{Cart, Price, PriceError, ProductId, Quantity};

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, load_cart, save_cart};
use crate::state::AppState;

/// A cart line joined with its product for display.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: Quantity,
    pub subtotal: Price,
}

/// Cart display data for templates.
#[derive(Debug, Clone, Default)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: Price,
}

impl CartView {
    /// Price the cart against the current catalog.
    ///
    /// Lines whose product has been removed are not shown.
    pub async fn load(store: &dyn Store, cart: &Cart) -> Result<Self> {
        let mut view = Self::default();

        for line in cart.lines() {
            let Some(product) = store.get_product(line.product_id).await? else {
                tracing::debug!(product_id = %line.product_id, "Cart product no longer exists");
                continue;
            };
            let subtotal = product.price.times(line.quantity).map_err(pricing_error)?;
            view.total = view.total.checked_add(subtotal).map_err(pricing_error)?;
            view.lines.push(CartLineView {
                product_id: product.id,
                name: product.name,
                price: product.price,
                quantity: line.quantity,
                subtotal,
            });
        }

        Ok(view)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn pricing_error(err: PriceError) -> AppError {
    AppError::Internal(format!("cart total: {err}"))
}

/// Add to cart form data.
#[derive(Debug, Default, Deserialize)]
pub struct AddToCartForm {
    pub qty: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Display the cart page.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await;
    let cart = CartView::load(state.store(), &cart).await?;

    Ok(CartShowTemplate { page, cart })
}

/// Add a product to the cart.
///
/// A POST may carry a `qty` field; a missing or unusable value adds one unit.
#[instrument(skip(state, session, form))]
pub async fn add(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    method: Method,
    session: Session,
    form: std::result::Result<Form<AddToCartForm>, FormRejection>,
) -> Result<Redirect> {
    let quantity = if method == Method::POST {
        requested_quantity(form.map(|Form(f)| f).unwrap_or_default())
    } else {
        Quantity::ONE
    };

    if state.store().get_product(product_id).await?.is_none() {
        return Err(AppError::NotFound("Product".to_string()));
    }

    let mut cart = load_cart(&session).await;
    cart.add(product_id, quantity);
    save_cart(&session, &cart).await?;

    tracing::debug!(%product_id, quantity = quantity.get(), "Added to cart");
    Ok(Redirect::to("/cart"))
}

fn requested_quantity(form: AddToCartForm) -> Quantity {
    let Some(raw) = form.qty else {
        return Quantity::ONE;
    };
    Quantity::parse(&raw).unwrap_or_else(|e| {
        tracing::warn!(qty = %raw, error = %e, "Unusable quantity, adding one unit");
        Quantity::ONE
    })
}

/// Replace the cart with the quantities posted from the cart page.
///
/// Fields that do not hold a positive quantity drop their line.
/// A body that is not a urlencoded form is refused with 400.
#[instrument(skip_all)]
pub async fn update(
    session: Session,
    form: std::result::Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Redirect> {
    let Form(fields) = form.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable cart form");
        AppError::BadRequest("Invalid cart form.".to_string())
    })?;
    let update = Cart::from_quantity_fields(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    for rejected in &update.rejected {
        tracing::debug!(
            field = %rejected.field,
            value = %rejected.value,
            reason = %rejected.reason,
            "Dropped cart line"
        );
    }

    save_cart(&session, &update.cart).await?;
    Ok(Redirect::to("/cart"))
}

/// Remove a product from the cart. Unknown products are ignored.
#[instrument(skip(session))]
pub async fn remove(Path(product_id): Path<ProductId>, session: Session) -> Result<Redirect> {
    let mut cart = load_cart(&session).await;
    if cart.remove(product_id) {
        save_cart(&session, &cart).await?;
    }
    Ok(Redirect::to("/cart"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(qty: Option<&str>) -> AddToCartForm {
        AddToCartForm {
            qty: qty.map(str::to_string),
        }
    }

    #[test]
    fn test_requested_quantity() {
        assert_eq!(requested_quantity(form(Some("4"))).get(), 4);
        assert_eq!(requested_quantity(form(Some(" 2 "))).get(), 2);
        assert_eq!(requested_quantity(form(None)), Quantity::ONE);
        assert_eq!(requested_quantity(form(Some("99999999999"))), Quantity::MAX);
    }

    #[test]
    fn test_unusable_quantity_defaults_to_one() {
        for raw in ["", "abc", "0", "-3", "1.5"] {
            assert_eq!(requested_quantity(form(Some(raw))), Quantity::ONE, "{raw}");
        }
    }

    #[tokio::test]
    async fn test_cart_view_skips_missing_products() {
        use crate::db::{SAMPLE_DATA, SqliteStore};

        let store = SqliteStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.run_script(SAMPLE_DATA).await.unwrap();

        let mut cart = Cart::new();
        cart.add(ProductId::new(1), Quantity::new(2).unwrap());
        cart.add(ProductId::new(999), Quantity::ONE);
        cart.add(ProductId::new(2), Quantity::ONE);

        let view = CartView::load(&store, &cart).await.unwrap();
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.total.to_string(), "105.00");
        assert_eq!(view.lines[0].subtotal.to_string(), "80.00");
    }

    #[tokio::test]
    async fn test_cart_view_reports_overflowing_total() {
        use crate::db::{SAMPLE_DATA, SqliteStore};

        let store = SqliteStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.run_script(SAMPLE_DATA).await.unwrap();
        store
            .run_script("UPDATE products SET price = 1e20 WHERE product_id = 3")
            .await
            .unwrap();

        let mut cart = Cart::new();
        cart.add(ProductId::new(3), Quantity::MAX);

        let result = CartView::load(&store, &cart).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
