//! Order route handlers.
//!
//! Every lookup is filtered by the signed-in user, so another shopper's order
//! id is indistinguishable from one that does not exist.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::instrument;

use freshmart_core::{OrderId, Price, Quantity, UserId};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::OrderWithItems;
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: Quantity,
    pub price: Price,
    pub subtotal: Price,
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub total: Price,
    pub placed_at: Option<String>,
    pub items: Vec<OrderItemView>,
}

impl TryFrom<OrderWithItems> for OrderView {
    type Error = AppError;

    fn try_from(OrderWithItems { order, items }: OrderWithItems) -> Result<Self> {
        let items = items
            .into_iter()
            .map(|item| {
                let subtotal = item.line_total().map_err(|e| {
                    AppError::Internal(format!("order {} line {}: {e}", order.id, item.id))
                })?;
                Ok(OrderItemView {
                    subtotal,
                    name: item.product_name,
                    quantity: item.quantity,
                    price: item.price,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: order.id,
            total: order.total,
            placed_at: order
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string()),
            items,
        })
    }
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/confirmation.html")]
pub struct OrderConfirmationTemplate {
    pub page: PageContext,
    pub order: OrderView,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageContext,
    pub order: OrderView,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
}

async fn owned_order(state: &AppState, user_id: UserId, order_id: OrderId) -> Result<OrderView> {
    state
        .store()
        .order_for_user(user_id, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?
        .try_into()
}

/// Display the confirmation for a just-placed order.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn confirmation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let order = owned_order(&state, user.id, order_id).await?;
    Ok(OrderConfirmationTemplate { page, order })
}

/// Display one order.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let order = owned_order(&state, user.id, order_id).await?;
    Ok(OrderShowTemplate { page, order })
}

/// Display the signed-in user's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let orders = state
        .store()
        .orders_for_user(user.id)
        .await?
        .into_iter()
        .map(OrderView::try_from)
        .collect::<Result<_>>()?;

    Ok(OrdersIndexTemplate { page, orders })
}
