//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use freshmart_core::ProductId;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;
use crate::models::Product;
use crate::state::AppState;

/// Catalog search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
    /// The trimmed search text, echoed into the search box.
    pub query: String,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: Product,
}

/// Display the product listing, filtered by `?q=` when given.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    Query(search): Query<SearchQuery>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let query = search.q.as_deref().map(str::trim).unwrap_or_default();
    let products = state.store().list_products(Some(query)).await?;

    Ok(ProductsIndexTemplate {
        page,
        products,
        query: query.to_owned(),
    })
}

/// Display one product.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let product = state
        .store()
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    Ok(ProductShowTemplate { page, product })
}
