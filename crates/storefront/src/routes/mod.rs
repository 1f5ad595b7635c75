//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (database ping)
//!
//! # Catalog
//! GET  /products?q=               - Product listing with optional search
//! GET  /product/{id}              - Product detail
//!
//! # Cart (session)
//! GET  /add_to_cart/{id}          - Add one unit
//! POST /add_to_cart/{id}          - Add `qty` units
//! GET  /cart                      - Cart page
//! POST /update_cart               - Replace quantities from `qty_<id>` fields
//! GET  /remove_from_cart/{id}     - Drop a line
//!
//! # Checkout (requires auth)
//! GET  /checkout                  - Review cart before ordering
//! POST /checkout                  - Place the order
//!
//! # Orders (requires auth, scoped to the signed-in user)
//! GET  /order-confirmation/{id}   - Confirmation after checkout
//! GET  /orders                    - Order history
//! GET  /orders/{id}               - Order detail
//!
//! # Auth
//! GET  /signup                    - Signup page
//! POST /signup                    - Signup action
//! GET  /login                     - Login page
//! POST /login                     - Login action
//! GET  /logout                    - Logout action
//!
//! # Account (requires auth)
//! GET  /dashboard                 - Account overview
//! GET  /profile                   - Profile form
//! POST /profile                   - Update name and email
//!
//! # Operators
//! GET  /report                    - Table dump, gated by the report token
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;
pub mod report;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/add_to_cart/{id}", get(cart::add).post(cart::add))
        .route("/update_cart", post(cart::update))
        .route("/remove_from_cart/{id}", get(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", get(checkout::review).post(checkout::place))
        .route("/order-confirmation/{id}", get(orders::confirmation))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
}

/// Create the auth and account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/dashboard", get(account::dashboard))
        .route(
            "/profile",
            get(account::profile_page).post(account::update_profile),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/products", get(products::index))
        .route("/product/{id}", get(products::show))
        .merge(cart_routes())
        .merge(order_routes())
        .merge(account_routes())
        .route("/report", get(report::report))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store().backend(), "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
