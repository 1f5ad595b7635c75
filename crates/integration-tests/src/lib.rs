//! Integration tests for FreshMart.
//!
//! Each test spawns the full storefront router on an ephemeral local port,
//! backed by an in-memory SQLite database holding the sample catalog and an
//! in-memory session store, and drives it with a cookie-keeping `reqwest`
//! client that does not follow redirects.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p freshmart-integration-tests
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode, header::LOCATION, redirect::Policy};
use tower_sessions::MemoryStore;

use freshmart_storefront::config::StorefrontConfig;
use freshmart_storefront::db::{SAMPLE_DATA, SqliteStore, Store};
use freshmart_storefront::middleware::create_session_layer;
use freshmart_storefront::state::AppState;

/// Sample catalog ids, in insertion order.
pub const RICE: i32 = 1;
pub const MILK: i32 = 2;
pub const SUGAR: i32 = 3;

/// A running storefront.
pub struct TestApp {
    pub addr: SocketAddr,
    /// Direct access to the database behind the server.
    pub store: SqliteStore,
}

impl TestApp {
    /// Spawn a storefront with the report disabled.
    pub async fn spawn() -> Self {
        Self::spawn_with_env(&[]).await
    }

    /// Spawn a storefront with extra `FRESHMART_*` settings.
    pub async fn spawn_with_env(vars: &[(&str, &str)]) -> Self {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .chain([(
                "FRESHMART_DATABASE_URL".to_string(),
                "sqlite::memory:".to_string(),
            )])
            .collect();
        let config = StorefrontConfig::from_lookup(|key| env.get(key).cloned()).unwrap();

        let store = SqliteStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.run_script(SAMPLE_DATA).await.unwrap();

        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(config, Arc::new(store.clone()));
        let app = freshmart_storefront::app(state, session_layer);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, store }
    }

    /// A new visitor with an empty cookie jar.
    #[must_use]
    pub fn browser(&self) -> Browser {
        Browser {
            base_url: format!("http://{}", self.addr),
            client: Client::builder()
                .cookie_store(true)
                .redirect(Policy::none())
                .build()
                .unwrap(),
        }
    }

    /// Current stock of a product.
    pub async fn stock_of(&self, product_id: i32) -> Option<i32> {
        sqlx::query_scalar("SELECT stock FROM products WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(self.store.pool())
            .await
            .unwrap()
    }

    /// Overwrite the stock of a product.
    pub async fn set_stock(&self, product_id: i32, stock: Option<i32>) {
        sqlx::query("UPDATE products SET stock = $1 WHERE product_id = $2")
            .bind(stock)
            .bind(product_id)
            .execute(self.store.pool())
            .await
            .unwrap();
    }

    /// Number of rows in a table.
    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.store.pool())
            .await
            .unwrap()
    }
}

/// One visitor: a client that keeps cookies and does not follow redirects.
pub struct Browser {
    base_url: String,
    client: Client,
}

impl Browser {
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap()
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(name, value)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_raw(&self, path: &str, content_type: &str, body: &str) -> Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }

    /// Register and log in; the session cookie is kept.
    pub async fn sign_in(&self, name: &str, email: &str, password: &str) {
        let signup = self
            .post_form(
                "/signup",
                &[("name", name), ("email", email), ("password", password)],
            )
            .await;
        assert_eq!(location(&signup), "/login");

        let login = self
            .post_form("/login", &[("email", email), ("password", password)])
            .await;
        assert_eq!(location(&login), "/dashboard");
    }

    /// Add `qty` units of a product through the product form.
    pub async fn add_to_cart(&self, product_id: i32, qty: &str) {
        let response = self
            .post_form(&format!("/add_to_cart/{product_id}"), &[("qty", qty)])
            .await;
        assert_eq!(location(&response), "/cart");
    }

    /// Place an order and return its confirmation path.
    pub async fn checkout(&self) -> String {
        let response = self.post_form("/checkout", &[]).await;
        let path = location(&response).to_string();
        assert!(path.starts_with("/order-confirmation/"), "{path}");
        path
    }

    /// Body of a 200 page.
    pub async fn page(&self, path: &str) -> String {
        text_with_status(self.get(path).await, StatusCode::OK).await
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> &str {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Read a response body as text, asserting the status first.
pub async fn text_with_status(response: Response, status: StatusCode) -> String {
    assert_eq!(response.status(), status);
    response.text().await.unwrap()
}
