//! Catalog browsing and the ambient middleware.

use freshmart_integration_tests::{MILK, RICE, TestApp, text_with_status};
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    assert_eq!(visitor.page("/health").await, "ok");
    assert_eq!(visitor.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_products_are_listed_by_name() {
    let app = TestApp::spawn().await;
    let body = app.browser().page("/products").await;

    let milk = body.find("Milk").unwrap();
    let rice = body.find("Rice").unwrap();
    let sugar = body.find("Sugar").unwrap();
    assert!(milk < rice && rice < sugar);
    assert!(body.contains("$40.00"));
}

#[tokio::test]
async fn test_search_matches_name_or_category() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    let body = visitor.page("/products?q=dairy").await;
    assert!(body.contains("Milk"));
    assert!(!body.contains("Rice"));

    let body = visitor.page("/products?q=%20sug%20").await;
    assert!(body.contains("Sugar"));
    assert!(!body.contains("Milk"));

    let body = visitor.page("/products?q=%25").await;
    assert!(body.contains("No products match"));
}

#[tokio::test]
async fn test_product_detail_and_not_found() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    let body = visitor.page(&format!("/product/{RICE}")).await;
    assert!(body.contains("Rice"));
    assert!(body.contains("Grains"));
    assert!(body.contains("50 in stock"));

    let body = visitor.page(&format!("/product/{MILK}")).await;
    assert!(body.contains("$25.00"));

    let missing = visitor.get("/product/999").await;
    assert_eq!(
        text_with_status(missing, StatusCode::NOT_FOUND).await,
        "Product not found"
    );
}

#[tokio::test]
async fn test_every_response_carries_security_headers_and_request_id() {
    let app = TestApp::spawn().await;
    let response = app.browser().get("/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(
        headers["content-security-policy"]
            .to_str()
            .unwrap()
            .contains("form-action 'self'")
    );
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_stylesheet_is_served() {
    let app = TestApp::spawn().await;
    let response = app.browser().get("/static/main.css").await;
    assert_eq!(response.status(), StatusCode::OK);
}
