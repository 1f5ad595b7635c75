//! The operator report is off unless a token is configured and presented.

use freshmart_integration_tests::TestApp;
use reqwest::StatusCode;

const TOKEN: &str = "ops-report-token";

#[tokio::test]
async fn test_report_disabled_without_token() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    assert_eq!(visitor.get("/report").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        visitor.get("/report?token=anything").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_report_rejects_wrong_token() {
    let app = TestApp::spawn_with_env(&[("FRESHMART_REPORT_TOKEN", TOKEN)]).await;
    let visitor = app.browser();

    assert_eq!(visitor.get("/report").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        visitor
            .get_with_header("/report", "x-report-token", "guess")
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_report_dumps_tables_with_token() {
    let app = TestApp::spawn_with_env(&[("FRESHMART_REPORT_TOKEN", TOKEN)]).await;
    let visitor = app.browser();

    let response = visitor
        .get_with_header("/report", "x-report-token", TOKEN)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();

    for table in [
        "products",
        "users",
        "orders",
        "order_items",
        "categories",
        "suppliers",
        "inventory",
    ] {
        assert!(body.contains(&format!("<h2>{table} ")), "missing {table}");
    }
    assert!(body.contains("Essentials"));
    assert!(!body.contains("_sqlx_migrations"));
    assert!(!body.contains("tower_sessions"));
}

#[tokio::test]
async fn test_report_ignores_token_in_query_string() {
    let app = TestApp::spawn_with_env(&[("FRESHMART_REPORT_TOKEN", TOKEN)]).await;
    let visitor = app.browser();

    assert_eq!(
        visitor
            .get(&format!("/report?token={TOKEN}"))
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
}
