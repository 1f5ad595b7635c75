//! Session cart behavior.

use freshmart_integration_tests::{MILK, RICE, SUGAR, TestApp, location, text_with_status};
use reqwest::StatusCode;

fn quantity_input(product_id: i32, qty: u32) -> String {
    format!("name=\"qty_{product_id}\" value=\"{qty}\"")
}

#[tokio::test]
async fn test_adding_twice_sums_quantities() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    visitor.add_to_cart(RICE, "2").await;
    visitor.add_to_cart(RICE, "3").await;

    let body = visitor.page("/cart").await;
    assert!(body.contains(&quantity_input(RICE, 5)));
    assert!(body.contains("$200.00"));
    assert!(body.contains("<span class=\"badge\">5</span>"));
}

#[tokio::test]
async fn test_get_adds_one_and_bad_quantity_defaults_to_one() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    let response = visitor.get(&format!("/add_to_cart/{MILK}")).await;
    assert_eq!(location(&response), "/cart");
    visitor.add_to_cart(MILK, "lots").await;
    visitor.add_to_cart(MILK, "-4").await;

    let body = visitor.page("/cart").await;
    assert!(body.contains(&quantity_input(MILK, 3)));
}

#[tokio::test]
async fn test_adding_missing_product_is_not_found() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    let response = visitor.post_form("/add_to_cart/999", &[("qty", "1")]).await;
    assert_eq!(
        text_with_status(response, StatusCode::NOT_FOUND).await,
        "Product not found"
    );
    assert!(visitor.page("/cart").await.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_update_keeps_only_positive_quantities() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    visitor.add_to_cart(RICE, "1").await;
    visitor.add_to_cart(MILK, "1").await;
    visitor.add_to_cart(SUGAR, "1").await;

    let response = visitor
        .post_form(
            "/update_cart",
            &[
                ("qty_1", "3"),
                ("qty_2", "0"),
                ("qty_3", "-1"),
                ("qty_4", "x"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/cart");

    let body = visitor.page("/cart").await;
    assert!(body.contains(&quantity_input(RICE, 3)));
    assert!(!body.contains("qty_2"));
    assert!(!body.contains("qty_3"));
    assert!(body.contains("<span class=\"badge\">3</span>"));
}

#[tokio::test]
async fn test_remove_drops_line_and_ignores_unknown() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    visitor.add_to_cart(RICE, "2").await;
    visitor.add_to_cart(MILK, "1").await;

    let response = visitor.get(&format!("/remove_from_cart/{RICE}")).await;
    assert_eq!(location(&response), "/cart");
    let response = visitor.get("/remove_from_cart/999").await;
    assert_eq!(location(&response), "/cart");

    let body = visitor.page("/cart").await;
    assert!(!body.contains("qty_1"));
    assert!(body.contains(&quantity_input(MILK, 1)));
}

#[tokio::test]
async fn test_carts_are_per_session() {
    let app = TestApp::spawn().await;
    let alice = app.browser();
    let bob = app.browser();

    alice.add_to_cart(SUGAR, "4").await;

    assert!(bob.page("/cart").await.contains("Your cart is empty"));
    assert!(alice.page("/cart").await.contains(&quantity_input(SUGAR, 4)));
}

#[tokio::test]
async fn test_unreadable_cart_form_is_bad_request() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    visitor.add_to_cart(RICE, "2").await;

    let response = visitor
        .post_raw("/update_cart", "application/json", "{\"qty_1\": 9}")
        .await;
    assert_eq!(
        text_with_status(response, StatusCode::BAD_REQUEST).await,
        "Invalid cart form."
    );
    assert!(visitor.page("/cart").await.contains(&quantity_input(RICE, 2)));
}

#[tokio::test]
async fn test_oversized_quantity_is_clamped_to_column_range() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    visitor.add_to_cart(SUGAR, "99999999999").await;
    visitor.add_to_cart(SUGAR, "5").await;

    let body = visitor.page("/cart").await;
    assert!(body.contains(&quantity_input(SUGAR, 2_147_483_647)));
    assert!(body.contains("$96636764115.00"));

    visitor.sign_in("Bulk Buyer", "bulk@example.com", "secret").await;
    let confirmation = visitor.checkout().await;
    let order = visitor.page(&confirmation).await;
    assert!(order.contains("2147483647"));
    assert_eq!(order.matches("$96636764115.00").count(), 2);
}
