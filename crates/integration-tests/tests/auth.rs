//! Signup, login, logout and profile.

use freshmart_integration_tests::{RICE, TestApp, location, text_with_status};
use reqwest::StatusCode;

async fn users_with_email(app: &TestApp, email: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(app.store.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_duplicate_signup_is_rejected() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();
    let form = [
        ("name", "Asha"),
        ("email", "asha@example.com"),
        ("password", "pw-asha"),
    ];

    let first = visitor.post_form("/signup", &form).await;
    assert_eq!(location(&first), "/login");

    let second = visitor.post_form("/signup", &form).await;
    assert_eq!(
        text_with_status(second, StatusCode::CONFLICT).await,
        "Email already registered."
    );

    // Normalized emails collide too.
    let shouted = visitor
        .post_form(
            "/signup",
            &[
                ("name", "Asha"),
                ("email", "  ASHA@Example.com "),
                ("password", "other"),
            ],
        )
        .await;
    assert_eq!(shouted.status(), StatusCode::CONFLICT);

    assert_eq!(users_with_email(&app, "asha@example.com").await, 1);
}

#[tokio::test]
async fn test_signup_requires_every_field() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    let response = visitor
        .post_form("/signup", &[("name", "  "), ("email", "a@b.co"), ("password", "x")])
        .await;
    assert_eq!(
        text_with_status(response, StatusCode::BAD_REQUEST).await,
        "All fields required."
    );

    let response = visitor
        .post_form("/signup", &[("name", "Asha"), ("email", "a@b.co")])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.count_rows("users").await, 0);
}

#[tokio::test]
async fn test_signup_notice_shows_on_login_page() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();

    visitor
        .post_form(
            "/signup",
            &[("name", "Asha"), ("email", "asha@example.com"), ("password", "pw")],
        )
        .await;

    assert!(visitor.page("/login").await.contains("Account created."));
    assert!(!visitor.page("/login").await.contains("Account created."));
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let app = TestApp::spawn().await;
    let visitor = app.browser();
    visitor.sign_in("Asha", "asha@example.com", "pw-asha").await;

    let stranger = app.browser();
    let response = stranger
        .post_form("/login", &[("email", "asha@example.com"), ("password", "nope")])
        .await;
    assert_eq!(
        text_with_status(response, StatusCode::UNAUTHORIZED).await,
        "Invalid login."
    );
    assert_eq!(location(&stranger.get("/dashboard").await), "/login");
}

#[tokio::test]
async fn test_dashboard_shows_session_identity() {
    let app = TestApp::spawn().await;
    let shopper = app.browser();

    assert_eq!(location(&shopper.get("/dashboard").await), "/login");

    shopper.sign_in("Asha", "Asha@Example.com", "pw-asha").await;
    let body = shopper.page("/dashboard").await;
    assert!(body.contains("Welcome, Asha"));
    assert!(body.contains("asha@example.com"));
}

#[tokio::test]
async fn test_logout_clears_identity_and_cart() {
    let app = TestApp::spawn().await;
    let shopper = app.browser();
    shopper.sign_in("Asha", "asha@example.com", "pw-asha").await;
    shopper.add_to_cart(RICE, "2").await;

    assert_eq!(location(&shopper.get("/logout").await), "/login");

    assert_eq!(location(&shopper.get("/dashboard").await), "/login");
    assert!(shopper.page("/cart").await.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_profile_update_refreshes_session() {
    let app = TestApp::spawn().await;
    let shopper = app.browser();
    shopper.sign_in("Asha", "asha@example.com", "pw-asha").await;

    let form = shopper.page("/profile").await;
    assert!(form.contains("value=\"asha@example.com\""));

    let response = shopper
        .post_form("/profile", &[("name", "Asha K"), ("email", "AK@example.com")])
        .await;
    assert_eq!(location(&response), "/dashboard");

    let body = shopper.page("/dashboard").await;
    assert!(body.contains("Welcome, Asha K"));
    assert!(body.contains("ak@example.com"));
    assert!(body.contains("Profile updated."));

    // The new email logs in; the old one no longer does.
    let again = app.browser();
    let ok = again
        .post_form("/login", &[("email", "ak@example.com"), ("password", "pw-asha")])
        .await;
    assert_eq!(location(&ok), "/dashboard");
    let old = again
        .post_form("/login", &[("email", "asha@example.com"), ("password", "pw-asha")])
        .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_cannot_take_another_email() {
    let app = TestApp::spawn().await;
    app.browser()
        .sign_in("Bo", "bo@example.com", "pw-bo")
        .await;
    let shopper = app.browser();
    shopper.sign_in("Asha", "asha@example.com", "pw-asha").await;

    let response = shopper
        .post_form("/profile", &[("name", "Asha"), ("email", "bo@example.com")])
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(users_with_email(&app, "bo@example.com").await, 1);
    assert!(shopper.page("/dashboard").await.contains("asha@example.com"));
}
