//! Checkout: order creation, payment hand-off and the widget's return.

use reqwest::StatusCode;

use digistore_core::OrderStatus;
use digistore_integration_tests::{PUBLISHABLE_KEY, TestContext, location};

async fn cart_with_guide(ctx: &TestContext) {
    ctx.backend.add_product("p1", "Rust Guide", 2500, 10, None);
    ctx.add_to_cart("p1").await;
    ctx.add_to_cart("p1").await;
}

#[tokio::test]
async fn test_checkout_with_empty_cart_redirects_to_cart() {
    let ctx = TestContext::spawn().await;

    let resp = ctx.get("/checkout").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/cart");

    let resp = ctx
        .post_form("/checkout", &[("email", "buyer@example.com")])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(ctx.backend.orders().is_empty());
}

#[tokio::test]
async fn test_checkout_creates_order_and_renders_payment_widget() {
    let ctx = TestContext::spawn().await;
    cart_with_guide(&ctx).await;

    let resp = ctx
        .post_form("/checkout", &[("email", "buyer@example.com")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();

    let orders = ctx.backend.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.customer_email.as_str(), "buyer@example.com");
    assert_eq!(order.item_count(), 2);

    assert!(body.contains(PUBLISHABLE_KEY));
    assert!(body.contains(&format!("pi_{}_secret_test", order.id)));
    assert!(body.contains("/checkout/success"));
    assert!(body.contains("$50.00"));

    // Cart is kept until the payment succeeds
    assert_eq!(ctx.cart_count().await, 2);
}

#[tokio::test]
async fn test_successful_payment_clears_cart() {
    let ctx = TestContext::spawn().await;
    cart_with_guide(&ctx).await;
    ctx.post_form("/checkout", &[("email", "buyer@example.com")])
        .await;
    let order_id = ctx.backend.orders()[0].id.to_string();

    let resp = ctx
        .get("/checkout/success?redirect_status=succeeded&payment_intent=pi_x")
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains(&order_id));

    assert_eq!(ctx.cart_count().await, 0);
}

#[tokio::test]
async fn test_failed_payment_keeps_cart() {
    let ctx = TestContext::spawn().await;
    cart_with_guide(&ctx).await;
    ctx.post_form("/checkout", &[("email", "buyer@example.com")])
        .await;

    let resp = ctx.get("/checkout/success?redirect_status=failed").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Payment was not completed"));

    assert_eq!(ctx.cart_count().await, 2);
}

#[tokio::test]
async fn test_invalid_email_is_rejected_before_ordering() {
    let ctx = TestContext::spawn().await;
    cart_with_guide(&ctx).await;

    let resp = ctx.post_form("/checkout", &[("email", "not-an-email")]).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.backend.orders().is_empty());
    assert_eq!(ctx.cart_count().await, 2);
}

#[tokio::test]
async fn test_api_rejection_is_shown_and_cart_kept() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 2500, 1, None);
    ctx.add_to_cart("p1").await;
    ctx.add_to_cart("p1").await;

    let resp = ctx
        .post_form("/checkout", &[("email", "buyer@example.com")])
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Insufficient stock for Rust Guide"));
    assert_eq!(ctx.cart_count().await, 2);
}

#[tokio::test]
async fn test_payment_failure_leaves_order_pending() {
    let ctx = TestContext::spawn().await;
    cart_with_guide(&ctx).await;
    ctx.backend.fail_payments();

    let resp = ctx
        .post_form("/checkout", &[("email", "buyer@example.com")])
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let orders = ctx.backend.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert_eq!(ctx.cart_count().await, 2);
}

#[tokio::test]
async fn test_checkout_without_payment_key_is_unavailable() {
    let ctx = TestContext::spawn_with(|config| config.payments.publishable_key = None).await;
    cart_with_guide(&ctx).await;

    let body = ctx.get("/checkout").await.text().await.unwrap();
    assert!(body.contains("Payment is not configured"));

    let resp = ctx
        .post_form("/checkout", &[("email", "buyer@example.com")])
        .await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(ctx.backend.orders().is_empty());
}
