//! Cart behavior through the HTTP surface.

use reqwest::StatusCode;

use digistore_integration_tests::{TestContext, location};

#[tokio::test]
async fn test_catalog_lists_products_and_filters_by_category() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_category("ebooks", "E-books");
    ctx.backend.add_category("fonts", "Fonts");
    ctx.backend
        .add_product("p1", "Rust Guide", 2500, 10, Some("ebooks"));
    ctx.backend.add_product("p2", "Mono Font", 900, 10, Some("fonts"));

    let body = ctx.get("/").await.text().await.unwrap();
    assert!(body.contains("Rust Guide"));
    assert!(body.contains("Mono Font"));
    assert!(body.contains("$25.00"));

    let body = ctx.get("/?category=fonts").await.text().await.unwrap();
    assert!(body.contains("Mono Font"));
    assert!(!body.contains("Rust Guide"));

    let body = ctx.get("/?q=rust").await.text().await.unwrap();
    assert!(body.contains("Rust Guide"));
    assert!(!body.contains("Mono Font"));
}

#[tokio::test]
async fn test_catalog_is_cached_between_requests() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 2500, 10, None);

    ctx.get("/").await;
    ctx.get("/").await;
    ctx.get("/?q=guide").await;

    assert_eq!(ctx.backend.product_list_calls(), 1);
}

#[tokio::test]
async fn test_adding_same_product_twice_aggregates_quantity() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 1000, 10, None);

    ctx.add_to_cart("p1").await;
    ctx.add_to_cart("p1").await;

    assert_eq!(ctx.cart_count().await, 2);
    let body = ctx.get("/cart").await.text().await.unwrap();
    assert!(body.contains("Rust Guide"));
    assert!(body.contains("$20.00"));
}

#[tokio::test]
async fn test_cart_is_per_session() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 1000, 10, None);
    ctx.add_to_cart("p1").await;

    let stranger = reqwest::Client::new();
    let body = stranger
        .get(ctx.url("/cart/count"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(">0<"));
    assert_eq!(ctx.cart_count().await, 1);
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let ctx = TestContext::spawn().await;

    let resp = ctx
        .post_form("/cart/add", &[("product_id", "missing")])
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(ctx.cart_count().await, 0);
}

#[tokio::test]
async fn test_htmx_add_returns_badge_and_trigger() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 1000, 10, None);

    let resp = ctx.htmx_post("/cart/add", &[("product_id", "p1")]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("hx-trigger").unwrap().to_str().unwrap(),
        "cart-updated"
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains("id=\"cart-count\""));
    assert!(body.contains(">1<"));
}

#[tokio::test]
async fn test_update_quantity_and_remove_on_zero() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 1000, 10, None);
    ctx.backend.add_product("p2", "Icon Set", 500, 10, None);
    ctx.add_to_cart("p1").await;
    ctx.add_to_cart("p2").await;

    let resp = ctx
        .htmx_post("/cart/update", &[("product_id", "p1"), ("quantity", "4")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("id=\"cart-items\""));
    assert!(body.contains("$40.00"));
    assert_eq!(ctx.cart_count().await, 5);

    let resp = ctx
        .post_form("/cart/update", &[("product_id", "p1"), ("quantity", "0")])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/cart");
    assert_eq!(ctx.cart_count().await, 1);

    // Negative quantities clamp to zero
    ctx.post_form("/cart/update", &[("product_id", "p2"), ("quantity", "-2")])
        .await;
    assert_eq!(ctx.cart_count().await, 0);
}

#[tokio::test]
async fn test_update_for_product_not_in_cart_is_ignored() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 1000, 10, None);
    ctx.add_to_cart("p1").await;

    let resp = ctx
        .post_form("/cart/update", &[("product_id", "p9"), ("quantity", "3")])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(ctx.cart_count().await, 1);
}

#[tokio::test]
async fn test_remove_and_clear() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 1000, 10, None);
    ctx.backend.add_product("p2", "Icon Set", 500, 10, None);
    ctx.add_to_cart("p1").await;
    ctx.add_to_cart("p2").await;

    ctx.post_form("/cart/remove", &[("product_id", "p1")]).await;
    assert_eq!(ctx.cart_count().await, 1);

    // Removing something that is not there is a no-op
    let resp = ctx.post_form("/cart/remove", &[("product_id", "p1")]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(ctx.cart_count().await, 1);

    let resp = ctx.htmx_post("/cart/clear", &[]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Your cart is empty"));
    assert_eq!(ctx.cart_count().await, 0);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let ctx = TestContext::spawn().await;

    let resp = ctx.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx.get("/health/ready").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_present() {
    let ctx = TestContext::spawn().await;

    let resp = ctx.get("/cart").await;
    let headers = resp.headers();
    assert!(headers.contains_key("content-security-policy"));
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(headers.contains_key("x-request-id"));
}
