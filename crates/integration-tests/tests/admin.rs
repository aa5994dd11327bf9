//! Admin console: login, catalog management and order status updates.

use reqwest::StatusCode;

use digistore_core::OrderStatus;
use digistore_integration_tests::{ADMIN_EMAIL, TestContext, location};

#[tokio::test]
async fn test_admin_pages_require_login() {
    let ctx = TestContext::spawn().await;

    for path in ["/admin", "/admin/products", "/admin/categories", "/admin/orders"] {
        let resp = ctx.get(path).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&resp), "/admin/login", "{path}");
    }

    let resp = ctx
        .post_form("/admin/products", &[("name", "Sneaky"), ("price", "1.00")])
        .await;
    assert_eq!(location(&resp), "/admin/login");
    assert!(ctx.backend.products().is_empty());
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let ctx = TestContext::spawn().await;

    let resp = ctx
        .post_form(
            "/admin/login",
            &[("email", ADMIN_EMAIL), ("password", "definitely wrong")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Invalid email or password"));

    let resp = ctx.get("/admin/products").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_and_logout() {
    let ctx = TestContext::spawn().await;
    ctx.login_admin().await;

    let resp = ctx.get("/admin/products").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains(ADMIN_EMAIL));

    // Already logged in: the login page bounces to the console
    let resp = ctx.get("/admin/login").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = ctx.post_form("/admin/logout", &[]).await;
    assert_eq!(location(&resp), "/admin/login");
    let resp = ctx.get("/admin/products").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let ctx = TestContext::spawn().await;

    for _ in 0..5 {
        let resp = ctx
            .post_form("/admin/login", &[("email", ADMIN_EMAIL), ("password", "nope")])
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let resp = ctx
        .post_form("/admin/login", &[("email", ADMIN_EMAIL), ("password", "nope")])
        .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // The login page itself is not limited
    let resp = ctx.get("/admin/login").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

async fn login_from(ctx: &TestContext, forwarded_for: &str) -> StatusCode {
    ctx.client
        .post(ctx.url("/admin/login"))
        .header("x-forwarded-for", forwarded_for)
        .form(&[("email", ADMIN_EMAIL), ("password", "nope")])
        .send()
        .await
        .expect("POST")
        .status()
}

#[tokio::test]
async fn test_login_limit_ignores_client_forwarded_for() {
    let ctx = TestContext::spawn().await;

    for i in 1..=5 {
        let status = login_from(&ctx, &format!("198.51.100.{i}")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "attempt {i}");
    }

    let status = login_from(&ctx, "198.51.100.6").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_login_limit_behind_proxy_keys_on_appended_hop() {
    let ctx = TestContext::spawn_with(|config| config.trust_proxy_headers = true).await;

    // A forged leftmost entry does not buy a fresh budget
    for i in 1..=5 {
        let status = login_from(&ctx, &format!("10.9.9.{i}, 203.0.113.7")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "attempt {i}");
    }
    let status = login_from(&ctx, "10.9.9.6, 203.0.113.7").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different client seen by the proxy has its own budget
    let status = login_from(&ctx, "203.0.113.8").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_category_and_product_refreshes_catalog() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 2500, 10, None);
    ctx.login_admin().await;

    // Warm the catalog cache
    let body = ctx.get("/").await.text().await.unwrap();
    assert!(!body.contains("Shader Pack"));

    let resp = ctx
        .post_form("/admin/categories", &[("name", "3D Assets"), ("slug", "")])
        .await;
    assert_eq!(location(&resp), "/admin/categories");
    let categories = ctx.backend.categories();
    assert_eq!(categories.len(), 1);
    let category_id = categories[0].id.to_string();

    let body = ctx.get("/admin/categories").await.text().await.unwrap();
    assert!(body.contains("Category created"));
    assert!(body.contains("3D Assets"));

    let resp = ctx
        .post_form(
            "/admin/products",
            &[
                ("name", "Shader Pack"),
                ("description", "Forty shaders"),
                ("price", "12.50"),
                ("image_url", ""),
                ("category_id", &category_id),
            ],
        )
        .await;
    assert_eq!(location(&resp), "/admin/products");

    let created = ctx
        .backend
        .products()
        .into_iter()
        .find(|p| p.name == "Shader Pack")
        .unwrap();
    assert_eq!(created.price.display(), "$12.50");
    assert_eq!(created.category_id.unwrap().to_string(), category_id);

    let body = ctx.get("/admin/products").await.text().await.unwrap();
    assert!(body.contains("Product created"));

    let body = ctx.get("/").await.text().await.unwrap();
    assert!(body.contains("Shader Pack"));
}

#[tokio::test]
async fn test_invalid_product_is_not_sent() {
    let ctx = TestContext::spawn().await;
    ctx.login_admin().await;

    ctx.post_form(
        "/admin/products",
        &[("name", "Freebie"), ("price", "-1"), ("description", "")],
    )
    .await;
    assert!(ctx.backend.products().is_empty());

    let body = ctx.get("/admin/products").await.text().await.unwrap();
    assert!(body.contains("flash--error"));
}

#[tokio::test]
async fn test_order_list_filter_and_status_update() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 2500, 10, None);
    ctx.add_to_cart("p1").await;
    ctx.post_form("/checkout", &[("email", "buyer@example.com")])
        .await;
    let order_id = ctx.backend.orders()[0].id.to_string();
    ctx.login_admin().await;

    let body = ctx.get("/admin/orders").await.text().await.unwrap();
    assert!(body.contains(&order_id));

    let body = ctx
        .get("/admin/orders?email=&status=PAID")
        .await
        .text()
        .await
        .unwrap();
    assert!(!body.contains(&order_id));

    let resp = ctx
        .post_form(
            &format!("/admin/orders/{order_id}/status"),
            &[("status", "CANCELLED")],
        )
        .await;
    assert_eq!(location(&resp), "/admin/orders");
    assert_eq!(ctx.backend.orders()[0].status, OrderStatus::Cancelled);

    let body = ctx.get("/admin/orders").await.text().await.unwrap();
    assert!(body.contains("Order status updated"));
}

#[tokio::test]
async fn test_status_update_for_unknown_order_reports_api_error() {
    let ctx = TestContext::spawn().await;
    ctx.login_admin().await;

    ctx.post_form("/admin/orders/ord_404/status", &[("status", "PAID")])
        .await;

    let body = ctx.get("/admin/orders").await.text().await.unwrap();
    assert!(body.contains("Order not found"));
}
