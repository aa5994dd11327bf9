//! Customer order history lookup.

use reqwest::StatusCode;

use digistore_integration_tests::TestContext;

async fn place_order(ctx: &TestContext, email: &str) -> String {
    ctx.add_to_cart("p1").await;
    let resp = ctx.post_form("/checkout", &[("email", email)]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    ctx.backend.orders().last().unwrap().id.to_string()
}

#[tokio::test]
async fn test_blank_email_shows_prompt_without_calling_api() {
    let ctx = TestContext::spawn().await;

    let resp = ctx.get("/orders").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Enter the email address you used at checkout"));

    ctx.get("/orders?email=%20%20").await;
    assert_eq!(ctx.backend.history_calls(), 0);
}

#[tokio::test]
async fn test_invalid_email_shows_error() {
    let ctx = TestContext::spawn().await;

    let body = ctx
        .get("/orders?email=nobody")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Please enter a valid email address"));
    assert_eq!(ctx.backend.history_calls(), 0);
}

#[tokio::test]
async fn test_history_lists_only_that_customers_orders() {
    let ctx = TestContext::spawn().await;
    ctx.backend.add_product("p1", "Rust Guide", 2500, 10, None);

    let mine = place_order(&ctx, "buyer@example.com").await;
    let theirs = place_order(&ctx, "someone@example.com").await;

    let body = ctx
        .get("/orders?email=Buyer%40Example.com")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains(&mine));
    assert!(!body.contains(&theirs));
    assert!(body.contains("Rust Guide"));
    assert!(body.contains("PENDING"));
    assert_eq!(ctx.backend.history_calls(), 1);
}

#[tokio::test]
async fn test_history_for_unknown_customer_shows_api_message() {
    let ctx = TestContext::spawn().await;

    let body = ctx
        .get("/orders?email=new%40example.com")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Found 0 order(s)"));
}
