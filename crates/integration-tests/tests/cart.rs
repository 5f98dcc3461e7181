//! Cart operations through the storefront.

use aether_integration_tests::{TestContext, location};

#[tokio::test]
async fn test_adding_same_line_sums_quantities() {
    let ctx = TestContext::new().await;

    ctx.add_to_cart("7", "70", "1").await;
    ctx.add_to_cart("7", "70", "2").await;

    let page = ctx.page("/cart").await;
    assert!(page.contains("Aether Lantern - Brass"));
    assert!(page.contains(r#"name="quantity" value="3""#));
    assert!(page.contains("450.000 ₫"));
    assert!(page.contains(r#"<span class="badge">3</span>"#));
}

#[tokio::test]
async fn test_line_without_variant_uses_base_price() {
    let ctx = TestContext::new().await;

    ctx.add_to_cart("9", "", "2").await;

    let page = ctx.page("/cart").await;
    assert!(page.contains("Field Compass"));
    assert!(page.contains("180.000 ₫"));
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("7", "70", "1").await;
    ctx.add_to_cart("9", "", "1").await;

    let response = ctx
        .post(
            "/cart/update",
            &[("product_id", "7"), ("variant_id", "70"), ("quantity", "5")],
        )
        .await;
    assert_eq!(location(&response), "/cart");
    let page = ctx.page("/cart").await;
    assert!(page.contains(r#"name="quantity" value="5""#));

    ctx.post(
        "/cart/update",
        &[("product_id", "7"), ("variant_id", "70"), ("quantity", "0")],
    )
    .await;
    let page = ctx.page("/cart").await;
    assert!(!page.contains("Aether Lantern"));
    assert!(page.contains("Field Compass"));

    ctx.post("/cart/remove", &[("product_id", "9")]).await;
    let page = ctx.page("/cart").await;
    assert!(page.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_clear_cart() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("7", "70", "2").await;

    let response = ctx.post("/cart/clear", &[]).await;
    assert_eq!(location(&response), "/cart");

    let page = ctx.page("/cart").await;
    assert!(page.contains("Cart cleared"));
    assert!(page.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_out_of_stock_variant_is_refused() {
    let ctx = TestContext::new().await;

    ctx.add_to_cart("7", "71", "1").await;

    let page = ctx.page("/cart").await;
    assert!(page.contains("The selected option is out of stock."));
    assert!(page.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_unknown_product_is_refused() {
    let ctx = TestContext::new().await;

    ctx.add_to_cart("404", "", "1").await;

    let page = ctx.page("/cart").await;
    assert!(page.contains("Could not add to cart"));
    assert!(page.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_add_returns_to_product_page() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post(
            "/cart/add",
            &[
                ("product_id", "7"),
                ("variant_id", "70"),
                ("redirect_to", "/products/7?variant=70"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/products/7?variant=70");

    let page = ctx.page("/products/7?variant=70").await;
    assert!(page.contains("Added to cart"));
}

#[tokio::test]
async fn test_cart_survives_storefront_restart() {
    let mut ctx = TestContext::new().await;
    ctx.add_to_cart("7", "70", "2").await;

    ctx.restart_storefront().await;

    let page = ctx.page("/cart").await;
    assert!(page.contains("Aether Lantern - Brass"));
    assert!(page.contains(r#"name="quantity" value="2""#));
    assert!(page.contains("300.000 ₫"));
}

#[tokio::test]
async fn test_corrupt_cart_cookie_reads_as_empty() {
    let ctx = TestContext::new().await;

    let response = aether_integration_tests::client()
        .get(ctx.url("/cart"))
        .header(reqwest::header::COOKIE, "aether_cart=not-a-cart")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Your cart is empty."));
}
