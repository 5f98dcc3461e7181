//! Home page, product listing and product detail.

use aether_integration_tests::TestContext;

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/health").await;
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_home_page_sections() {
    let ctx = TestContext::new().await;

    let page = ctx.page("/").await;
    assert!(page.contains("Storm season sale"));
    assert!(page.contains("Star Charts"));
    assert!(page.contains("Aether Lantern"));
    assert!(page.contains("150.000 ₫"));
}

#[tokio::test]
async fn test_categories_fall_back_when_host_fails() {
    let ctx = TestContext::new().await;
    ctx.shop.take_categories_down();

    let page = ctx.page("/").await;
    assert!(page.contains("Classified Schematics"));
    assert!(!page.contains("Star Charts"));
}

#[tokio::test]
async fn test_listing_sorts_and_filters() {
    let ctx = TestContext::new().await;

    let page = ctx.page("/products?sort=price-asc").await;
    let compass = page.find("Field Compass").unwrap_or(usize::MAX);
    let lantern = page.find("Aether Lantern").unwrap_or(0);
    assert!(compass < lantern);

    let page = ctx.page("/products?search=storm").await;
    assert!(page.contains("Field Compass"));
    assert!(!page.contains("Aether Lantern"));

    let page = ctx.page("/products?category=21").await;
    assert!(page.contains("No products match your filters."));
}

#[tokio::test]
async fn test_product_detail_variants() {
    let ctx = TestContext::new().await;

    let page = ctx.page("/products/7").await;
    assert!(page.contains(r#"name="variant_id" value="70""#));
    assert!(page.contains("Out of stock"));
    assert!(page.contains("Field Compass"));

    let page = ctx.page("/products/7?variant=71").await;
    assert!(page.contains("This option is out of stock."));
}

#[tokio::test]
async fn test_malformed_variant_shows_first_variant() {
    let ctx = TestContext::new().await;

    for query in ["abc", "", "999"] {
        let page = ctx.page(&format!("/products/7?variant={query}")).await;
        assert!(page.contains(r#"name="variant_id" value="70""#), "variant={query}");
    }
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let ctx = TestContext::new().await;

    assert_eq!(ctx.get("/products/404").await.status(), 404);
    assert_eq!(ctx.get("/products/lantern").await.status(), 404);
}
