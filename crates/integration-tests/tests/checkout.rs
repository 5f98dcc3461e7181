//! Checkout, order history, cancellation and invoices.

#![allow(clippy::unwrap_used)]

use aether_integration_tests::{TestContext, location};
use serde_json::json;

const SHIPPING: [(&str, &str); 6] = [
    ("address", "12 Hang Bac"),
    ("city", "Hanoi"),
    ("province", "Hoan Kiem"),
    ("country", "Vietnam"),
    ("phone", "0909123456"),
    ("payment_method", "cod"),
];

#[tokio::test]
async fn test_checkout_requires_login() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("7", "70", "1").await;

    let response = ctx.get("/checkout").await;
    assert_eq!(location(&response), "/login?callbackUrl=%2Fcheckout");
}

#[tokio::test]
async fn test_empty_cart_goes_back_to_cart() {
    let ctx = TestContext::new().await;
    ctx.login().await;

    let response = ctx.get("/checkout").await;
    assert_eq!(location(&response), "/cart");
}

#[tokio::test]
async fn test_place_order_clears_cart() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    ctx.add_to_cart("7", "70", "2").await;

    let page = ctx.page("/checkout").await;
    assert!(page.contains("300.000 ₫"));

    let response = ctx.post("/checkout", &SHIPPING).await;
    assert_eq!(location(&response), "/orders/501");

    let placed = ctx.shop.recorded(|r| r.orders_placed.clone());
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0]["items"], json!([{"variant_id": 70, "quantity": 2}]));
    assert_eq!(
        placed[0]["shipping_address"],
        "12 Hang Bac, Hanoi, Hoan Kiem, Vietnam"
    );
    assert_eq!(placed[0]["payment_method"], "cod");

    let order = ctx.page("/orders/501").await;
    assert!(order.contains("Order placed"));
    assert!(order.contains("AE-501"));

    let cart = ctx.page("/cart").await;
    assert!(cart.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_missing_shipping_field_keeps_cart() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    ctx.add_to_cart("9", "", "1").await;

    let response = ctx
        .post("/checkout", &[("address", "12 Hang Bac"), ("city", "")])
        .await;
    assert_eq!(location(&response), "/checkout");
    assert!(ctx.shop.recorded(|r| r.orders_placed.is_empty()));

    let page = ctx.page("/checkout").await;
    assert!(page.contains("Please fill in the city field."));
    assert!(page.contains("Field Compass"));
}

#[tokio::test]
async fn test_cancel_pending_order() {
    let ctx = TestContext::new().await;
    ctx.login().await;

    let history = ctx.page("/orders").await;
    assert!(history.contains("AE-501"));
    assert!(history.contains("Awaiting confirmation"));

    let response = ctx
        .post("/orders/501/cancel", &[("redirect_to", "/orders")])
        .await;
    assert_eq!(location(&response), "/orders");
    assert_eq!(ctx.shop.recorded(|r| r.orders_cancelled.clone()), vec![501]);

    let history = ctx.page("/orders").await;
    assert!(history.contains("Order cancelled"));
    assert!(history.contains("Cancelled"));

    // A second attempt is refused locally
    ctx.post("/orders/501/cancel", &[]).await;
    assert_eq!(ctx.shop.recorded(|r| r.orders_cancelled.len()), 1);
    let detail = ctx.page("/orders/501").await;
    assert!(detail.contains("can no longer be cancelled"));
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let ctx = TestContext::new().await;
    ctx.login().await;

    assert_eq!(ctx.get("/orders/999").await.status(), 404);
    assert_eq!(ctx.get("/orders/abc").await.status(), 404);
}

#[tokio::test]
async fn test_invoice_shows_customer_details() {
    let ctx = TestContext::new().await;
    ctx.login().await;

    let invoice = ctx.page("/invoice/501").await;
    assert!(invoice.contains("Invoice AE-501"));
    assert!(invoice.contains("An Pham"));
    assert!(invoice.contains("0909123456"));
    assert!(invoice.contains("300.000 ₫"));
}

#[tokio::test]
async fn test_profile_update_rewrites_cookie() {
    let ctx = TestContext::new().await;
    ctx.login().await;

    let response = ctx
        .post(
            "/profile",
            &[
                ("fullname", "An P."),
                ("email", "an@shop.vn"),
                ("phone", ""),
                ("address", "1 Trang Tien"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/profile");
    let blob = aether_integration_tests::auth_cookie(&response).unwrap();
    let session = aether_core::Session::decode(&blob).unwrap();
    assert_eq!(session.user.fullname, "An P.");
    assert_eq!(session.user.address.as_deref(), Some("1 Trang Tien"));

    let sent = ctx.shop.recorded(|r| r.profile_updates.clone());
    assert_eq!(sent[0]["fullname"], "An P.");

    let page = ctx.page("/profile").await;
    assert!(page.contains("Profile updated"));
    assert!(page.contains(r#"value="An P.""#));
}

#[tokio::test]
async fn test_change_password_reports_refusal() {
    let ctx = TestContext::new().await;
    ctx.login().await;

    ctx.post(
        "/profile/password",
        &[
            ("current_password", "nope"),
            ("new_password", "secret2"),
            ("confirm_password", "secret2"),
        ],
    )
    .await;
    let page = ctx.page("/profile").await;
    assert!(page.contains("Current password is incorrect"));

    ctx.post(
        "/profile/password",
        &[
            ("current_password", "secret1"),
            ("new_password", "short"),
            ("confirm_password", "short"),
        ],
    )
    .await;
    let page = ctx.page("/profile").await;
    assert!(page.contains("Password must be at least 6 characters."));
}
