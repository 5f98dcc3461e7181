//! Checkout route handlers.
//!
//! Both handlers require a logged-in customer; anonymous visitors are sent
//! to `/login?callbackUrl=/checkout` by [`RequireAuth`].

use aether_core::{CartLine, PaymentMethod, Price, User};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::{GENERIC_FAILURE, NewOrder, NewOrderItem};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::Layout;
use crate::services::{CartStore, Notice, notice};
use crate::state::AppState;

/// Checkout form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub address: String,
    pub city: String,
    pub province: String,
    pub country: String,
    pub phone: String,
    pub payment_method: String,
    pub notes: String,
}

impl CheckoutForm {
    /// Single-line shipping address sent to the host.
    #[must_use]
    pub fn shipping_address(&self) -> String {
        [&self.address, &self.city, &self.province, &self.country]
            .iter()
            .map(|part| part.trim())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Chosen payment method; anything but `card` is cash on delivery.
    #[must_use]
    pub fn payment_method(&self) -> PaymentMethod {
        if self.payment_method.trim().eq_ignore_ascii_case("card") {
            PaymentMethod::Card
        } else {
            PaymentMethod::Cod
        }
    }

    /// Name of the first required field left blank, if any.
    fn missing_field(&self) -> Option<&'static str> {
        [
            ("address", &self.address),
            ("city", &self.city),
            ("province", &self.province),
            ("country", &self.country),
            ("phone", &self.phone),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }

    /// Order body for the given cart lines.
    #[must_use]
    pub fn to_order(&self, lines: &[CartLine]) -> NewOrder {
        NewOrder {
            items: lines
                .iter()
                .map(|line| NewOrderItem {
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                })
                .collect(),
            shipping_address: self.shipping_address(),
            phone: self.phone.trim().to_string(),
            payment_method: self.payment_method(),
            notes: self.notes.trim().to_string(),
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub customer: User,
    pub lines: Vec<CartLine>,
    pub total: Price,
    pub payment_methods: [PaymentMethod; 2],
}

/// Display the checkout form. An empty cart goes back to the cart page.
#[instrument(skip(state, session, headers, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(auth): RequireAuth,
) -> Result<Response> {
    let store = CartStore::from_request(&state, &headers);
    if store.cart().is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let layout = Layout::load(&state, &session, &headers, Some(auth.user.clone())).await;

    Ok(CheckoutTemplate {
        layout,
        customer: auth.user,
        lines: store.cart().lines().to_vec(),
        total: store.total_price(),
        payment_methods: [PaymentMethod::Cod, PaymentMethod::Card],
    }
    .into_response())
}

/// Place the order.
///
/// On success the cart is emptied and the customer lands on the new order,
/// or on the order history when the host returns no id.
#[instrument(skip(state, session, headers, auth, form), fields(user_id = %auth.user.id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let mut store = CartStore::from_request(&state, &headers);
    if store.cart().is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    if let Some(field) = form.missing_field() {
        notice::push(
            &session,
            [Notice::error(
                "Missing information",
                format!("Please fill in the {field} field."),
            )],
        )
        .await?;
        return Ok(Redirect::to("/checkout").into_response());
    }

    let order = form.to_order(store.cart().lines());
    match state.api().create_order(&auth.token, &order).await {
        Ok(order_id) => {
            info!(order_id = ?order_id, "Order placed");
            add_breadcrumb("checkout", "Order placed", &[]);

            store.clear_silently();
            let cookie = store.save(&session).await?;
            notice::push(
                &session,
                [Notice::success(
                    "Order placed",
                    "Thank you! Your order has been received.",
                )],
            )
            .await?;

            let location =
                order_id.map_or_else(|| "/orders".to_string(), |id| format!("/orders/{id}"));
            Ok((AppendHeaders(cookie), Redirect::to(&location)).into_response())
        }
        Err(e) => {
            warn!(error = %e, "Order creation failed");
            notice::push(
                &session,
                [Notice::error("Order failed", e.user_message(GENERIC_FAILURE))],
            )
            .await?;
            Ok(Redirect::to("/checkout").into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aether_core::{ProductId, VariantId};

    use super::*;

    fn form() -> CheckoutForm {
        CheckoutForm {
            address: "12 Hang Bac ".to_string(),
            city: "Hanoi".to_string(),
            province: "Hoan Kiem".to_string(),
            country: "Vietnam".to_string(),
            phone: " 0909123456".to_string(),
            payment_method: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_shipping_address_joins_parts() {
        assert_eq!(
            form().shipping_address(),
            "12 Hang Bac, Hanoi, Hoan Kiem, Vietnam"
        );
    }

    #[test]
    fn test_payment_method_defaults_to_cod() {
        assert_eq!(form().payment_method(), PaymentMethod::Cod);
        let card = CheckoutForm {
            payment_method: "card".to_string(),
            ..form()
        };
        assert_eq!(card.payment_method(), PaymentMethod::Card);
    }

    #[test]
    fn test_missing_field_reports_first_blank() {
        assert_eq!(form().missing_field(), None);
        let blank = CheckoutForm {
            city: "  ".to_string(),
            phone: String::new(),
            ..form()
        };
        assert_eq!(blank.missing_field(), Some("city"));
    }

    #[test]
    fn test_order_items_follow_cart_lines() {
        let lines = vec![
            CartLine::new(
                ProductId::new(1),
                Some(VariantId::new(10)),
                "Lantern - Brass",
                Price::from(100),
                3,
                "",
            ),
            CartLine::new(ProductId::new(2), None, "Compass", Price::from(50), 1, ""),
        ];
        let order = form().to_order(&lines);
        assert_eq!(
            order.items,
            vec![
                NewOrderItem {
                    variant_id: Some(VariantId::new(10)),
                    quantity: 3
                },
                NewOrderItem {
                    variant_id: None,
                    quantity: 1
                },
            ]
        );
        assert_eq!(order.phone, "0909123456");
        assert_eq!(order.payment_method, PaymentMethod::Cod);
    }
}
