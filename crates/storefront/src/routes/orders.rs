//! Order history, order detail, cancellation and invoice handlers.

use aether_core::{OrderId, User};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::local_path;
use crate::api::{GENERIC_FAILURE, Order};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::Layout;
use crate::services::{Notice, notice};
use crate::state::AppState;

/// Orders shown on the history page.
pub const ORDER_HISTORY_LIMIT: u32 = 50;

/// Shown in place of contact details the customer never gave.
const NOT_PROVIDED: &str = "Not provided";

// =============================================================================
// Templates
// =============================================================================

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub layout: Layout,
    pub orders: Vec<Order>,
    pub load_failed: bool,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: Order,
}

/// Printable invoice template.
#[derive(Template, WebTemplate)]
#[template(path = "invoice.html")]
pub struct InvoiceTemplate {
    pub order: Order,
    pub customer: User,
}

impl InvoiceTemplate {
    /// Stylesheet to link from the page head.
    #[must_use]
    pub const fn stylesheet(&self) -> &'static str {
        super::STYLESHEET
    }

    /// Customer phone, or a placeholder.
    #[must_use]
    pub fn customer_phone(&self) -> &str {
        self.customer
            .phone
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(NOT_PROVIDED)
    }

    /// Customer email, or a placeholder.
    #[must_use]
    pub fn customer_email(&self) -> &str {
        Some(self.customer.email.as_str())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(NOT_PROVIDED)
    }
}

/// Cancel form data.
#[derive(Debug, Default, Deserialize)]
pub struct CancelForm {
    /// Page to return to; defaults to the order detail.
    pub redirect_to: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

fn order_id(raw: &str) -> Result<OrderId> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("order {raw}")))
}

/// Fetch an order and make sure it belongs to `user`.
async fn owned_order(state: &AppState, auth: &aether_core::Session, id: OrderId) -> Result<Order> {
    let order = state
        .api()
        .order(&auth.token, id)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                AppError::NotFound(format!("order {id}"))
            } else {
                AppError::Api(e)
            }
        })?;

    // Orders without an owner are trusted to the token that fetched them
    if order.user_id.is_some_and(|owner| owner != auth.user.id) {
        warn!(order_id = %id, "Order belongs to another customer");
        return Err(AppError::NotFound(format!("order {id}")));
    }
    Ok(order)
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the order history.
#[instrument(skip(state, session, headers, auth), fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(auth): RequireAuth,
) -> impl IntoResponse {
    let (orders, load_failed) = match state
        .api()
        .orders(&auth.token, auth.user.id, ORDER_HISTORY_LIMIT)
        .await
    {
        Ok(orders) => (orders, false),
        Err(e) => {
            tracing::error!("Failed to fetch orders: {e}");
            (Vec::new(), true)
        }
    };

    let layout = Layout::load(&state, &session, &headers, Some(auth.user)).await;

    OrdersIndexTemplate {
        layout,
        orders,
        load_failed,
    }
}

/// Display one order.
#[instrument(skip(state, session, headers, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = order_id(&id)?;
    let order = owned_order(&state, &auth, id).await?;
    let layout = Layout::load(&state, &session, &headers, Some(auth.user)).await;

    Ok(OrderShowTemplate { layout, order })
}

/// Cancel a pending order.
///
/// Orders past the pending stage are left alone with an error notice.
#[instrument(skip(state, session, auth, form))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<CancelForm>,
) -> Result<Redirect> {
    let id = order_id(&id)?;
    let back = form
        .redirect_to
        .as_deref()
        .and_then(local_path)
        .map_or_else(|| format!("/orders/{id}"), String::from);

    let order = owned_order(&state, &auth, id).await?;
    let notice = if order.status.is_cancellable() {
        match state.api().cancel_order(&auth.token, id).await {
            Ok(()) => {
                info!(order_id = %id, "Order cancelled");
                add_breadcrumb("orders", "Order cancelled", &[("order_id", &id.to_string())]);
                Notice::success(
                    "Order cancelled",
                    format!("Order {} has been cancelled.", order.code()),
                )
            }
            Err(e) => {
                warn!(error = %e, "Order cancellation failed");
                Notice::error("Cancellation failed", e.user_message(GENERIC_FAILURE))
            }
        }
    } else {
        Notice::error(
            "Cancellation failed",
            format!(
                "Order {} is {} and can no longer be cancelled.",
                order.code(),
                order.status.label().to_lowercase()
            ),
        )
    };
    notice::push(&session, [notice]).await?;

    Ok(Redirect::to(&back))
}

/// Display a printable invoice for one order.
#[instrument(skip(state, auth))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = order_id(&id)?;
    let order = owned_order(&state, &auth, id).await?;

    Ok(InvoiceTemplate {
        order,
        customer: auth.user,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aether_core::UserId;

    use super::*;

    fn invoice_for(phone: Option<&str>, email: &str) -> InvoiceTemplate {
        InvoiceTemplate {
            order: serde_json::from_value(serde_json::json!({"id": 3, "status": "pending"}))
                .unwrap(),
            customer: User {
                id: UserId::new(1),
                username: "an".to_string(),
                fullname: "An Pham".to_string(),
                email: email.to_string(),
                role: "customer".to_string(),
                phone: phone.map(String::from),
                address: None,
            },
        }
    }

    #[test]
    fn test_invoice_contact_fallbacks() {
        let invoice = invoice_for(None, "");
        assert_eq!(invoice.customer_phone(), "Not provided");
        assert_eq!(invoice.customer_email(), "Not provided");

        let invoice = invoice_for(Some("0909"), "an@shop.vn");
        assert_eq!(invoice.customer_phone(), "0909");
        assert_eq!(invoice.customer_email(), "an@shop.vn");
    }

    #[test]
    fn test_order_id_rejects_garbage_as_not_found() {
        assert_eq!(order_id("42").unwrap(), OrderId::new(42));
        assert!(matches!(order_id("abc"), Err(AppError::NotFound(_))));
    }
}
