//! Cart route handlers.
//!
//! The cart lives in the `aether_cart` cookie (see [`CartStore`]). Every
//! mutation is a plain form POST that redirects back, so the cart works
//! without JavaScript. Prices always come from the remote catalogue, never
//! from the submitted form.

use aether_core::{CartLine, ProductId, VariantId};
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
use tracing::{instrument, warn};

use super::{form_id, local_path};
use crate::api::{Product, Variant};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::Layout;
use crate::services::{CartStore, Notice, notice};
use crate::state::AppState;

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: Option<String>,
    /// Where to go afterwards; defaults to the cart page.
    pub redirect_to: Option<String>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: String,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
    pub variant_id: Option<String>,
}

fn product_id(raw: &str) -> Result<ProductId> {
    form_id(Some(raw)).ok_or_else(|| AppError::BadRequest("Invalid product.".to_string()))
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLine>,
    pub total: aether_core::Price,
    pub item_count: u32,
}

// =============================================================================
// Line building
// =============================================================================

/// Why a product cannot go into the cart.
#[derive(Debug, PartialEq, Eq)]
enum Unavailable {
    UnknownVariant,
    OutOfStock,
}

/// Build a cart line from catalogue data.
///
/// The unit price is the variant's when one is chosen, else the product's
/// base price. Lines for a variant are named "Product - Variant".
fn build_line(
    product: &Product,
    variant_id: Option<VariantId>,
    quantity: u32,
) -> std::result::Result<CartLine, Unavailable> {
    let variant: Option<&Variant> = match variant_id {
        Some(id) => Some(product.variant(id).ok_or(Unavailable::UnknownVariant)?),
        None => None,
    };
    if variant.is_some_and(|v| !v.in_stock()) {
        return Err(Unavailable::OutOfStock);
    }

    let name = variant.map_or_else(
        || product.name.clone(),
        |v| format!("{} - {}", product.name, v.name),
    );
    let image = variant
        .and_then(|v| v.images.first())
        .or(product.main_image.as_ref())
        .cloned()
        .unwrap_or_default();
    let unit_price = variant.map_or(product.base_price, |v| v.price);

    Ok(CartLine::new(
        product.id,
        variant.map(|v| v.id),
        name,
        unit_price,
        quantity,
        image,
    ))
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
#[instrument(skip(state, session, headers, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    let store = CartStore::from_request(&state, &headers);
    let layout = Layout::load(&state, &session, &headers, auth.map(|s| s.user)).await;

    CartTemplate {
        layout,
        lines: store.cart().lines().to_vec(),
        total: store.total_price(),
        item_count: store.item_count(),
    }
}

/// Save the cart and redirect, carrying the cart cookie.
async fn save_and_redirect(store: CartStore, session: &Session, to: &str) -> Result<Response> {
    let cookie = store.save(session).await?;
    Ok((AppendHeaders(cookie), Redirect::to(to)).into_response())
}

/// Add a product to the cart.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product_id = product_id(&form.product_id)?;
    let variant_id: Option<VariantId> = form_id(form.variant_id.as_deref());
    let quantity = form_id::<u32>(form.quantity.as_deref())
        .unwrap_or(1)
        .max(1);
    let back = form
        .redirect_to
        .as_deref()
        .and_then(local_path)
        .unwrap_or("/cart")
        .to_string();

    let product = match state.api().product(product_id).await {
        Ok(product) => product,
        Err(e) => {
            warn!(error = %e, %product_id, "Failed to load product for cart");
            notice::push(
                &session,
                [Notice::error(
                    "Could not add to cart",
                    "This product is not available right now.",
                )],
            )
            .await?;
            return Ok(Redirect::to(&back).into_response());
        }
    };

    let line = match build_line(&product, variant_id, quantity) {
        Ok(line) => line,
        Err(reason) => {
            let description = match reason {
                Unavailable::UnknownVariant => "Please choose one of the listed options.",
                Unavailable::OutOfStock => "The selected option is out of stock.",
            };
            notice::push(&session, [Notice::error("Could not add to cart", description)]).await?;
            return Ok(Redirect::to(&back).into_response());
        }
    };

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", &product_id.to_string()),
            ("quantity", &quantity.to_string()),
        ],
    );

    let mut store = CartStore::from_request(&state, &headers);
    store.add(line);
    save_and_redirect(store, &session, &back).await
}

/// Set a line's quantity. Zero or less removes the line.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let product_id = product_id(&form.product_id)?;
    let variant_id = form_id(form.variant_id.as_deref());
    let quantity: i64 = form
        .quantity
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid quantity.".to_string()))?;

    let mut store = CartStore::from_request(&state, &headers);
    store.update_quantity(product_id, quantity, variant_id);
    save_and_redirect(store, &session, "/cart").await
}

/// Remove a line from the cart.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let product_id = product_id(&form.product_id)?;
    let variant_id = form_id(form.variant_id.as_deref());

    let mut store = CartStore::from_request(&state, &headers);
    store.remove(product_id, variant_id);
    save_and_redirect(store, &session, "/cart").await
}

/// Empty the cart.
#[instrument(skip(state, session, headers))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let mut store = CartStore::from_request(&state, &headers);
    store.clear();
    save_and_redirect(store, &session, "/cart").await
}
