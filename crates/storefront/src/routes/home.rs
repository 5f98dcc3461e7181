//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{Banner, Category, Product};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::Layout;
use crate::state::AppState;

/// Number of products in the "featured" grid.
pub const FEATURED_PRODUCTS: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub banners: Vec<Banner>,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
}

/// Display the home page.
///
/// Each section degrades independently: banners and products render empty
/// on failure, categories fall back to the built-in list.
#[instrument(skip(state, session, headers, auth))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    let api = state.api();
    let (banners, products) = tokio::join!(api.banners(), api.products(1, FEATURED_PRODUCTS));

    let banners = banners.unwrap_or_else(|e| {
        tracing::error!("Failed to fetch banners: {e}");
        Vec::new()
    });
    let products = products.unwrap_or_else(|e| {
        tracing::error!("Failed to fetch featured products: {e}");
        Vec::new()
    });

    let layout = Layout::load(&state, &session, &headers, auth.map(|s| s.user)).await;

    HomeTemplate {
        categories: layout.categories.clone(),
        layout,
        banners,
        products,
    }
}
