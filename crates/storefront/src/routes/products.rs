//! Product route handlers.

use std::cmp::Ordering;

use aether_core::{CategoryId, Price, ProductId, VariantId};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{Category, Product, Variant};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::Layout;
use crate::state::AppState;

/// The listing loads the whole catalogue and filters locally.
pub const ALL_PRODUCTS_LIMIT: u32 = 9999;

/// Maximum number of related products on a detail page.
pub const RELATED_PRODUCTS: usize = 4;

// =============================================================================
// Listing filters
// =============================================================================

/// Sort order for the product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    /// All orders, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Newest,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::NameAsc,
        Self::NameDesc,
    ];

    /// Parse the `sort` query value; unknown values sort newest first.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("price-asc") => Self::PriceAsc,
            Some("price-desc") => Self::PriceDesc,
            Some("name-asc") => Self::NameAsc,
            Some("name-desc") => Self::NameDesc,
            _ => Self::Newest,
        }
    }

    /// Query value for this order.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
        }
    }

    /// Menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::NameAsc => "Name: A to Z",
            Self::NameDesc => "Name: Z to A",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            // Products without a parseable date sort last
            Self::Newest => b.created().cmp(&a.created()),
            Self::PriceAsc => a.base_price.cmp(&b.base_price),
            Self::PriceDesc => b.base_price.cmp(&a.base_price),
            Self::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
        }
    }
}

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub search: Option<String>,
    pub name: Option<String>,
    pub sort: Option<String>,
}

impl ProductFilters {
    fn category_id(&self) -> Option<CategoryId> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    fn term(value: Option<&String>) -> Option<String> {
        value
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
    }

    /// Filter and sort a product list.
    #[must_use]
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let category = self.category_id();
        let search = Self::term(self.search.as_ref());
        let name = Self::term(self.name.as_ref());
        let sort = SortOrder::parse(self.sort.as_deref());

        let mut filtered: Vec<Product> = products
            .into_iter()
            .filter(|p| category.is_none_or(|c| p.category_id == Some(c)))
            .filter(|p| {
                search.as_deref().is_none_or(|term| {
                    p.name.to_lowercase().contains(term)
                        || p.description.to_lowercase().contains(term)
                })
            })
            .filter(|p| {
                name.as_deref()
                    .is_none_or(|term| p.name.to_lowercase().contains(term))
            })
            .collect();

        filtered.sort_by(|a, b| sort.compare(a, b));
        filtered
    }
}

/// Products in the same category as `product`, excluding it.
#[must_use]
pub fn related_products(product: &Product, catalogue: Vec<Product>) -> Vec<Product> {
    let Some(category) = product.category_id else {
        return Vec::new();
    };
    catalogue
        .into_iter()
        .filter(|p| p.category_id == Some(category) && p.id != product.id)
        .take(RELATED_PRODUCTS)
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub selected_category: Option<CategoryId>,
    pub search: String,
    pub sort: SortOrder,
    pub sort_orders: [SortOrder; 5],
}

impl ProductsIndexTemplate {
    /// Whether `order` is the active sort.
    #[must_use]
    pub fn is_current_sort(&self, order: &SortOrder) -> bool {
        self.sort == *order
    }

    /// Whether `category` is the active filter.
    #[must_use]
    pub fn is_current_category(&self, category: &Category) -> bool {
        self.selected_category == Some(category.id)
    }

    /// Listing URL with `sort` replaced, keeping the other filters.
    #[must_use]
    pub fn sort_url(&self, order: &SortOrder) -> String {
        let mut url = format!("/products?sort={}", order.as_str());
        if let Some(category) = self.selected_category {
            url.push_str(&format!("&category={category}"));
        }
        if !self.search.is_empty() {
            url.push_str(&format!("&search={}", urlencoding::encode(&self.search)));
        }
        url
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: Product,
    pub selected: Option<Variant>,
    pub price: Price,
    pub images: Vec<String>,
    pub related_products: Vec<Product>,
}

impl ProductShowTemplate {
    /// Whether `variant` is the one shown.
    #[must_use]
    pub fn is_selected(&self, variant: &Variant) -> bool {
        self.selected.as_ref().is_some_and(|s| s.id == variant.id)
    }

    /// Whether the add-to-cart button is enabled.
    #[must_use]
    pub fn can_add(&self) -> bool {
        self.selected
            .as_ref()
            .is_none_or(Variant::in_stock)
    }
}

/// Detail query parameters.
#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    pub variant: Option<String>,
}

/// The variant a detail page shows: the requested one when it exists,
/// otherwise the first. Malformed ids read as no request.
fn selected_variant(product: &Product, requested: Option<&str>) -> Option<Variant> {
    super::form_id::<VariantId>(requested)
        .and_then(|id| product.variant(id))
        .or_else(|| product.variants.first())
        .cloned()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display product listing page.
#[instrument(skip(state, session, headers, auth))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    OptionalAuth(auth): OptionalAuth,
    Query(query): Query<ProductFilters>,
) -> impl IntoResponse {
    let products = state
        .api()
        .products(1, ALL_PRODUCTS_LIMIT)
        .await
        .map_or_else(
            |e| {
                tracing::error!("Failed to fetch products: {e}");
                Vec::new()
            },
            |products| query.apply(products),
        );

    let layout = Layout::load(&state, &session, &headers, auth.map(|s| s.user)).await;

    ProductsIndexTemplate {
        categories: layout.categories.clone(),
        layout,
        products,
        selected_category: query.category_id(),
        search: query.search.clone().unwrap_or_default(),
        sort: SortOrder::parse(query.sort.as_deref()),
        sort_orders: SortOrder::ALL,
    }
}

/// Display product detail page.
#[instrument(skip(state, session, headers, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    OptionalAuth(auth): OptionalAuth,
    Path(id): Path<String>,
    Query(query): Query<VariantQuery>,
) -> Result<impl IntoResponse> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("product {id}")))?;

    let product = state.api().product(id).await.map_err(|e| {
        tracing::warn!("Failed to fetch product {id}: {e}");
        AppError::NotFound(format!("product {id}"))
    })?;

    let related = match state.api().products(1, ALL_PRODUCTS_LIMIT).await {
        Ok(catalogue) => related_products(&product, catalogue),
        Err(e) => {
            tracing::error!("Failed to fetch related products: {e}");
            Vec::new()
        }
    };

    let selected = selected_variant(&product, query.variant.as_deref());
    let price = selected.as_ref().map_or(product.base_price, |v| v.price);

    let mut images: Vec<String> = product.gallery().into_iter().map(String::from).collect();
    if let Some(variant) = &selected {
        for image in &variant.images {
            if !image.is_empty() && !images.contains(image) {
                images.push(image.clone());
            }
        }
    }

    let layout = Layout::load(&state, &session, &headers, auth.map(|s| s.user)).await;

    Ok(ProductShowTemplate {
        layout,
        product,
        selected,
        price,
        images,
        related_products: related,
    })
}
