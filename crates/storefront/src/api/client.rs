//! `reqwest` client for the remote shop API.

use std::sync::Arc;

use aether_core::{BearerToken, OrderId, ProductId, ProfileUpdate, UserId};
use moka::future::Cache;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::fallback;
use super::types::{
    Banner, Category, CreatedOrder, LoginData, NewOrder, Order, OrdersPayload, Product,
    ProductPage, Registration,
};
use super::{ApiError, Envelope};
use crate::config::ApiConfig;

/// Number of characters of a response body kept in log lines.
const LOG_BODY_CHARS: usize = 500;

/// Client for the remote shop API.
///
/// Cheap to clone; all clones share one connection pool and one catalogue
/// cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("aether-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = config.cache_ttl.map(|ttl| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Resolve an endpoint path against the API root.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Send a request and decode the envelope payload.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status();

        // Read as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                status = %status,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Shop API returned non-success status"
            );
            // Error bodies usually still carry an envelope with a message
            let message = serde_json::from_str::<Envelope>(&body)
                .ok()
                .and_then(|envelope| envelope.message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope = serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Failed to parse shop API response"
            );
            ApiError::Parse(e)
        })?;

        if !envelope.is_success() {
            debug!(message = ?envelope.message, "Shop API rejected request");
        }

        envelope.into_data()
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        match &self.inner.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn remember(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for a user record and bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` or `ApiError::Status` with the host's
    /// message when the credentials are refused.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginData, ApiError> {
        let body = json!({
            "action": "login",
            "username": username,
            "password": password.expose_secret(),
        });
        let request = self.inner.client.post(self.endpoint("auth")?).json(&body);
        self.execute(request).await
    }

    /// Create a new account. Does not log the customer in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` or `ApiError::Status` with the host's
    /// message when registration is refused.
    #[instrument(skip(self, registration, password), fields(username = %registration.username))]
    pub async fn register(
        &self,
        registration: &Registration,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let body = json!({
            "action": "register",
            "username": registration.username,
            "password": password.expose_secret(),
            "fullname": registration.fullname,
            "email": registration.email,
        });
        let request = self.inner.client.post(self.endpoint("auth")?).json(&body);
        self.execute::<IgnoredAny>(request).await?;
        Ok(())
    }

    // =========================================================================
    // Catalogue (cached)
    // =========================================================================

    /// All product categories.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cached(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let request = self.inner.client.get(self.endpoint("categories")?);
        let categories: Vec<Category> = self.execute(request).await?;

        self.remember(
            CacheKey::Categories,
            CacheValue::Categories(categories.clone()),
        )
        .await;
        Ok(categories)
    }

    /// Categories, or the built-in list when the host is unavailable.
    pub async fn categories_or_fallback(&self) -> Vec<Category> {
        match self.categories().await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(error = %e, "Using fallback categories");
                fallback::categories()
            }
        }
    }

    /// Home page banners.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn banners(&self) -> Result<Vec<Banner>, ApiError> {
        if let Some(CacheValue::Banners(banners)) = self.cached(&CacheKey::Banners).await {
            debug!("Cache hit for banners");
            return Ok(banners);
        }

        let request = self.inner.client.get(self.endpoint("banners")?);
        let banners: Vec<Banner> = self.execute(request).await?;

        self.remember(CacheKey::Banners, CacheValue::Banners(banners.clone()))
            .await;
        Ok(banners)
    }

    /// A page of products.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, page: u32, limit: u32) -> Result<Vec<Product>, ApiError> {
        let key = CacheKey::Products { page, limit };
        if let Some(CacheValue::Products(products)) = self.cached(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut url = self.endpoint("products")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        let page: ProductPage = self.execute(self.inner.client.get(url)).await?;

        self.remember(key, CacheValue::Products(page.products.clone()))
            .await;
        Ok(page.products)
    }

    /// A single product with its variants and gallery.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails. A missing product surfaces as
    /// `ApiError::Status` with status 404 or as `ApiError::Rejected`.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self
            .inner
            .client
            .get(self.endpoint(&format!("products/{id}"))?);
        let product: Product = self.execute(request).await?;

        self.remember(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    // =========================================================================
    // Orders (not cached - per customer)
    // =========================================================================

    /// The customer's most recent orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the payload is neither an
    /// order list nor `{orders: [...]}`.
    #[instrument(skip(self, token))]
    pub async fn orders(
        &self,
        token: &BearerToken,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Order>, ApiError> {
        let mut url = self.endpoint("orders")?;
        url.query_pairs_mut()
            .append_pair("user_id", &user_id.to_string())
            .append_pair("limit", &limit.to_string());
        let request = self
            .inner
            .client
            .get(url)
            .header(AUTHORIZATION, token.authorization());
        let payload: OrdersPayload = self.execute(request).await?;
        Ok(payload.into_orders())
    }

    /// A single order with its items.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn order(&self, token: &BearerToken, id: OrderId) -> Result<Order, ApiError> {
        let request = self
            .inner
            .client
            .get(self.endpoint(&format!("orders/{id}"))?)
            .header(AUTHORIZATION, token.authorization());
        self.execute(request).await
    }

    /// Place an order. Returns the new order's id when the host reports one.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the order is refused or the request fails.
    #[instrument(skip(self, token, order), fields(items = order.items.len()))]
    pub async fn create_order(
        &self,
        token: &BearerToken,
        order: &NewOrder,
    ) -> Result<Option<OrderId>, ApiError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("orders")?)
            .header(AUTHORIZATION, token.authorization())
            .json(order);
        let created: Option<CreatedOrder> = self.execute(request).await?;
        Ok(created.and_then(|c| c.id))
    }

    /// Ask the host to cancel an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the cancellation is refused or the request fails.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn cancel_order(&self, token: &BearerToken, id: OrderId) -> Result<(), ApiError> {
        let request = self
            .inner
            .client
            .put(self.endpoint(&format!("orders/{id}"))?)
            .header(AUTHORIZATION, token.authorization())
            .json(&json!({ "status": "cancelled" }));
        self.execute::<IgnoredAny>(request).await?;
        Ok(())
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Save edited profile fields.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the update is refused or the request fails.
    #[instrument(skip(self, token, update))]
    pub async fn update_user(
        &self,
        token: &BearerToken,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<(), ApiError> {
        let request = self
            .inner
            .client
            .put(self.endpoint(&format!("users/{user_id}"))?)
            .header(AUTHORIZATION, token.authorization())
            .json(update);
        self.execute::<IgnoredAny>(request).await?;
        Ok(())
    }

    /// Change the customer's password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the current password is wrong or the request fails.
    #[instrument(skip(self, token, current, new))]
    pub async fn change_password(
        &self,
        token: &BearerToken,
        user_id: UserId,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<(), ApiError> {
        let body = json!({
            "user_id": user_id,
            "current_password": current.expose_secret(),
            "new_password": new.expose_secret(),
        });
        let request = self
            .inner
            .client
            .post(self.endpoint("users/change-password")?)
            .header(AUTHORIZATION, token.authorization())
            .json(&body);
        self.execute::<IgnoredAny>(request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig::new(base).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let client = client("https://shop.example/restful");
        assert_eq!(
            client.endpoint("orders/12").unwrap().as_str(),
            "https://shop.example/restful/orders/12"
        );
        assert_eq!(
            client.endpoint("users/change-password").unwrap().as_str(),
            "https://shop.example/restful/users/change-password"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_falls_back_to_builtin_categories() {
        // Port 9 (discard) on localhost is not listening in test environments
        let client = client("http://127.0.0.1:9/restful");
        let categories = client.categories_or_fallback().await;
        assert_eq!(categories, fallback::categories());
    }
}
