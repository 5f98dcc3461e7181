//! Integration test harness for the Aether Market storefront.
//!
//! Each test gets its own [`TestContext`]: an in-process mock of the remote
//! shop API and a storefront instance pointed at it, both bound to ephemeral
//! ports. Nothing outside the test process is contacted.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p aether-integration-tests
//! ```
//!
//! # Mock shop data
//!
//! - Customer `an` / `secret1` (user id 8, token `tok-an`)
//! - Product 7 "Aether Lantern" with variants 70 (Brass, 150.000 ₫, in stock)
//!   and 71 (Silver, out of stock); product 9 "Field Compass" without variants
//! - Order 501, pending, owned by user 8

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use aether_storefront::config::StorefrontConfig;
use aether_storefront::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use reqwest::{Client, redirect};
use serde_json::{Value, json};

/// Username accepted by the mock auth endpoint.
pub const USERNAME: &str = "an";
/// Password accepted by the mock auth endpoint.
pub const PASSWORD: &str = "secret1";
/// Id of the order created by `POST orders`.
pub const NEW_ORDER_ID: i64 = 501;

// =============================================================================
// Mock shop API
// =============================================================================

/// Requests the mock received that tests assert on.
#[derive(Default)]
pub struct Recorded {
    pub orders_placed: Vec<Value>,
    pub orders_cancelled: Vec<i64>,
    pub profile_updates: Vec<Value>,
}

#[derive(Default)]
struct MockState {
    categories_down: AtomicBool,
    order_cancelled: AtomicBool,
    recorded: Mutex<Recorded>,
}

/// Handle to the running mock shop API.
#[derive(Clone)]
pub struct MockShop {
    addr: SocketAddr,
    state: Arc<MockState>,
}

fn success(data: Value) -> Response {
    Json(json!({ "status": "success", "data": data })).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "status": "error", "message": message })),
    )
        .into_response()
}

fn user() -> Value {
    json!({
        "id": 8,
        "username": USERNAME,
        "fullname": "An Pham",
        "email": "an@shop.vn",
        "role": "customer",
        "phone": "0909123456"
    })
}

fn products() -> Value {
    json!([
        {
            "id": 7,
            "name": "Aether Lantern",
            "description": "Glows when Aether is near.",
            "base_price": "120000.00",
            "category_id": "14",
            "category_name": "Aether Tools",
            "main_image": "https://img.example/lantern.png",
            "created_at": "2024-05-01 09:00:00",
            "variants": [
                {"id": 70, "name": "Brass", "price": "150000.00", "stock": "3"},
                {"id": 71, "name": "Silver", "price": "180000.00", "stock": 0}
            ]
        },
        {
            "id": 9,
            "name": "Field Compass",
            "description": "Points away from the storm.",
            "base_price": 90000,
            "category_id": 14,
            "category_name": "Aether Tools",
            "created_at": "2024-04-01 09:00:00",
            "variants": []
        }
    ])
}

fn order(cancelled: bool) -> Value {
    json!({
        "id": NEW_ORDER_ID,
        "order_code": "AE-501",
        "user_id": 8,
        "total_amount": "300000",
        "status": if cancelled { "cancelled" } else { "pending" },
        "shipping_address": "12 Hang Bac, Hanoi, Hoan Kiem, Vietnam",
        "payment_method": "cod",
        "created_at": "2024-05-02 10:30:00",
        "items": [
            {
                "id": 1,
                "product_id": 7,
                "variant_id": 70,
                "quantity": 2,
                "price": "150000",
                "product_name": "Aether Lantern",
                "variant_name": "Brass"
            }
        ]
    })
}

async fn auth(Json(body): Json<Value>) -> Response {
    match body["action"].as_str() {
        Some("login") if body["username"] == USERNAME && body["password"] == PASSWORD => {
            success(json!({ "user": user(), "token": "tok-an" }))
        }
        Some("login") => failure(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Some("register") if body["username"] == "taken" => {
            failure(StatusCode::CONFLICT, "Username already exists")
        }
        Some("register") => success(json!({ "id": 99 })),
        _ => failure(StatusCode::BAD_REQUEST, "Unknown action"),
    }
}

async fn categories(State(state): State<Arc<MockState>>) -> Response {
    if state.categories_down.load(Ordering::SeqCst) {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
    }
    success(json!([
        {"id": "14", "name": "Aether Tools", "description": "Tools", "total_products": "2"},
        {"id": "21", "name": "Star Charts", "description": null, "total_products": 0}
    ]))
}

async fn banners() -> Response {
    success(json!([
        {"id": 1, "title": "Storm season sale", "image": "https://img.example/storm.png", "link": "/products"}
    ]))
}

async fn product_list() -> Response {
    success(json!({ "products": products() }))
}

async fn product(Path(id): Path<i64>) -> Response {
    products()
        .as_array()
        .and_then(|all| all.iter().find(|p| p["id"] == id).cloned())
        .map_or_else(
            || failure(StatusCode::NOT_FOUND, "Product not found"),
            success,
        )
}

async fn order_list(State(state): State<Arc<MockState>>) -> Response {
    let cancelled = state.order_cancelled.load(Ordering::SeqCst);
    success(json!({ "orders": [order(cancelled)] }))
}

async fn order_detail(State(state): State<Arc<MockState>>, Path(id): Path<i64>) -> Response {
    if id != NEW_ORDER_ID {
        return failure(StatusCode::NOT_FOUND, "Order not found");
    }
    success(order(state.order_cancelled.load(Ordering::SeqCst)))
}

async fn place_order(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.recorded.lock().unwrap().orders_placed.push(body);
    success(json!({ "id": NEW_ORDER_ID }))
}

async fn update_order(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if body["status"] != "cancelled" {
        return failure(StatusCode::BAD_REQUEST, "Unsupported update");
    }
    state.order_cancelled.store(true, Ordering::SeqCst);
    state.recorded.lock().unwrap().orders_cancelled.push(id);
    success(Value::Null)
}

async fn update_user(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.recorded.lock().unwrap().profile_updates.push(body);
    success(Value::Null)
}

async fn change_password(Json(body): Json<Value>) -> Response {
    if body["current_password"] == PASSWORD {
        success(Value::Null)
    } else {
        failure(StatusCode::BAD_REQUEST, "Current password is incorrect")
    }
}

impl MockShop {
    /// Start the mock API on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let api = Router::new()
            .route("/auth", post(auth))
            .route("/categories", get(categories))
            .route("/banners", get(banners))
            .route("/products", get(product_list))
            .route("/products/{id}", get(product))
            .route("/orders", get(order_list).post(place_order))
            .route("/orders/{id}", get(order_detail).put(update_order))
            .route("/users/{id}", put(update_user))
            .route("/users/change-password", post(change_password))
            .with_state(Arc::clone(&state));
        let app = Router::new().nest("/restful", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Base URL the storefront should use for the shop API.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        format!("http://{}/restful", self.addr)
    }

    /// Make `GET categories` fail until further notice.
    pub fn take_categories_down(&self) {
        self.state.categories_down.store(true, Ordering::SeqCst);
    }

    /// Inspect the recorded requests.
    pub fn recorded<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
        f(&self.state.recorded.lock().unwrap())
    }
}

// =============================================================================
// Storefront under test
// =============================================================================

/// A storefront wired to a fresh mock shop, plus a cookie-keeping client.
pub struct TestContext {
    /// Client with a cookie store that does not follow redirects.
    pub client: Client,
    pub storefront_url: String,
    pub shop: MockShop,
}

impl TestContext {
    /// Start a mock shop and a storefront using it.
    pub async fn new() -> Self {
        let shop = MockShop::start().await;
        let storefront_url = spawn_storefront(&shop).await;

        Self {
            client: client(),
            storefront_url,
            shop,
        }
    }

    /// Replace the storefront with a freshly started one, as after a
    /// redeploy. The client keeps its cookies; server memory is lost.
    pub async fn restart_storefront(&mut self) {
        self.storefront_url = spawn_storefront(&self.shop).await;
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    /// GET a storefront page.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// GET a page and return its body.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.text().await.unwrap()
    }

    /// POST a form to the storefront.
    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Log in as the mock customer.
    pub async fn login(&self) -> reqwest::Response {
        let response = self
            .post("/login", &[("username", USERNAME), ("password", PASSWORD)])
            .await;
        assert_eq!(location(&response), "/profile");
        response
    }

    /// Put `quantity` units of a product (and optional variant) in the cart.
    pub async fn add_to_cart(&self, product_id: &str, variant_id: &str, quantity: &str) {
        let response = self
            .post(
                "/cart/add",
                &[
                    ("product_id", product_id),
                    ("variant_id", variant_id),
                    ("quantity", quantity),
                ],
            )
            .await;
        assert_eq!(response.status(), 303);
    }
}

/// Serve a new storefront instance backed by `shop`; returns its base URL.
async fn spawn_storefront(shop: &MockShop) -> String {
    let api_base_url = shop.api_base_url();

    // Catalogue caching off so tests can change the mock mid-test
    let config = StorefrontConfig::from_lookup(|key| match key {
        "AETHER_API_BASE_URL" => Some(api_base_url.clone()),
        "AETHER_API_CACHE_TTL_SECS" => Some("0".to_string()),
        "AETHER_API_TIMEOUT_SECS" => Some("2".to_string()),
        _ => None,
    })
    .unwrap();
    let state = AppState::new(config).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, aether_storefront::app(state))
            .await
            .unwrap();
    });

    format!("http://{addr}")
}

/// Client with a cookie store that leaves redirects to the test.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Value of the `auth_data` cookie set by a response, if any.
#[must_use]
pub fn auth_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("auth_data="))
        .and_then(|v| v.split(';').next())
        .map(String::from)
}
