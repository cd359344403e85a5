//! Integration tests for the Shopfront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cross_tab_sync` - Several tabs and processes sharing one storage area
//! - `api_client` - REST client against an in-process fake backend
//! - `sign_in` - Sign-in, sign-out and password reset flows end to end
//! - `checkout` - Emptying the cart on a confirmed payment
//!
//! Nothing external is required: the backend is an axum router bound to an
//! ephemeral local port.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use shopfront_client::{ApiClient, ClientConfig, Tab};

/// Password accepted for every seeded account.
pub const PASSWORD: &str = "hunter2";

/// Seeded accounts: email and the role the backend reports for it.
pub const ACCOUNTS: &[(&str, Option<&str>)] = &[
    ("user@shop.test", None),
    ("seller@shop.test", Some("seller")),
    ("admin@shop.test", Some("admin")),
    ("ghost@shop.test", Some("superuser")),
];

/// Reset token the backend accepts.
pub const RESET_TOKEN: &str = "reset-ok";

/// Seeded payments: id and status.
pub const PAYMENTS: &[(&str, &str)] = &[("pay_paid", "paid"), ("pay_pending", "pending")];

/// A running fake backend.
pub struct FakeBackend {
    pub url: String,
    state: Arc<BackendState>,
}

#[derive(Default)]
struct BackendState {
    products: Mutex<Vec<Value>>,
    categories: Mutex<Vec<Value>>,
    product_list_hits: AtomicUsize,
    category_list_hits: AtomicUsize,
    next_id: AtomicUsize,
}

impl BackendState {
    fn products(&self) -> std::sync::MutexGuard<'_, Vec<Value>> {
        self.products.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn categories(&self) -> std::sync::MutexGuard<'_, Vec<Value>> {
        self.categories.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FakeBackend {
    /// Start a backend seeded with two products on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        state.products().extend([
            json!({
                "_id": "p1",
                "name": "Tomato",
                "price": 10.0,
                "quantity": 40,
                "imageUrl": "uploads/tomato.jpg",
                "category": { "_id": "c1", "name": "Vegetables" },
                "display": true
            }),
            json!({
                "_id": "p2",
                "name": "Basil",
                "price": 7.5,
                "quantity": 3,
                "category": "c2",
                "display": false
            }),
        ]);
        state.categories().extend([
            json!({ "_id": "c1", "name": "Vegetables", "description": "Fresh" }),
            json!({ "_id": "c2", "name": "Herbs" }),
        ]);
        state.next_id.store(3, Ordering::Relaxed);

        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/forgot-password", post(forgot_password))
            .route("/auth/reset-password", post(reset_password))
            .route("/users/api/request-seller", post(request_seller))
            .route("/products/all", get(list_products))
            .route("/products/my-products", get(my_products))
            .route("/products", post(create_product))
            .route("/products/{id}", put(update_product).delete(delete_product))
            .route("/categories", get(list_categories).post(create_category))
            .route(
                "/categories/{id}",
                put(update_category).delete(delete_category),
            )
            .route("/payments/{id}", get(payment))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind fake backend: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("fake backend has no address: {e}"));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the backend URL is rejected, which cannot happen for a
    /// loopback address.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_api_url(&self.url)
            .unwrap_or_else(|e| panic!("fake backend URL rejected: {e}"))
    }

    /// API client reading its token from `tab`.
    #[must_use]
    pub fn client(&self, tab: Tab) -> ApiClient {
        ApiClient::new(&self.config(), tab)
    }

    /// How many times the product list endpoint has been served.
    #[must_use]
    pub fn product_list_hits(&self) -> usize {
        self.state.product_list_hits.load(Ordering::Relaxed)
    }

    /// How many times the category list endpoint has been served.
    #[must_use]
    pub fn category_list_hits(&self) -> usize {
        self.state.category_list_hits.load(Ordering::Relaxed)
    }
}

fn token_for(email: &str) -> String {
    format!("token:{email}")
}

/// Email of the account a bearer token belongs to.
fn bearer(headers: &HeaderMap) -> Option<&'static str> {
    let token = headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    ACCOUNTS
        .iter()
        .map(|(email, _)| *email)
        .find(|email| token_for(email) == token)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(Json(body): Json<Credentials>) -> Response {
    let account = ACCOUNTS
        .iter()
        .find(|(email, _)| *email == body.email)
        .filter(|_| body.password == PASSWORD);

    match account {
        Some((email, role)) => {
            let mut response = json!({ "access_token": token_for(email), "status": "active" });
            if let Some(role) = role {
                response["role"] = json!(role);
            }
            (StatusCode::CREATED, Json(response)).into_response()
        }
        None => error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    let taken = body["email"]
        .as_str()
        .is_some_and(|email| ACCOUNTS.iter().any(|(known, _)| *known == email));
    if taken {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": ["email already registered"] })),
        )
            .into_response();
    }
    StatusCode::CREATED.into_response()
}

async fn request_seller(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(email) => Json(json!({ "email": email, "requested": true })).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "Unauthorized"),
    }
}

async fn list_products(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if bearer(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    state.product_list_hits.fetch_add(1, Ordering::Relaxed);
    Json(state.products().clone()).into_response()
}

async fn my_products(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some("seller@shop.test" | "admin@shop.test") => {
            Json(state.products().clone()).into_response()
        }
        Some(_) => error(StatusCode::FORBIDDEN, "Forbidden"),
        None => error(StatusCode::UNAUTHORIZED, "Unauthorized"),
    }
}

async fn list_categories(State(state): State<Arc<BackendState>>) -> Json<Value> {
    state.category_list_hits.fetch_add(1, Ordering::Relaxed);
    Json(Value::Array(state.categories().clone()))
}

async fn create_category(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if bearer(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let id = state.next_id.fetch_add(1, Ordering::Relaxed);
    body["_id"] = json!(format!("c{id}"));
    state.categories().push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_category(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(changes): Json<HashMap<String, Value>>,
) -> Response {
    if bearer(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut categories = state.categories();
    let Some(category) = categories.iter_mut().find(|c| c["_id"] == id.as_str()) else {
        return error(StatusCode::NOT_FOUND, "Category not found");
    };
    for (field, value) in changes {
        category[field] = value;
    }
    Json(category.clone()).into_response()
}

async fn delete_category(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if bearer(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut categories = state.categories();
    let before = categories.len();
    categories.retain(|c| c["_id"] != id.as_str());
    if categories.len() == before {
        return error(StatusCode::NOT_FOUND, "Category not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn forgot_password(Json(body): Json<Value>) -> Response {
    let known = body["email"]
        .as_str()
        .is_some_and(|email| ACCOUNTS.iter().any(|(known, _)| *known == email));
    if !known {
        return error(StatusCode::NOT_FOUND, "User not found");
    }
    Json(json!({ "message": "Password reset link sent" })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordReset {
    token: String,
    new_password: String,
}

async fn reset_password(Json(body): Json<PasswordReset>) -> Response {
    if body.token != RESET_TOKEN || body.new_password.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Invalid or expired token");
    }
    Json(json!({ "message": "Password reset successful" })).into_response()
}

async fn payment(Path(id): Path<String>) -> Response {
    match PAYMENTS.iter().find(|(known, _)| *known == id) {
        Some((id, status)) => Json(json!({ "_id": id, "status": status })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Payment not found"),
    }
}

async fn create_product(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if bearer(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let id = state.next_id.fetch_add(1, Ordering::Relaxed);
    body["_id"] = json!(format!("p{id}"));
    state.products().push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_product(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(changes): Json<HashMap<String, Value>>,
) -> Response {
    if bearer(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut products = state.products();
    let Some(product) = products.iter_mut().find(|p| p["_id"] == id.as_str()) else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };
    for (field, value) in changes {
        product[field] = value;
    }
    Json(product.clone()).into_response()
}

async fn delete_product(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if bearer(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut products = state.products();
    let before = products.len();
    products.retain(|p| p["_id"] != id.as_str());
    if products.len() == before {
        return error(StatusCode::NOT_FOUND, "Product not found");
    }
    StatusCode::NO_CONTENT.into_response()
}
