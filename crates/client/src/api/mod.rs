//! REST backend client.
//!
//! The backend owns authentication, the catalog and orders; this client only
//! consumes its HTTP contract. Authenticated requests read the bearer token
//! from the tab's storage on every call, so a login in another tab applies
//! immediately.
//!
//! Catalog reads are cached with `moka`; product mutations invalidate the
//! cache.

mod cache;
pub mod types;

pub use types::{
    CategoryInput, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, Payment,
    ProductInput, RegisterRequest, ResetPasswordRequest,
};

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shopfront_core::{Category, CategoryId, Product, ProductId};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::storage::{StorageError, Tab, keys};

use cache::{CacheKey, CacheValue};
use types::{ErrorBody, RawLoginResponse};

/// Maximum number of body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credentials rejected or token expired.
    #[error("Authentication failed")]
    Unauthorized,

    /// Authenticated, but not allowed.
    #[error("Permission denied")]
    Forbidden,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// No token stored; log in first.
    #[error("Not logged in")]
    MissingToken,

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend reported a role this client does not know.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Credentials missing before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading the token from storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body).map_or_else(
            |_| body.chars().take(ERROR_BODY_LIMIT).collect(),
            |parsed| parsed.message.into_string(),
        );

        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound(message),
            _ => Self::Status {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Client for the storefront's REST backend.
///
/// Cheaply cloneable; clones share the connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    tab: Tab,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a client whose bearer token is read from `tab`.
    #[must_use]
    pub fn new(config: &ClientConfig, tab: Tab) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.catalog_ttl)
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.api_url.clone(),
                tab,
                cache,
            }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a token.
    ///
    /// Stores nothing; see [`crate::auth::sign_in`] for the full flow.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for rejected credentials, or another
    /// error if the request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let builder = self.inner.client.post(self.endpoint("auth/login")?).json(request);
        let raw: RawLoginResponse = self.send(builder).await?;
        Ok(raw.into())
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let builder = self
            .inner
            .client
            .post(self.endpoint("auth/register")?)
            .json(request);
        self.send_unit(builder).await
    }

    /// Ask the backend to email a password reset link.
    ///
    /// Returns the backend's acknowledgement message, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn forgot_password(
        &self,
        request: &ForgotPasswordRequest,
    ) -> Result<Option<String>, ApiError> {
        let builder = self
            .inner
            .client
            .post(self.endpoint("auth/forgot-password")?)
            .json(request);
        let response: MessageResponse = self.send(builder).await?;
        Ok(response.message)
    }

    /// Set a new password using the token from a reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    #[instrument(skip(self, request))]
    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<Option<String>, ApiError> {
        let builder = self
            .inner
            .client
            .post(self.endpoint("auth/reset-password")?)
            .json(request);
        let response: MessageResponse = self.send(builder).await?;
        Ok(response.message)
    }

    /// Ask for the current user to be promoted to seller.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] when logged out, or an error if the
    /// request fails.
    #[instrument(skip(self))]
    pub async fn request_seller(&self) -> Result<serde_json::Value, ApiError> {
        let builder = self
            .authorized(self.inner.client.post(self.endpoint("users/api/request-seller")?))?
            .json(&serde_json::json!({}));
        self.send(builder).await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Every product on the storefront.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] when logged out, or an error if the
    /// request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        // Checked before the cache so logged-out tabs never see the catalog.
        let builder = self.authorized(self.inner.client.get(self.endpoint("products/all")?))?;

        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products = Arc::new(self.send::<Vec<Product>>(builder).await?);
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// Products owned by the logged-in seller. Never cached.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] when logged out, or an error if the
    /// request fails.
    #[instrument(skip(self))]
    pub async fn my_products(&self) -> Result<Vec<Product>, ApiError> {
        let builder =
            self.authorized(self.inner.client.get(self.endpoint("products/my-products")?))?;
        self.send(builder).await
    }

    /// Product categories. Public.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let builder = self.inner.client.get(self.endpoint("categories")?);
        let categories = Arc::new(self.send::<Vec<Category>>(builder).await?);
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] when logged out, or an error if the
    /// request fails.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, ApiError> {
        let builder = self
            .authorized(self.inner.client.post(self.endpoint("categories")?))?
            .json(input);
        let category = self.send(builder).await?;
        self.inner.cache.invalidate(&CacheKey::Categories).await;
        Ok(category)
    }

    /// Rename or re-describe a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        id: &CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, ApiError> {
        let path = format!("categories/{id}");
        let builder = self
            .authorized(self.inner.client.put(self.endpoint(&path)?))?
            .json(input);
        let category = self.send(builder).await?;
        self.inner.cache.invalidate(&CacheKey::Categories).await;
        Ok(category)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), ApiError> {
        let path = format!("categories/{id}");
        let builder = self.authorized(self.inner.client.delete(self.endpoint(&path)?))?;
        self.send_unit(builder).await?;
        self.inner.cache.invalidate(&CacheKey::Categories).await;
        Ok(())
    }

    /// Create a product owned by the logged-in seller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, input))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        let builder = self
            .authorized(self.inner.client.post(self.endpoint("products")?))?
            .json(input);
        let product = self.send(builder).await?;
        self.inner.cache.invalidate(&CacheKey::Products).await;
        Ok(product)
    }

    /// Edit a product. Only the fields set in `input` change.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let path = format!("products/{id}");
        let builder = self
            .authorized(self.inner.client.put(self.endpoint(&path)?))?
            .json(input);
        let product = self.send(builder).await?;
        self.inner.cache.invalidate(&CacheKey::Products).await;
        Ok(product)
    }

    /// Show or hide a product on the storefront.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_product_display(
        &self,
        id: &ProductId,
        display: bool,
    ) -> Result<Product, ApiError> {
        let input = ProductInput {
            display: Some(display),
            ..ProductInput::default()
        };
        self.update_product(id, &input).await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("products/{id}");
        let builder = self.authorized(self.inner.client.delete(self.endpoint(&path)?))?;
        self.send_unit(builder).await?;
        self.inner.cache.invalidate(&CacheKey::Products).await;
        Ok(())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Look up a payment. Public, so the checkout return page works before
    /// the session is restored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidInput`] for an id that is not a plain
    /// token, [`ApiError::NotFound`] for an unknown payment, or an error if
    /// the request fails.
    #[instrument(skip(self))]
    pub async fn payment_status(&self, id: &str) -> Result<Payment, ApiError> {
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        {
            return Err(ApiError::InvalidInput(format!("bad payment id {id:?}")));
        }
        let path = format!("payments/{id}");
        let builder = self.inner.client.get(self.endpoint(&path)?);
        self.send(builder).await
    }

    /// Drop every cached catalog response.
    pub fn clear_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Public URL for a product image path as stored by the backend.
    ///
    /// Absolute URLs pass through; `uploads/<file>` paths map to the image
    /// endpoint; anything else is returned unchanged.
    #[must_use]
    pub fn image_url(&self, image: &str) -> String {
        if image.starts_with("http") {
            return image.to_owned();
        }
        if image.contains("uploads/")
            && let Some(filename) = image.rsplit('/').next().filter(|f| !f.is_empty())
            && let Ok(url) = self.endpoint(&format!("products/image/{filename}"))
        {
            return url.to_string();
        }
        image.to_owned()
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidInput(format!("bad endpoint {path}: {e}")))
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self
            .inner
            .tab
            .get_item(keys::TOKEN)?
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::MissingToken)?;
        Ok(builder.bearer_auth(token))
    }

    /// Send a request whose response body is irrelevant.
    async fn send_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        Err(ApiError::from_status(status, &body))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(
                status = %status,
                body = %body.chars().take(ERROR_BODY_LIMIT).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(ApiError::from_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(ERROR_BODY_LIMIT).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }
}
