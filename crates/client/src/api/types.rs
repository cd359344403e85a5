//! Request and response bodies for the REST backend.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use shopfront_core::CategoryId;

/// Credentials posted to `/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful `/auth/login` response.
///
/// Implements `Debug` manually to redact the token.
pub struct LoginResponse {
    pub access_token: SecretString,
    /// Role name; absent for plain users on older backends.
    pub role: Option<String>,
    pub status: Option<String>,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &"[REDACTED]")
            .field("role", &self.role)
            .field("status", &self.status)
            .finish()
    }
}

/// Wire form of [`LoginResponse`].
#[derive(Deserialize)]
pub(crate) struct RawLoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<RawLoginResponse> for LoginResponse {
    fn from(raw: RawLoginResponse) -> Self {
        Self {
            access_token: SecretString::from(raw.access_token),
            role: raw.role,
            status: raw.status,
        }
    }
}

/// New account posted to `/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

/// Product fields sent when creating or editing a product.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,
}

/// Category fields sent when creating or renaming a category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryInput {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Body posted to `/auth/forgot-password`.
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body posted to `/auth/reset-password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Token from the emailed reset link
    pub token: String,
    pub new_password: String,
}

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Payment record from `/payments/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub status: String,
}

impl Payment {
    /// Status the payment provider reports once funds are captured.
    pub const PAID: &'static str = "paid";

    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status == Self::PAID
    }
}

/// Error body shape used by the backend (`{"message": ...}`).
#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    pub message: MessageField,
}

/// The backend sends either one message or a list of validation messages.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum MessageField {
    One(String),
    Many(Vec<String>),
}

impl MessageField {
    pub fn into_string(self) -> String {
        match self {
            Self::One(message) => message,
            Self::Many(messages) => messages.join("; "),
        }
    }
}
