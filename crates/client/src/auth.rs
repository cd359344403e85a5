//! Sign-in, sign-out and password reset flows.
//!
//! The session store itself never talks to the network. These flows sit on
//! top: they call the backend, persist the bearer token under
//! [`keys::TOKEN`], and then update the session.

use secrecy::ExposeSecret;
use shopfront_core::{Role, SessionState};
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, ApiError, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest};
use crate::context::ShopContext;
use crate::storage::keys;

/// Shortest password the reset form accepts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Log in with email and password.
///
/// A missing role in the backend response means a plain user. Cached catalog
/// responses from any previous account are dropped.
///
/// # Errors
///
/// Returns [`ApiError::InvalidInput`] for blank credentials,
/// [`ApiError::Unauthorized`] for rejected ones, [`ApiError::UnknownRole`]
/// if the backend reports a role this client cannot gate on, or a storage
/// error if the session cannot be persisted. On any error no token is left
/// in storage.
#[instrument(skip(api, ctx, password))]
pub async fn sign_in(
    api: &ApiClient,
    ctx: &ShopContext,
    email: &str,
    password: &str,
) -> Result<SessionState, ApiError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::InvalidInput(
            "email and password are required".to_string(),
        ));
    }

    let response = api
        .login(&LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        })
        .await?;

    let role = match response.role.as_deref() {
        None | Some("") => None,
        Some(name) => Some(
            name.parse::<Role>()
                .map_err(|_| ApiError::UnknownRole(name.to_owned()))?,
        ),
    };

    api.clear_cache();
    ctx.tab()
        .set_item(keys::TOKEN, response.access_token.expose_secret())?;
    let state = match ctx.session().login(role) {
        Ok(state) => state,
        Err(e) => {
            if let Err(cleanup) = ctx.tab().remove_item(keys::TOKEN) {
                warn!(error = %cleanup, "Failed to remove token after failed sign-in");
            }
            return Err(e.into());
        }
    };
    info!(role = state.role_name(), "Signed in");
    Ok(state)
}

/// Log out, forget the bearer token and drop cached catalog responses.
///
/// # Errors
///
/// Returns a storage error if storage cannot be modified.
#[instrument(skip(api, ctx))]
pub fn sign_out(api: &ApiClient, ctx: &ShopContext) -> Result<(), ApiError> {
    api.clear_cache();
    ctx.session().logout()?;
    ctx.tab().remove_item(keys::TOKEN)?;
    Ok(())
}

/// Ask the backend to email a reset link to `email`.
///
/// Returns the backend's acknowledgement message, if any.
///
/// # Errors
///
/// Returns [`ApiError::InvalidInput`] for an address without `@`, or an
/// error if the backend rejects the request.
#[instrument(skip(api))]
pub async fn request_password_reset(
    api: &ApiClient,
    email: &str,
) -> Result<Option<String>, ApiError> {
    let email = email.trim();
    if !email.contains('@') {
        return Err(ApiError::InvalidInput(format!(
            "invalid email address {email:?}"
        )));
    }
    api.forgot_password(&ForgotPasswordRequest {
        email: email.to_owned(),
    })
    .await
}

/// Set a new password with the token from a reset link.
///
/// # Errors
///
/// Returns [`ApiError::InvalidInput`] for a missing token or a password
/// shorter than [`MIN_PASSWORD_LEN`], or an error if the backend rejects
/// the token.
#[instrument(skip(api, token, new_password))]
pub async fn reset_password(
    api: &ApiClient,
    token: &str,
    new_password: &str,
) -> Result<Option<String>, ApiError> {
    if token.trim().is_empty() {
        return Err(ApiError::InvalidInput("reset token is missing".to_string()));
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    api.reset_password(&ResetPasswordRequest {
        token: token.to_owned(),
        new_password: new_password.to_owned(),
    })
    .await
}
