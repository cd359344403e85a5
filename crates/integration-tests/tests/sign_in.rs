//! Integration tests for the sign-in, sign-out and password reset flows.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use shopfront_client::auth::{request_password_reset, reset_password, sign_in, sign_out};
use shopfront_client::guard::{NavLink, navigate};
use shopfront_client::storage::{MemoryBackend, keys};
use shopfront_client::{ApiError, Navigation, Route, ShopContext, StorageArea};
use shopfront_core::{Role, SessionState};
use shopfront_integration_tests::{FakeBackend, PASSWORD, RESET_TOKEN};

#[tokio::test]
async fn test_sign_in_stores_token_and_role() {
    let backend = FakeBackend::start().await;
    let tab = StorageArea::in_memory().open_tab();
    let api = backend.client(tab.clone());
    let ctx = ShopContext::open(tab.clone()).unwrap();

    let state = sign_in(&api, &ctx, "seller@shop.test", PASSWORD).await.unwrap();
    assert_eq!(state.active_role(), Some(Role::Seller));
    assert_eq!(
        tab.get_item(keys::TOKEN).unwrap().as_deref(),
        Some("token:seller@shop.test")
    );
    assert_eq!(
        navigate("/dashboard/products", &ctx.session().snapshot()),
        Navigation::Render(Route::DashboardProducts)
    );
    assert!(ctx.nav_menu().links.contains(&NavLink::Route(Route::DashboardOverview)));

    // Authorized calls now succeed.
    assert_eq!(api.my_products().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_role_means_user() {
    let backend = FakeBackend::start().await;
    let tab = StorageArea::in_memory().open_tab();
    let api = backend.client(tab.clone());
    let ctx = ShopContext::open(tab).unwrap();

    let state = sign_in(&api, &ctx, "user@shop.test", PASSWORD).await.unwrap();
    assert_eq!(state.role_name(), "user");
    assert!(ctx.nav_menu().links.contains(&NavLink::Route(Route::Profile)));
}

#[tokio::test]
async fn test_wrong_password_leaves_session_untouched() {
    let backend = FakeBackend::start().await;
    let tab = StorageArea::in_memory().open_tab();
    let api = backend.client(tab.clone());
    let ctx = ShopContext::open(tab.clone()).unwrap();

    let err = sign_in(&api, &ctx, "admin@shop.test", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(ctx.session().snapshot(), SessionState::LOGGED_OUT);
    assert_eq!(tab.get_item(keys::TOKEN).unwrap(), None);
}

#[tokio::test]
async fn test_unknown_backend_role_is_rejected() {
    let backend = FakeBackend::start().await;
    let tab = StorageArea::in_memory().open_tab();
    let api = backend.client(tab.clone());
    let ctx = ShopContext::open(tab.clone()).unwrap();

    let err = sign_in(&api, &ctx, "ghost@shop.test", PASSWORD).await.unwrap_err();
    assert!(matches!(err, ApiError::UnknownRole(role) if role == "superuser"));
    assert!(!ctx.session().snapshot().is_logged_in());
    assert_eq!(tab.get_item(keys::TOKEN).unwrap(), None);
}

#[tokio::test]
async fn test_sign_out_propagates_to_other_tabs() {
    let backend = FakeBackend::start().await;
    let area = StorageArea::in_memory();
    let first_tab = area.open_tab();
    let api = backend.client(first_tab.clone());
    let first = ShopContext::open(first_tab).unwrap();
    let second = ShopContext::open(area.open_tab()).unwrap();
    let mut rx = second.session().subscribe();

    sign_in(&api, &first, "admin@shop.test", PASSWORD).await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| state.active_role() == Some(Role::Admin)),
    )
    .await
    .unwrap()
    .unwrap();

    sign_out(&api, &first).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| *state == SessionState::LOGGED_OUT),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(matches!(api.products().await.unwrap_err(), ApiError::MissingToken));
}

#[tokio::test]
async fn test_failed_session_write_leaves_no_token() {
    let backend = FakeBackend::start().await;
    // Room for the token, not for the login flag after it.
    let area = StorageArea::new(MemoryBackend::with_quota(30));
    let tab = area.open_tab();
    let api = backend.client(tab.clone());
    let ctx = ShopContext::open(tab.clone()).unwrap();

    let err = sign_in(&api, &ctx, "user@shop.test", PASSWORD).await.unwrap_err();
    assert!(matches!(err, ApiError::Storage(_)));
    assert_eq!(tab.get_item(keys::TOKEN).unwrap(), None);
    assert_eq!(ctx.session().snapshot(), SessionState::LOGGED_OUT);
    assert!(matches!(api.products().await.unwrap_err(), ApiError::MissingToken));
}

#[tokio::test]
async fn test_catalog_cache_does_not_outlive_the_account() {
    let backend = FakeBackend::start().await;
    let tab = StorageArea::in_memory().open_tab();
    let api = backend.client(tab.clone());
    let ctx = ShopContext::open(tab).unwrap();

    sign_in(&api, &ctx, "seller@shop.test", PASSWORD).await.unwrap();
    api.products().await.unwrap();
    api.products().await.unwrap();
    assert_eq!(backend.product_list_hits(), 1);

    sign_out(&api, &ctx).unwrap();
    sign_in(&api, &ctx, "user@shop.test", PASSWORD).await.unwrap();
    api.products().await.unwrap();
    assert_eq!(backend.product_list_hits(), 2);

    // Switching accounts without signing out drops the cache too.
    sign_in(&api, &ctx, "admin@shop.test", PASSWORD).await.unwrap();
    api.products().await.unwrap();
    assert_eq!(backend.product_list_hits(), 3);
}

// =============================================================================
// Password reset
// =============================================================================

#[tokio::test]
async fn test_forgot_password_returns_backend_message() {
    let backend = FakeBackend::start().await;
    let api = backend.client(StorageArea::in_memory().open_tab());

    let message = request_password_reset(&api, "user@shop.test").await.unwrap();
    assert_eq!(message.as_deref(), Some("Password reset link sent"));

    let err = request_password_reset(&api, "nobody@shop.test").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(m) if m == "User not found"));
}

#[tokio::test]
async fn test_reset_password_with_link_token() {
    let backend = FakeBackend::start().await;
    let api = backend.client(StorageArea::in_memory().open_tab());

    let message = reset_password(&api, RESET_TOKEN, "correct horse").await.unwrap();
    assert_eq!(message.as_deref(), Some("Password reset successful"));

    let err = reset_password(&api, "expired", "correct horse").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
}
