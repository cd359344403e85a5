//! Integration tests for the REST client against the fake backend.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use shopfront_client::api::{CategoryInput, ProductInput};
use shopfront_client::storage::keys;
use shopfront_client::{ApiError, StorageArea};
use shopfront_core::{CategoryId, ProductId, ProductStats};
use shopfront_integration_tests::FakeBackend;

fn signed_in_tab(email: &str) -> shopfront_client::Tab {
    let tab = StorageArea::in_memory().open_tab();
    tab.set_item(keys::TOKEN, &format!("token:{email}")).unwrap();
    tab
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_products_require_token() {
    let backend = FakeBackend::start().await;
    let api = backend.client(StorageArea::in_memory().open_tab());

    let err = api.products().await.unwrap_err();
    assert!(matches!(err, ApiError::MissingToken));
    assert_eq!(backend.product_list_hits(), 0);
}

#[tokio::test]
async fn test_products_decode_and_cache() {
    let backend = FakeBackend::start().await;
    let api = backend.client(signed_in_tab("user@shop.test"));

    let products = api.products().await.unwrap();
    assert_eq!(products.len(), 2);
    let tomato = &products[0];
    assert_eq!(tomato.id, ProductId::new("p1"));
    assert_eq!(tomato.price, Decimal::from(10));
    assert_eq!(tomato.category.as_ref().unwrap().id().as_str(), "c1");
    assert_eq!(products[1].category.as_ref().unwrap().id().as_str(), "c2");
    assert!(!products[1].display);

    api.products().await.unwrap();
    assert_eq!(backend.product_list_hits(), 1);
}

#[tokio::test]
async fn test_product_stats_from_catalog() {
    let backend = FakeBackend::start().await;
    let api = backend.client(signed_in_tab("admin@shop.test"));

    let stats = ProductStats::from_products(&api.products().await.unwrap());
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.top_selling, 0);
    assert_eq!(stats.low_stock, 1);
    // 10 * 40 + 7.5 * 3
    assert_eq!(stats.total_revenue, Decimal::new(4225, 1));
}

#[tokio::test]
async fn test_categories_are_public() {
    let backend = FakeBackend::start().await;
    let api = backend.client(StorageArea::in_memory().open_tab());

    let categories = api.categories().await.unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].name, "Vegetables");
    assert_eq!(categories[1].description, None);
}

#[tokio::test]
async fn test_mutations_invalidate_cache() {
    let backend = FakeBackend::start().await;
    let api = backend.client(signed_in_tab("seller@shop.test"));
    assert_eq!(api.products().await.unwrap().len(), 2);

    let created = api
        .create_product(&ProductInput {
            name: Some("Leek".to_string()),
            price: Some(Decimal::new(425, 2)),
            quantity: Some(12),
            ..ProductInput::default()
        })
        .await
        .unwrap();
    assert_eq!(created.name, "Leek");
    assert_eq!(created.price, Decimal::new(425, 2));
    assert_eq!(api.products().await.unwrap().len(), 3);

    let hidden = api.set_product_display(&created.id, false).await.unwrap();
    assert!(!hidden.display);

    api.delete_product(&created.id).await.unwrap();
    assert_eq!(api.products().await.unwrap().len(), 2);
    assert_eq!(backend.product_list_hits(), 3);
}

#[tokio::test]
async fn test_category_crud_invalidates_cache() {
    let backend = FakeBackend::start().await;
    let api = backend.client(signed_in_tab("admin@shop.test"));
    assert_eq!(api.categories().await.unwrap().len(), 2);

    let created = api
        .create_category(&CategoryInput::named("Fruit"))
        .await
        .unwrap();
    assert_eq!(created.name, "Fruit");
    assert_eq!(api.categories().await.unwrap().len(), 3);

    let renamed = api
        .update_category(&created.id, &CategoryInput::named("Berries"))
        .await
        .unwrap();
    assert_eq!(renamed.id, created.id);
    let categories = api.categories().await.unwrap();
    assert!(categories.iter().any(|c| c.name == "Berries"));

    api.delete_category(&created.id).await.unwrap();
    assert_eq!(api.categories().await.unwrap().len(), 2);
    api.categories().await.unwrap();
    assert_eq!(backend.category_list_hits(), 4);
}

#[tokio::test]
async fn test_category_mutations_require_token() {
    let backend = FakeBackend::start().await;
    let api = backend.client(StorageArea::in_memory().open_tab());

    let err = api
        .create_category(&CategoryInput::named("Fruit"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingToken));
    let err = api.delete_category(&CategoryId::new("c1")).await.unwrap_err();
    assert!(matches!(err, ApiError::MissingToken));
    assert_eq!(api.categories().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_product_maps_to_not_found() {
    let backend = FakeBackend::start().await;
    let api = backend.client(signed_in_tab("seller@shop.test"));

    let err = api.delete_product(&ProductId::new("nope")).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(message) if message == "Product not found"));
}

#[tokio::test]
async fn test_my_products_forbidden_for_plain_user() {
    let backend = FakeBackend::start().await;

    let api = backend.client(signed_in_tab("user@shop.test"));
    assert!(matches!(
        api.my_products().await.unwrap_err(),
        ApiError::Forbidden
    ));

    let api = backend.client(signed_in_tab("seller@shop.test"));
    assert_eq!(api.my_products().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_token_is_read_on_every_call() {
    let backend = FakeBackend::start().await;
    let area = StorageArea::in_memory();
    let api = backend.client(area.open_tab());
    assert!(matches!(
        api.request_seller().await.unwrap_err(),
        ApiError::MissingToken
    ));

    // Another tab logs in; this client picks the token up without rebuilding.
    area.open_tab()
        .set_item(keys::TOKEN, "token:user@shop.test")
        .unwrap();
    let body = api.request_seller().await.unwrap();
    assert_eq!(body["requested"], true);
}

// ============================================================================
// Payments
// ============================================================================

#[tokio::test]
async fn test_payment_status_is_public() {
    let backend = FakeBackend::start().await;
    let api = backend.client(StorageArea::in_memory().open_tab());

    assert!(api.payment_status("pay_paid").await.unwrap().is_paid());
    let pending = api.payment_status("pay_pending").await.unwrap();
    assert!(!pending.is_paid());
    assert_eq!(pending.status, "pending");
    assert!(matches!(
        api.payment_status("pay_unknown").await.unwrap_err(),
        ApiError::NotFound(_)
    ));
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_register() {
    let backend = FakeBackend::start().await;
    let api = backend.client(StorageArea::in_memory().open_tab());
    let mut request = shopfront_client::api::RegisterRequest {
        name: "Ada".to_string(),
        lastname: "Lovelace".to_string(),
        email: "ada@shop.test".to_string(),
        password: "engine".to_string(),
    };

    api.register(&request).await.unwrap();

    request.email = "user@shop.test".to_string();
    let err = api.register(&request).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Status { status: 400, message } if message == "email already registered"
    ));
}
