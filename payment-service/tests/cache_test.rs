//! Cache contract and cache-aside read tests.

mod common;

use common::TestApp;
use payment_service::models::Payment;
use payment_service::services::cache::{payment_cache_key, subscription_cache_key};
use payment_service::services::{InMemoryCache, RecordCache};
use std::time::Duration;
use uuid::Uuid;

fn sample_payment() -> Payment {
    Payment::new(
        42.0,
        "USD".to_string(),
        "a@x.com".to_string(),
        "widget".to_string(),
    )
}

#[tokio::test]
async fn set_then_get_returns_the_value_until_ttl_elapses() {
    let cache = InMemoryCache::<Payment>::new();
    let payment = sample_payment();
    let key = payment_cache_key(payment.id);

    cache
        .set(&key, &payment, Duration::from_millis(50))
        .await
        .unwrap();

    let hit = cache.get(&key).await.unwrap().unwrap();
    assert_eq!(hit.id, payment.id);
    assert_eq!(hit.amount, payment.amount);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(cache.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_evicts_the_entry() {
    let cache = InMemoryCache::<Payment>::new();
    let payment = sample_payment();
    let key = payment_cache_key(payment.id);

    cache
        .set(&key, &payment, Duration::from_secs(60))
        .await
        .unwrap();
    cache.delete(&key).await.unwrap();

    assert!(cache.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn cache_keys_are_prefixed_per_record_type() {
    let id = Uuid::new_v4();
    assert_eq!(payment_cache_key(id), format!("payment:{}", id));
    assert_eq!(subscription_cache_key(id), format!("subscription:{}", id));
}

#[tokio::test]
async fn get_status_repopulates_the_cache_on_miss() {
    let app = TestApp::spawn();
    let payment = app.initiate("a@x.com").await;
    let key = payment_cache_key(payment.id);

    // Drop the snapshot written by initiate, then read through.
    app.payment_cache.delete(&key).await.unwrap();
    assert!(app.payment_cache.get(&key).await.unwrap().is_none());

    let fetched = app.payments.get_status(payment.id).await.unwrap();
    assert_eq!(fetched.id, payment.id);

    let repopulated = app.payment_cache.get(&key).await.unwrap();
    assert!(repopulated.is_some());
}

#[tokio::test]
async fn cached_snapshot_serves_reads_without_the_store() {
    let app = TestApp::spawn();
    let payment = app.initiate("a@x.com").await;

    // Remove the record from the store; the snapshot still answers.
    use payment_service::services::repository::PaymentStore;
    app.payment_store.delete(payment.id).await.unwrap();

    let cached = app.payments.get_status(payment.id).await.unwrap();
    assert_eq!(cached.id, payment.id);
}
