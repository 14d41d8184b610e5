//! Pagination contract tests for the list operations.

mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use payment_service::models::Payment;
use payment_service::services::repository::PaymentStore;

/// Seed `count` payments for `customer_email` with strictly increasing
/// creation times so ordering assertions are deterministic.
async fn seed_payments(app: &TestApp, customer_email: &str, count: i64) -> Vec<Payment> {
    let base = Utc::now();
    let mut seeded = Vec::new();
    for i in 0..count {
        let mut payment = Payment::new(
            10.0 + i as f64,
            "USD".to_string(),
            customer_email.to_string(),
            format!("order {}", i),
        );
        payment.created_at = base + Duration::seconds(i);
        payment.updated_at = payment.created_at;
        app.payment_store.create(&payment).await.unwrap();
        seeded.push(payment);
    }
    seeded
}

#[tokio::test]
async fn out_of_range_page_and_limit_fall_back_to_defaults() {
    let app = TestApp::spawn();
    seed_payments(&app, "a@x.com", 3).await;

    // page 0 behaves as page 1, limit 500 behaves as limit 10.
    let (records, total) = app.payments.list(Some("a@x.com"), 0, 500).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(total, 3);
}

#[tokio::test]
async fn limit_caps_page_size_and_total_counts_all_matches() {
    let app = TestApp::spawn();
    seed_payments(&app, "a@x.com", 12).await;

    let (page_one, total) = app.payments.list(Some("a@x.com"), 1, 0).await.unwrap();
    assert_eq!(page_one.len(), 10); // limit 0 clamps to the default 10
    assert_eq!(total, 12);

    let (page_two, total) = app.payments.list(Some("a@x.com"), 2, 0).await.unwrap();
    assert_eq!(page_two.len(), 2);
    assert_eq!(total, 12);

    let (page_three, _) = app.payments.list(Some("a@x.com"), 3, 0).await.unwrap();
    assert!(page_three.is_empty());
}

#[tokio::test]
async fn records_are_ordered_by_creation_descending() {
    let app = TestApp::spawn();
    let seeded = seed_payments(&app, "a@x.com", 5).await;

    let (records, _) = app.payments.list(Some("a@x.com"), 1, 100).await.unwrap();

    let newest_first: Vec<_> = seeded.iter().rev().map(|p| p.id).collect();
    let listed: Vec<_> = records.iter().map(|p| p.id).collect();
    assert_eq!(listed, newest_first);
}

#[tokio::test]
async fn customer_filter_is_exact_and_empty_means_all() {
    let app = TestApp::spawn();
    seed_payments(&app, "a@x.com", 2).await;
    seed_payments(&app, "b@y.com", 3).await;

    let (records, total) = app.payments.list(Some("a@x.com"), 1, 10).await.unwrap();
    assert_eq!(total, 2);
    assert!(records.iter().all(|p| p.customer_email == "a@x.com"));

    let (_, total_all) = app.payments.list(None, 1, 10).await.unwrap();
    assert_eq!(total_all, 5);

    // Empty string is the "no filter" sentinel the wire layer may pass.
    let (_, total_empty) = app.payments.list(Some(""), 1, 10).await.unwrap();
    assert_eq!(total_empty, 5);
}

#[tokio::test]
async fn subscription_list_shares_the_pagination_contract() {
    let app = TestApp::spawn();
    for i in 0..3 {
        let subscription = payment_service::models::Subscription::new(
            "b@y.com".to_string(),
            format!("Plan {}", i),
            9.99,
            "USD".to_string(),
        );
        let payment = subscription.initial_payment();
        payment_service::services::repository::SubscriptionStore::create_with_payment(
            app.subscription_store.as_ref(),
            &subscription,
            &payment,
        )
        .await
        .unwrap();
    }

    let (records, total) = app.subscriptions.list(Some("b@y.com"), 0, 500).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(total, 3);
}
