//! Subscription lifecycle integration tests.

mod common;

use chrono::Months;
use common::TestApp;
use payment_service::dtos::CreateSubscription;
use payment_service::models::{PaymentStatus, SubscriptionStatus};
use payment_service::services::email::MailKind;
use payment_service::services::{MockMailer, RecordingPublisher};
use std::sync::Arc;
use uuid::Uuid;

fn premium_request(customer_email: &str) -> CreateSubscription {
    CreateSubscription {
        customer_email: customer_email.to_string(),
        plan_name: "Premium".to_string(),
        price: 19.99,
        currency: "USD".to_string(),
    }
}

#[tokio::test]
async fn create_starts_active_for_one_month() {
    let app = TestApp::spawn();

    let subscription = app
        .subscriptions
        .create(premium_request("b@y.com"))
        .await
        .unwrap();

    assert!(!subscription.id.is_nil());
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert_eq!(
        subscription.end_date,
        subscription.start_date + Months::new(1)
    );
}

#[tokio::test]
async fn create_persists_exactly_one_linked_pending_payment() {
    let app = TestApp::spawn();

    let subscription = app
        .subscriptions
        .create(premium_request("b@y.com"))
        .await
        .unwrap();

    let linked = app.subscription_store.linked_payments();
    assert_eq!(linked.len(), 1);

    let payment = &linked[0];
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, subscription.price);
    assert_eq!(payment.currency, subscription.currency);
    assert_eq!(payment.customer_email, subscription.customer_email);
    assert!(payment.description.contains("Premium"));
}

#[tokio::test]
async fn cancel_then_renew_is_invalid_transition() {
    let app = TestApp::spawn();
    let subscription = app
        .subscriptions
        .create(premium_request("b@y.com"))
        .await
        .unwrap();

    let cancelled = app.subscriptions.cancel(subscription.id).await.unwrap();
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    assert_eq!(app.mailer.count_of(MailKind::Cancellation), 1);

    let err = app.subscriptions.renew(subscription.id).await.unwrap_err();
    assert_eq!(err.code(), "invalid-transition");

    // Cancelled is terminal for cancel as well.
    assert_eq!(
        app.subscriptions
            .cancel(subscription.id)
            .await
            .unwrap_err()
            .code(),
        "invalid-transition"
    );
}

#[tokio::test]
async fn renew_extends_active_subscription() {
    let app = TestApp::spawn();
    let subscription = app
        .subscriptions
        .create(premium_request("b@y.com"))
        .await
        .unwrap();

    let renewed = app.subscriptions.renew(subscription.id).await.unwrap();

    assert_eq!(renewed.status, SubscriptionStatus::Active);
    assert!(renewed.start_date >= subscription.start_date);
    assert_eq!(renewed.end_date, renewed.start_date + Months::new(1));
    assert_eq!(app.mailer.count_of(MailKind::Renewal), 1);
}

#[tokio::test]
async fn get_is_cache_aside_and_not_found_when_absent() {
    let app = TestApp::spawn();
    let subscription = app
        .subscriptions
        .create(premium_request("b@y.com"))
        .await
        .unwrap();

    let fetched = app.subscriptions.get(subscription.id).await.unwrap();
    assert_eq!(fetched.id, subscription.id);

    let err = app.subscriptions.get(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code(), "not-found");
}

#[tokio::test]
async fn cancel_survives_failing_mailer() {
    let app = TestApp::spawn_with(
        Arc::new(MockMailer::failing()),
        Arc::new(RecordingPublisher::new()),
        false,
    );
    let subscription = app
        .subscriptions
        .create(premium_request("b@y.com"))
        .await
        .unwrap();

    let cancelled = app.subscriptions.cancel(subscription.id).await.unwrap();

    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let app = TestApp::spawn();

    let err = app
        .subscriptions
        .create(CreateSubscription {
            customer_email: "b@y.com".to_string(),
            plan_name: "".to_string(),
            price: 19.99,
            currency: "USD".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), "validation-failed");
}
