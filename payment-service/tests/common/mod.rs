//! Test helper module for payment-service integration tests.
//!
//! Builds the lifecycle managers over the in-memory adapters and recording
//! mocks; no external store, cache, bus or mail server is required.

#![allow(dead_code)]

use payment_service::dtos::InitiatePayment;
use payment_service::models::{Payment, Subscription};
use payment_service::services::{
    cache::FailingCache, InMemoryCache, InMemoryPaymentStore, InMemorySubscriptionStore,
    InvoiceWorker, MockMailer, PaymentService, RecordCache, RecordingPublisher,
    SubscriptionService, TextInvoiceRenderer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const INVOICE_BASE_URL: &str = "https://api.example.com/invoices";

pub struct TestApp {
    pub payments: PaymentService,
    pub subscriptions: SubscriptionService,
    pub payment_store: Arc<InMemoryPaymentStore>,
    pub subscription_store: Arc<InMemorySubscriptionStore>,
    pub payment_cache: Arc<InMemoryCache<Payment>>,
    pub publisher: Arc<RecordingPublisher>,
    pub mailer: Arc<MockMailer>,
    invoice_worker: JoinHandle<()>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with(
            Arc::new(MockMailer::new()),
            Arc::new(RecordingPublisher::new()),
            false,
        )
    }

    /// Variant with injected mocks; `failing_cache` swaps both record caches
    /// for one that errors on every call.
    pub fn spawn_with(
        mailer: Arc<MockMailer>,
        publisher: Arc<RecordingPublisher>,
        failing_cache: bool,
    ) -> Self {
        let payment_store = Arc::new(InMemoryPaymentStore::new());
        let subscription_store = Arc::new(InMemorySubscriptionStore::new());
        let payment_cache = Arc::new(InMemoryCache::<Payment>::new());
        let subscription_cache = Arc::new(InMemoryCache::<Subscription>::new());
        let renderer = Arc::new(TextInvoiceRenderer::new(INVOICE_BASE_URL.to_string()));

        let (invoice_queue, invoice_worker) = InvoiceWorker::start_with(
            renderer.clone(),
            mailer.clone(),
            3,
            Duration::from_millis(10),
        );

        let cache_for_payments: Arc<dyn RecordCache<Payment>> = if failing_cache {
            Arc::new(FailingCache)
        } else {
            payment_cache.clone()
        };
        let cache_for_subscriptions: Arc<dyn RecordCache<Subscription>> = if failing_cache {
            Arc::new(FailingCache)
        } else {
            subscription_cache
        };

        let payments = PaymentService::new(
            payment_store.clone(),
            cache_for_payments,
            publisher.clone(),
            mailer.clone(),
            renderer,
            invoice_queue,
        );

        let subscriptions = SubscriptionService::new(
            subscription_store.clone(),
            cache_for_subscriptions,
            mailer.clone(),
        );

        Self {
            payments,
            subscriptions,
            payment_store,
            subscription_store,
            payment_cache,
            publisher,
            mailer,
            invoice_worker,
        }
    }

    /// Initiate a 100.00 USD payment for the given customer.
    pub async fn initiate(&self, customer_email: &str) -> Payment {
        self.payments
            .initiate(InitiatePayment {
                amount: 100.0,
                currency: "USD".to_string(),
                customer_email: customer_email.to_string(),
                description: "widget".to_string(),
            })
            .await
            .expect("Failed to initiate payment")
    }
}

/// Poll until `cond` holds; panics after ~2 seconds. For asserting on the
/// background invoice worker.
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout");
}
