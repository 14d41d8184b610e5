//! In-memory store adapters.
//!
//! Same contract as the MongoDB repositories; used by integration tests and
//! local development without a database.

use crate::models::{Payment, Subscription};
use crate::services::repository::{PaymentStore, SubscriptionStore};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use service_core::error::AppError;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryPaymentStore {
    payments: DashMap<Uuid, Payment>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page_slice<T>(mut records: Vec<T>, page: i64, limit: i64) -> Vec<T> {
    let start = ((page - 1) * limit) as usize;
    if start >= records.len() {
        return Vec::new();
    }
    let end = (start + limit as usize).min(records.len());
    records.drain(start..end).collect()
}

fn matches_customer(customer_email: Option<&str>, record_email: &str) -> bool {
    match customer_email {
        Some(email) if !email.is_empty() => record_email == email,
        _ => true,
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, payment: &Payment) -> Result<(), AppError> {
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        Ok(self.payments.get(&id).map(|p| p.clone()))
    }

    async fn update(&self, payment: &Payment) -> Result<Payment, AppError> {
        match self.payments.entry(payment.id) {
            Entry::Occupied(mut existing) => {
                if existing.get().version != payment.version {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "payment {} was modified concurrently (stored version {}, read version {})",
                        payment.id,
                        existing.get().version,
                        payment.version
                    )));
                }
                let mut updated = payment.clone();
                updated.version = payment.version + 1;
                existing.insert(updated.clone());
                Ok(updated)
            }
            Entry::Vacant(_) => Err(AppError::NotFound(anyhow::anyhow!(
                "payment {} not found",
                payment.id
            ))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.payments.remove(&id);
        Ok(())
    }

    async fn list(
        &self,
        customer_email: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Payment>, i64), AppError> {
        let mut matching: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| matches_customer(customer_email, &p.customer_email))
            .map(|p| p.clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        Ok((page_slice(matching, page, limit), total))
    }
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: DashMap<Uuid, Subscription>,
    payments: DashMap<Uuid, Payment>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linked payments persisted by `create_with_payment`, for assertions.
    pub fn linked_payments(&self) -> Vec<Payment> {
        self.payments.iter().map(|p| p.clone()).collect()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn create_with_payment(
        &self,
        subscription: &Subscription,
        payment: &Payment,
    ) -> Result<(), AppError> {
        // Both inserts are infallible here, so the pair is trivially atomic.
        self.subscriptions
            .insert(subscription.id, subscription.clone());
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Subscription>, AppError> {
        Ok(self.subscriptions.get(&id).map(|s| s.clone()))
    }

    async fn update(&self, subscription: &Subscription) -> Result<Subscription, AppError> {
        match self.subscriptions.entry(subscription.id) {
            Entry::Occupied(mut existing) => {
                if existing.get().version != subscription.version {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "subscription {} was modified concurrently (stored version {}, read version {})",
                        subscription.id,
                        existing.get().version,
                        subscription.version
                    )));
                }
                let mut updated = subscription.clone();
                updated.version = subscription.version + 1;
                existing.insert(updated.clone());
                Ok(updated)
            }
            Entry::Vacant(_) => Err(AppError::NotFound(anyhow::anyhow!(
                "subscription {} not found",
                subscription.id
            ))),
        }
    }

    async fn list(
        &self,
        customer_email: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Subscription>, i64), AppError> {
        let mut matching: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|s| matches_customer(customer_email, &s.customer_email))
            .map(|s| s.clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        Ok((page_slice(matching, page, limit), total))
    }
}
