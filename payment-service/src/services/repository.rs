//! Authoritative record stores.
//!
//! The MongoDB adapters are the production implementations; the in-memory
//! adapters in [`super::memory`] share the same contract for tests.

use crate::models::{Payment, Subscription};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{bson::doc, Client, Collection, Database};
use service_core::error::AppError;
use uuid::Uuid;

/// Durable store for Payment records.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<(), AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Payment>, AppError>;
    /// Optimistic write: succeeds only when the stored version equals
    /// `payment.version`, then bumps it. A mismatch is a retryable
    /// [`AppError::Conflict`].
    async fn update(&self, payment: &Payment) -> Result<Payment, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    /// Page of records filtered by exact customer email (all records when
    /// `None`), ordered by creation time descending, plus the total count of
    /// matching records.
    async fn list(
        &self,
        customer_email: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Payment>, i64), AppError>;
}

/// Durable store for Subscription records.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Persist the subscription together with its linked Pending payment in
    /// one atomic boundary.
    async fn create_with_payment(
        &self,
        subscription: &Subscription,
        payment: &Payment,
    ) -> Result<(), AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Subscription>, AppError>;
    /// Same optimistic-version contract as [`PaymentStore::update`].
    async fn update(&self, subscription: &Subscription) -> Result<Subscription, AppError>;
    async fn list(
        &self,
        customer_email: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Subscription>, i64), AppError>;
}

#[derive(Clone)]
pub struct PaymentRepository {
    payments: Collection<Payment>,
}

impl PaymentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            payments: db.collection("payments"),
        }
    }
}

fn list_filter(customer_email: Option<&str>) -> mongodb::bson::Document {
    match customer_email {
        Some(email) if !email.is_empty() => doc! { "customer_email": email },
        _ => doc! {},
    }
}

fn page_options(page: i64, limit: i64) -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(((page - 1) * limit) as u64)
        .limit(limit)
        .build()
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<(), AppError> {
        self.payments.insert_one(payment, None).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        let filter = doc! { "_id": id.to_string() };
        Ok(self.payments.find_one(filter, None).await?)
    }

    async fn update(&self, payment: &Payment) -> Result<Payment, AppError> {
        let mut updated = payment.clone();
        updated.version = payment.version + 1;

        let filter = doc! { "_id": payment.id.to_string(), "version": payment.version };
        let result = self.payments.replace_one(filter, &updated, None).await?;
        if result.matched_count == 0 {
            // Distinguish a vanished record from a lost race.
            return match self.get(payment.id).await? {
                Some(current) => Err(AppError::Conflict(anyhow::anyhow!(
                    "payment {} was modified concurrently (stored version {}, read version {})",
                    payment.id,
                    current.version,
                    payment.version
                ))),
                None => Err(AppError::NotFound(anyhow::anyhow!(
                    "payment {} not found",
                    payment.id
                ))),
            };
        }
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.payments
            .delete_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        customer_email: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Payment>, i64), AppError> {
        let filter = list_filter(customer_email);
        let total = self
            .payments
            .count_documents(filter.clone(), None)
            .await? as i64;

        let cursor = self
            .payments
            .find(filter, Some(page_options(page, limit)))
            .await?;
        let payments: Vec<Payment> = cursor.try_collect().await?;

        Ok((payments, total))
    }
}

#[derive(Clone)]
pub struct SubscriptionRepository {
    client: Client,
    subscriptions: Collection<Subscription>,
    payments: Collection<Payment>,
}

impl SubscriptionRepository {
    pub fn new(client: &Client, db: &Database) -> Self {
        Self {
            client: client.clone(),
            subscriptions: db.collection("subscriptions"),
            payments: db.collection("payments"),
        }
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    async fn create_with_payment(
        &self,
        subscription: &Subscription,
        payment: &Payment,
    ) -> Result<(), AppError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let outcome = async {
            self.subscriptions
                .insert_one_with_session(subscription, None, &mut session)
                .await?;
            self.payments
                .insert_one_with_session(payment, None, &mut session)
                .await?;
            Ok::<(), mongodb::error::Error>(())
        }
        .await;

        match outcome {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(err) => {
                session.abort_transaction().await.ok();
                Err(err.into())
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Subscription>, AppError> {
        let filter = doc! { "_id": id.to_string() };
        Ok(self.subscriptions.find_one(filter, None).await?)
    }

    async fn update(&self, subscription: &Subscription) -> Result<Subscription, AppError> {
        let mut updated = subscription.clone();
        updated.version = subscription.version + 1;

        let filter = doc! { "_id": subscription.id.to_string(), "version": subscription.version };
        let result = self
            .subscriptions
            .replace_one(filter, &updated, None)
            .await?;
        if result.matched_count == 0 {
            return match self.get(subscription.id).await? {
                Some(current) => Err(AppError::Conflict(anyhow::anyhow!(
                    "subscription {} was modified concurrently (stored version {}, read version {})",
                    subscription.id,
                    current.version,
                    subscription.version
                ))),
                None => Err(AppError::NotFound(anyhow::anyhow!(
                    "subscription {} not found",
                    subscription.id
                ))),
            };
        }
        Ok(updated)
    }

    async fn list(
        &self,
        customer_email: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Subscription>, i64), AppError> {
        let filter = list_filter(customer_email);
        let total = self
            .subscriptions
            .count_documents(filter.clone(), None)
            .await? as i64;

        let cursor = self
            .subscriptions
            .find(filter, Some(page_options(page, limit)))
            .await?;
        let subscriptions: Vec<Subscription> = cursor.try_collect().await?;

        Ok((subscriptions, total))
    }
}
