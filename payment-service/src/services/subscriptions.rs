//! Subscription lifecycle manager.
//!
//! Creation materializes a linked Pending payment in the same store
//! transaction; Cancel and Renew follow the same store-first, best-effort
//! side-effect sequencing as the payment manager.

use crate::dtos::CreateSubscription;
use crate::models::{Subscription, SubscriptionStatus};
use crate::services::cache::{subscription_cache_key, RecordCache, CACHE_TTL};
use crate::services::email::Mailer;
use crate::services::metrics;
use crate::services::payments::clamp_page_limit;
use crate::services::repository::SubscriptionStore;
use chrono::{Months, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    cache: Arc<dyn RecordCache<Subscription>>,
    mailer: Arc<dyn Mailer>,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        cache: Arc<dyn RecordCache<Subscription>>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            cache,
            mailer,
        }
    }

    /// Create an Active subscription together with its linked Pending
    /// payment; the pair commits atomically in the store.
    pub async fn create(&self, req: CreateSubscription) -> Result<Subscription, AppError> {
        req.validate()?;

        let subscription =
            Subscription::new(req.customer_email, req.plan_name, req.price, req.currency);
        let payment = subscription.initial_payment();

        self.store
            .create_with_payment(&subscription, &payment)
            .await?;
        self.cache_put(&subscription).await;

        metrics::record_subscription_transition(subscription.status.as_str());
        tracing::info!(
            subscription_id = %subscription.id,
            payment_id = %payment.id,
            plan = %subscription.plan_name,
            "Subscription created with linked payment"
        );
        Ok(subscription)
    }

    /// Cache-aside read; `NotFound` when absent from cache and store.
    pub async fn get(&self, id: Uuid) -> Result<Subscription, AppError> {
        let key = subscription_cache_key(id);
        match self.cache.get(&key).await {
            Ok(Some(subscription)) => return Ok(subscription),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(subscription_id = %id, error = %err, "Cache read failed, falling back to store");
            }
        }

        let subscription = self.load(id).await?;
        self.cache_put(&subscription).await;
        Ok(subscription)
    }

    /// Active -> Cancelled.
    pub async fn cancel(&self, id: Uuid) -> Result<Subscription, AppError> {
        let mut subscription = self.load(id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(invalid_transition("cancel", subscription.status));
        }

        subscription.status = SubscriptionStatus::Cancelled;
        subscription.updated_at = Utc::now();

        let updated = self.store.update(&subscription).await?;
        self.cache_put(&updated).await;
        metrics::record_subscription_transition(updated.status.as_str());

        if let Err(err) = self.mailer.send_cancellation(&updated).await {
            tracing::warn!(subscription_id = %id, error = %err, "Failed to send cancellation email");
        }

        tracing::info!(subscription_id = %id, "Subscription cancelled");
        Ok(updated)
    }

    /// Extend an Active subscription by one month from now; the state stays
    /// Active.
    pub async fn renew(&self, id: Uuid) -> Result<Subscription, AppError> {
        let mut subscription = self.load(id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(invalid_transition("renew", subscription.status));
        }

        let now = Utc::now();
        subscription.start_date = now;
        subscription.end_date = now + Months::new(1);
        subscription.updated_at = now;

        let updated = self.store.update(&subscription).await?;
        self.cache_put(&updated).await;
        metrics::record_subscription_transition(updated.status.as_str());

        if let Err(err) = self.mailer.send_renewal(&updated).await {
            tracing::warn!(subscription_id = %id, error = %err, "Failed to send renewal email");
        }

        tracing::info!(subscription_id = %id, "Subscription renewed");
        Ok(updated)
    }

    pub async fn list(
        &self,
        customer_email: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Subscription>, i64), AppError> {
        let (page, limit) = clamp_page_limit(page, limit);
        self.store.list(customer_email, page, limit).await
    }

    async fn load(&self, id: Uuid) -> Result<Subscription, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("subscription {} not found", id)))
    }

    async fn cache_put(&self, subscription: &Subscription) {
        let key = subscription_cache_key(subscription.id);
        if let Err(err) = self.cache.set(&key, subscription, CACHE_TTL).await {
            tracing::warn!(subscription_id = %subscription.id, error = %err, "Failed to cache subscription");
        }
    }
}

fn invalid_transition(operation: &str, status: SubscriptionStatus) -> AppError {
    AppError::InvalidTransition(anyhow::anyhow!(
        "cannot {} a subscription in status {}",
        operation,
        status.as_str()
    ))
}
