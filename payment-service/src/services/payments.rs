//! Payment lifecycle manager.
//!
//! Owns the payment state machine and orchestrates store, cache, event,
//! notification and invoice follow-up around each transition. The store is
//! authoritative; cache, events and mail are best-effort side effects
//! sequenced strictly after the store write.

use crate::dtos::{InitiatePayment, UpdatePayment};
use crate::models::{Payment, PaymentStatus};
use crate::services::cache::{payment_cache_key, RecordCache, CACHE_TTL};
use crate::services::email::Mailer;
use crate::services::events::{
    publish_payment, EventPublisher, PAYMENT_CONFIRMED_TOPIC, PAYMENT_FAILED_TOPIC,
    PAYMENT_REFUNDED_TOPIC,
};
use crate::services::invoice::{Invoice, InvoiceGenerator};
use crate::services::metrics;
use crate::services::repository::PaymentStore;
use crate::services::worker::InvoiceQueue;
use chrono::Utc;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Clamp pagination inputs to the contract: page >= 1, limit in [1, 100]
/// with 10 as the fallback.
pub(crate) fn clamp_page_limit(page: i64, limit: i64) -> (i64, i64) {
    let page = if page < 1 { 1 } else { page };
    let limit = if !(1..=100).contains(&limit) { 10 } else { limit };
    (page, limit)
}

pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    cache: Arc<dyn RecordCache<Payment>>,
    events: Arc<dyn EventPublisher>,
    mailer: Arc<dyn Mailer>,
    invoices: Arc<dyn InvoiceGenerator>,
    invoice_queue: InvoiceQueue,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        cache: Arc<dyn RecordCache<Payment>>,
        events: Arc<dyn EventPublisher>,
        mailer: Arc<dyn Mailer>,
        invoices: Arc<dyn InvoiceGenerator>,
        invoice_queue: InvoiceQueue,
    ) -> Self {
        Self {
            store,
            cache,
            events,
            mailer,
            invoices,
            invoice_queue,
        }
    }

    /// Create a new Pending payment.
    pub async fn initiate(&self, req: InitiatePayment) -> Result<Payment, AppError> {
        req.validate()?;

        let payment = Payment::new(req.amount, req.currency, req.customer_email, req.description);
        self.store.create(&payment).await?;
        self.cache_put(&payment).await;

        metrics::record_payment_transition(payment.status.as_str());
        tracing::info!(payment_id = %payment.id, amount = payment.amount, "Payment initiated");
        Ok(payment)
    }

    /// Pending -> Completed. Publishes the state change, sends the
    /// confirmation mail and hands the payment to the invoice worker.
    pub async fn confirm(&self, id: Uuid) -> Result<Payment, AppError> {
        let payment = self.load(id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(invalid_transition("confirm", payment.status));
        }

        let updated = self
            .persist_transition(payment, PaymentStatus::Completed)
            .await?;

        if let Err(err) = publish_payment(self.events.as_ref(), PAYMENT_CONFIRMED_TOPIC, &updated).await {
            tracing::warn!(payment_id = %id, error = %err, "Failed to publish payment confirmation event");
        }
        if let Err(err) = self.mailer.send_payment_confirmation(&updated).await {
            tracing::warn!(payment_id = %id, error = %err, "Failed to send payment confirmation email");
        }

        // Confirmation implies billing; invoice rendering and delivery run
        // in the follow-up worker with their own retry policy.
        self.invoice_queue.enqueue(updated.clone());

        tracing::info!(payment_id = %id, "Payment confirmed");
        Ok(updated)
    }

    /// Completed -> Refunded.
    pub async fn refund(&self, id: Uuid) -> Result<Payment, AppError> {
        let payment = self.load(id).await?;
        if payment.status != PaymentStatus::Completed {
            return Err(invalid_transition("refund", payment.status));
        }

        let updated = self
            .persist_transition(payment, PaymentStatus::Refunded)
            .await?;

        if let Err(err) = publish_payment(self.events.as_ref(), PAYMENT_REFUNDED_TOPIC, &updated).await {
            tracing::warn!(payment_id = %id, error = %err, "Failed to publish payment refund event");
        }
        if let Err(err) = self.mailer.send_refund_confirmation(&updated).await {
            tracing::warn!(payment_id = %id, error = %err, "Failed to send refund confirmation email");
        }

        tracing::info!(payment_id = %id, "Payment refunded");
        Ok(updated)
    }

    /// Pending -> Failed. Cancellation is modeled as the Failed terminal state.
    pub async fn cancel(&self, id: Uuid) -> Result<Payment, AppError> {
        let payment = self.load(id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(invalid_transition("cancel", payment.status));
        }

        let updated = self
            .persist_transition(payment, PaymentStatus::Failed)
            .await?;

        if let Err(err) = publish_payment(self.events.as_ref(), PAYMENT_FAILED_TOPIC, &updated).await {
            tracing::warn!(payment_id = %id, error = %err, "Failed to publish payment failed event");
        }

        tracing::info!(payment_id = %id, "Payment cancelled");
        Ok(updated)
    }

    /// Overwrite the mutable fields of a Pending payment.
    pub async fn update(&self, id: Uuid, req: UpdatePayment) -> Result<Payment, AppError> {
        req.validate()?;

        let mut payment = self.load(id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(invalid_transition("update", payment.status));
        }

        payment.amount = req.amount;
        payment.currency = req.currency;
        payment.description = req.description;
        payment.updated_at = Utc::now();

        let updated = self.store.update(&payment).await?;
        self.cache_put(&updated).await;

        tracing::info!(payment_id = %id, "Payment updated");
        Ok(updated)
    }

    /// Administrative delete; evicts the cache entry regardless of status.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let payment = self.load(id).await?;

        self.store.delete(payment.id).await?;
        if let Err(err) = self.cache.delete(&payment_cache_key(id)).await {
            tracing::warn!(payment_id = %id, error = %err, "Failed to evict payment from cache");
        }

        tracing::info!(payment_id = %id, "Payment deleted");
        Ok(())
    }

    /// Cache-aside read: cached snapshot if present, store on miss with
    /// repopulation.
    pub async fn get_status(&self, id: Uuid) -> Result<Payment, AppError> {
        let key = payment_cache_key(id);
        match self.cache.get(&key).await {
            Ok(Some(payment)) => return Ok(payment),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(payment_id = %id, error = %err, "Cache read failed, falling back to store");
            }
        }

        let payment = self.load(id).await?;
        self.cache_put(&payment).await;
        Ok(payment)
    }

    pub async fn list(
        &self,
        customer_email: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Payment>, i64), AppError> {
        let (page, limit) = clamp_page_limit(page, limit);
        self.store.list(customer_email, page, limit).await
    }

    /// Render the billing artifact for a Completed payment. Does not mutate
    /// state and is safe to repeat.
    pub async fn generate_invoice(&self, id: Uuid) -> Result<Invoice, AppError> {
        let payment = self.load(id).await?;
        if payment.status != PaymentStatus::Completed {
            return Err(invalid_transition("generate an invoice for", payment.status));
        }
        self.invoices.render(&payment)
    }

    /// Send a reminder for a Pending payment. Unlike the other notification
    /// paths this failure is surfaced: there is no state change to fall back
    /// on.
    pub async fn send_reminder(&self, id: Uuid) -> Result<(), AppError> {
        let payment = self.load(id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(invalid_transition("send a reminder for", payment.status));
        }
        self.mailer.send_payment_reminder(&payment).await
    }

    /// Transitions read the store directly so the optimistic version check
    /// runs against authoritative state rather than a possibly stale cache.
    async fn load(&self, id: Uuid) -> Result<Payment, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("payment {} not found", id)))
    }

    async fn persist_transition(
        &self,
        mut payment: Payment,
        status: PaymentStatus,
    ) -> Result<Payment, AppError> {
        payment.status = status;
        payment.updated_at = Utc::now();

        let updated = self.store.update(&payment).await?;
        self.cache_put(&updated).await;
        metrics::record_payment_transition(status.as_str());
        Ok(updated)
    }

    async fn cache_put(&self, payment: &Payment) {
        let key = payment_cache_key(payment.id);
        if let Err(err) = self.cache.set(&key, payment, CACHE_TTL).await {
            tracing::warn!(payment_id = %payment.id, error = %err, "Failed to cache payment");
        }
    }
}

fn invalid_transition(operation: &str, status: PaymentStatus) -> AppError {
    AppError::InvalidTransition(anyhow::anyhow!(
        "cannot {} a payment in status {}",
        operation,
        status.as_str()
    ))
}
