//! Invoice follow-up worker.
//!
//! Confirming a payment enqueues it here instead of rendering the invoice
//! inline: the state transition stays fast while rendering and delivery run
//! in the background with a bounded retry policy. Exhausted retries are
//! logged and dropped; the process boundary still caps delivery at
//! at-most-once.

use crate::models::Payment;
use crate::services::email::Mailer;
use crate::services::invoice::InvoiceGenerator;
use crate::services::metrics;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const QUEUE_DEPTH: usize = 64;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Producer half handed to the payment lifecycle manager.
#[derive(Clone)]
pub struct InvoiceQueue {
    tx: mpsc::Sender<Payment>,
}

impl InvoiceQueue {
    /// Best-effort enqueue; a full or closed queue is logged, never surfaced.
    pub fn enqueue(&self, payment: Payment) {
        let payment_id = payment.id;
        if let Err(err) = self.tx.try_send(payment) {
            tracing::warn!(
                payment_id = %payment_id,
                error = %err,
                "Failed to enqueue payment for invoice follow-up"
            );
        }
    }
}

pub struct InvoiceWorker {
    rx: mpsc::Receiver<Payment>,
    renderer: Arc<dyn InvoiceGenerator>,
    mailer: Arc<dyn Mailer>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl InvoiceWorker {
    pub fn start(
        renderer: Arc<dyn InvoiceGenerator>,
        mailer: Arc<dyn Mailer>,
    ) -> (InvoiceQueue, JoinHandle<()>) {
        Self::start_with(renderer, mailer, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    /// Start with an explicit retry policy. Tests shrink the delay.
    pub fn start_with(
        renderer: Arc<dyn InvoiceGenerator>,
        mailer: Arc<dyn Mailer>,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> (InvoiceQueue, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let worker = Self {
            rx,
            renderer,
            mailer,
            max_attempts,
            retry_delay,
        };
        let handle = tokio::spawn(worker.run());
        (InvoiceQueue { tx }, handle)
    }

    async fn run(mut self) {
        while let Some(payment) = self.rx.recv().await {
            self.deliver(&payment).await;
        }
        tracing::debug!("Invoice queue closed, worker stopping");
    }

    async fn deliver(&self, payment: &Payment) {
        for attempt in 1..=self.max_attempts {
            match self.process(payment).await {
                Ok(()) => {
                    tracing::info!(payment_id = %payment.id, attempt, "Invoice delivered");
                    metrics::record_invoice_job("delivered");
                    return;
                }
                Err(err) if attempt < self.max_attempts => {
                    tracing::warn!(
                        payment_id = %payment.id,
                        attempt,
                        error = %err,
                        "Invoice delivery failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => {
                    tracing::error!(
                        payment_id = %payment.id,
                        attempts = self.max_attempts,
                        error = %err,
                        "Invoice delivery failed, giving up"
                    );
                    metrics::record_invoice_job("failed");
                }
            }
        }
    }

    async fn process(&self, payment: &Payment) -> Result<(), AppError> {
        let invoice = self.renderer.render(payment)?;
        self.mailer.send_invoice(payment, &invoice).await
    }
}
