//! Application wiring.
//!
//! Builds the collaborator graph once from configuration and hands out the
//! two lifecycle managers. The transport layer that exposes them over the
//! wire lives outside this crate.

use crate::config::Config;
use crate::models::{Payment, Subscription};
use crate::services::{
    init_metrics, InvoiceWorker, PaymentRepository, PaymentService, RedisCache,
    RedisEventPublisher, SmtpMailer, SubscriptionRepository, SubscriptionService,
    TextInvoiceRenderer,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct Application {
    payments: PaymentService,
    subscriptions: SubscriptionService,
    invoice_worker: JoinHandle<()>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        init_metrics();

        // Connect to MongoDB
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                AppError::DatabaseError(e.into())
            })?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::DatabaseError(e.into())
        })?;
        let db = client.database(&config.database.db_name);

        // Connect to Redis
        let redis = redis::Client::open(config.cache.url.expose_secret().as_str())?;

        let mailer = Arc::new(SmtpMailer::new(config.smtp.clone())?);
        if config.smtp.enabled {
            tracing::info!("SMTP mailer initialized");
        } else {
            tracing::warn!("SMTP not configured - notification emails will be skipped");
        }

        let renderer = Arc::new(TextInvoiceRenderer::new(config.invoicing.base_url.clone()));
        let (invoice_queue, invoice_worker) =
            InvoiceWorker::start(renderer.clone(), mailer.clone());

        let payments = PaymentService::new(
            Arc::new(PaymentRepository::new(&db)),
            Arc::new(RedisCache::<Payment>::new(redis.clone())),
            Arc::new(RedisEventPublisher::new(redis.clone())),
            mailer.clone(),
            renderer,
            invoice_queue,
        );

        let subscriptions = SubscriptionService::new(
            Arc::new(SubscriptionRepository::new(&client, &db)),
            Arc::new(RedisCache::<Subscription>::new(redis)),
            mailer,
        );

        Ok(Self {
            payments,
            subscriptions,
            invoice_worker,
        })
    }

    pub fn payments(&self) -> &PaymentService {
        &self.payments
    }

    pub fn subscriptions(&self) -> &SubscriptionService {
        &self.subscriptions
    }

    /// Stop the background invoice worker. Pending queue entries are lost,
    /// which matches the at-most-once delivery bound.
    pub fn shutdown(self) {
        self.invoice_worker.abort();
    }
}
