use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
static PAYMENT_TRANSITIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static SUBSCRIPTION_TRANSITIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static INVOICE_JOBS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

pub fn init_metrics() {
    if PROMETHEUS_REGISTRY.get().is_some() {
        return;
    }

    let registry = Registry::new();

    let payment_transitions = IntCounterVec::new(
        Opts::new(
            "payment_transitions_total",
            "Payment state transitions by resulting status",
        ),
        &["status"],
    )
    .expect("Failed to create payment_transitions_total metric");

    let subscription_transitions = IntCounterVec::new(
        Opts::new(
            "subscription_transitions_total",
            "Subscription state transitions by resulting status",
        ),
        &["status"],
    )
    .expect("Failed to create subscription_transitions_total metric");

    let invoice_jobs = IntCounterVec::new(
        Opts::new(
            "invoice_jobs_total",
            "Invoice follow-up jobs by final outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create invoice_jobs_total metric");

    registry
        .register(Box::new(payment_transitions.clone()))
        .expect("Failed to register payment_transitions_total");
    registry
        .register(Box::new(subscription_transitions.clone()))
        .expect("Failed to register subscription_transitions_total");
    registry
        .register(Box::new(invoice_jobs.clone()))
        .expect("Failed to register invoice_jobs_total");

    if PROMETHEUS_REGISTRY.set(registry).is_ok() {
        PAYMENT_TRANSITIONS_TOTAL.set(payment_transitions).ok();
        SUBSCRIPTION_TRANSITIONS_TOTAL
            .set(subscription_transitions)
            .ok();
        INVOICE_JOBS_TOTAL.set(invoice_jobs).ok();
    }
}

/// Render the registry in Prometheus text format for an embedding server.
pub fn get_metrics() -> String {
    let Some(registry) = PROMETHEUS_REGISTRY.get() else {
        return "# Metrics not initialized\n".to_string();
    };

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer).ok();
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_payment_transition(status: &str) {
    if let Some(counter) = PAYMENT_TRANSITIONS_TOTAL.get() {
        counter.with_label_values(&[status]).inc();
    }
}

pub fn record_subscription_transition(status: &str) {
    if let Some(counter) = SUBSCRIPTION_TRANSITIONS_TOTAL.get() {
        counter.with_label_values(&[status]).inc();
    }
}

pub fn record_invoice_job(outcome: &str) {
    if let Some(counter) = INVOICE_JOBS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}
