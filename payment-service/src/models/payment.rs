//! Payment record and its status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment status.
///
/// Legal transitions: `Pending -> {Completed, Failed}`, `Completed -> Refunded`.
/// `Failed` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

/// Payment record.
///
/// `version` backs the optimistic concurrency check on updates; stores bump
/// it on every successful write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub customer_email: String,
    pub description: String,
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Build a fresh Pending payment with a new identity and current timestamps.
    pub fn new(amount: f64, currency: String, customer_email: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            amount,
            currency,
            status: PaymentStatus::Pending,
            customer_email,
            description,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_payment_starts_pending_with_identity() {
        let payment = Payment::new(
            100.0,
            "USD".to_string(),
            "a@x.com".to_string(),
            "widget".to_string(),
        );
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.version, 0);
        assert!(!payment.id.is_nil());
        assert_eq!(payment.created_at, payment.updated_at);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&PaymentStatus::Refunded).unwrap();
        assert_eq!(json, "\"REFUNDED\"");
    }
}
