//! Subscription record.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Payment, PaymentStatus};

/// Subscription status. Cancel and Renew are legal only from `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub customer_email: String,
    pub plan_name: String,
    pub price: f64,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Build a fresh Active subscription running for one month from now.
    pub fn new(customer_email: String, plan_name: String, price: f64, currency: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_email,
            plan_name,
            price,
            currency,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: now + Months::new(1),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The Pending payment that must accompany this subscription's creation.
    pub fn initial_payment(&self) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            amount: self.price,
            currency: self.currency.clone(),
            status: PaymentStatus::Pending,
            customer_email: self.customer_email.clone(),
            description: format!("Subscription to {}", self.plan_name),
            version: 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
