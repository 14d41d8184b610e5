//! Domain models for payment-service.

mod payment;
mod subscription;

pub use payment::{Payment, PaymentStatus};
pub use subscription::{Subscription, SubscriptionStatus};
