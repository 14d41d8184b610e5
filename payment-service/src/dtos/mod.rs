//! Operation inputs consumed from the transport layer.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InitiatePayment {
    #[validate(range(min = 0.01))]
    pub amount: f64,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(email)]
    pub customer_email: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePayment {
    #[validate(range(min = 0.01))]
    pub amount: f64,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubscription {
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 1))]
    pub plan_name: String,
    #[validate(range(min = 0.01))]
    pub price: f64,
    #[validate(length(equal = 3))]
    pub currency: String,
}
