use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

mod stripe;

pub use stripe::StripeGateway;

/// Status string the provider reports once a charge went through.
pub const STATUS_SUCCEEDED: &str = "succeeded";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub client_secret: Option<String>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == STATUS_SUCCEEDED
    }
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, amount_minor: i64, currency: &str) -> anyhow::Result<PaymentIntent>;
    async fn retrieve_intent(&self, id: &str) -> anyhow::Result<PaymentIntent>;
    async fn cancel_intent(&self, id: &str) -> anyhow::Result<PaymentIntent>;
}

pub type DynPaymentGateway = Arc<dyn PaymentGateway>;

/// Used when no provider key is configured; every call fails.
pub struct DisabledGateway;

#[async_trait::async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_intent(&self, _amount_minor: i64, _currency: &str) -> anyhow::Result<PaymentIntent> {
        anyhow::bail!("payment provider is not configured")
    }

    async fn retrieve_intent(&self, _id: &str) -> anyhow::Result<PaymentIntent> {
        anyhow::bail!("payment provider is not configured")
    }

    async fn cancel_intent(&self, _id: &str) -> anyhow::Result<PaymentIntent> {
        anyhow::bail!("payment provider is not configured")
    }
}

/// Whether `id` has the shape of a provider payment-intent id (`pi_...`).
pub fn is_intent_id(id: &str) -> bool {
    id.strip_prefix("pi_").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Converts a currency amount to integer minor units, e.g. 12.34 -> 1234.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
