use reqwest::{Client, Url};
use serde::Deserialize;

use super::{PaymentGateway, PaymentIntent};

/// Talks to the Stripe payment-intents REST API.
pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    /// `/v1/payment_intents` followed by `segments`, each percent-encoded as
    /// a single path segment.
    fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| anyhow::anyhow!("invalid Stripe API base: {e}"))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Stripe API base cannot carry a path"))?
            .pop_if_empty()
            .extend(["v1", "payment_intents"])
            .extend(segments);
        Ok(url)
    }

    async fn read_intent(response: reqwest::Response) -> anyhow::Result<PaymentIntent> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.error.message)
                .unwrap_or(body);
            anyhow::bail!("Stripe API error: {status} - {message}");
        }
        response
            .json::<PaymentIntent>()
            .await
            .map_err(|e| anyhow::anyhow!("invalid payment intent payload: {e}"))
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, amount_minor: i64, currency: &str) -> anyhow::Result<PaymentIntent> {
        let amount = amount_minor.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true"),
        ];
        let response = self
            .client
            .post(self.url(&[])?)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("failed to reach Stripe: {e}"))?;
        Self::read_intent(response).await
    }

    async fn retrieve_intent(&self, id: &str) -> anyhow::Result<PaymentIntent> {
        let response = self
            .client
            .get(self.url(&[id])?)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("failed to reach Stripe: {e}"))?;
        Self::read_intent(response).await
    }

    async fn cancel_intent(&self, id: &str) -> anyhow::Result<PaymentIntent> {
        let response = self
            .client
            .post(self.url(&[id, "cancel"])?)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("failed to reach Stripe: {e}"))?;
        Self::read_intent(response).await
    }
}
