use async_trait::async_trait;
use mexivanza_core::payment::{CheckoutRequest, CheckoutSession, PaymentAdapter, PaymentProvider};
use mexivanza_core::{BoxError, PaymentStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Creates checkout sessions by calling a hosted serverless function.
pub struct RemoteFunctionPaymentAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionRequest<'a> {
    booking_id: Uuid,
    package_id: Uuid,
    amount: i64,
    currency: &'a str,
    description: &'a str,
    customer_email: &'a str,
    traveler_count: u32,
    success_url: &'a str,
    cancel_url: &'a str,
}

/// The function has answered with several URL field names over time.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionResponse {
    #[serde(alias = "id", alias = "session_id")]
    session_id: Option<String>,
    url: Option<String>,
    checkout_url: Option<String>,
    paypal_url: Option<String>,
    error: Option<String>,
}

impl FunctionResponse {
    fn into_session(self, booking_id: Uuid) -> Result<CheckoutSession, BoxError> {
        if let Some(message) = self.error {
            return Err(format!("Payment function error: {}", message).into());
        }
        let (url, provider) = match (self.url, self.checkout_url, self.paypal_url) {
            (Some(url), _, _) | (None, Some(url), _) => (url, PaymentProvider::Stripe),
            (None, None, Some(url)) => (url, PaymentProvider::Paypal),
            (None, None, None) => return Err("Payment function returned no checkout URL".into()),
        };
        Ok(CheckoutSession {
            session_id: self.session_id.unwrap_or_else(|| booking_id.to_string()),
            url,
            provider,
        })
    }
}

impl RemoteFunctionPaymentAdapter {
    pub fn new(functions_url: &str, function_name: &str, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/{}", functions_url.trim_end_matches('/'), function_name),
            api_key,
        })
    }
}

#[async_trait]
impl PaymentAdapter for RemoteFunctionPaymentAdapter {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, BoxError> {
        let body = FunctionRequest {
            booking_id: request.booking_id,
            package_id: request.package_id,
            amount: request.amount_cents,
            currency: &request.currency,
            description: &request.description,
            customer_email: request.customer_email.expose(),
            traveler_count: request.traveler_count,
            success_url: &request.success_url,
            cancel_url: &request.cancel_url,
        };

        let mut call = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?;
        let status = response.status();
        let parsed: FunctionResponse = response.json().await?;
        if !status.is_success() {
            error!("Payment function returned {} for booking {}", status, request.booking_id);
            return Err(parsed
                .error
                .unwrap_or_else(|| format!("Payment function returned {}", status))
                .into());
        }

        let session = parsed.into_session(request.booking_id)?;
        info!("Payment function opened session {} for booking {}", session.session_id, request.booking_id);
        Ok(session)
    }

    async fn get_session_status(&self, _session_id: &str) -> Result<Option<PaymentStatus>, BoxError> {
        // The function exposes no status lookup; webhooks are authoritative
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> FunctionResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accepts_every_url_field() {
        let booking_id = Uuid::new_v4();

        let session = parse(r#"{"url": "https://pay/a", "sessionId": "cs_1"}"#).into_session(booking_id).unwrap();
        assert_eq!(session.url, "https://pay/a");
        assert_eq!(session.session_id, "cs_1");

        let session = parse(r#"{"checkoutUrl": "https://pay/b", "id": "cs_2"}"#).into_session(booking_id).unwrap();
        assert_eq!(session.url, "https://pay/b");
        assert_eq!(session.provider, PaymentProvider::Stripe);

        let session = parse(r#"{"paypalUrl": "https://paypal/c"}"#).into_session(booking_id).unwrap();
        assert_eq!(session.provider, PaymentProvider::Paypal);
        assert_eq!(session.session_id, booking_id.to_string());
    }

    #[test]
    fn test_missing_url_or_error_is_rejected() {
        assert!(parse("{}").into_session(Uuid::new_v4()).is_err());
        assert!(parse(r#"{"error": "card declined", "url": "https://pay"}"#)
            .into_session(Uuid::new_v4())
            .is_err());
    }

    #[test]
    fn test_endpoint_joins_function_name() {
        let adapter = RemoteFunctionPaymentAdapter::new("https://fn.example.com/", "create-travel-payment", None).unwrap();
        assert_eq!(adapter.endpoint, "https://fn.example.com/create-travel-payment");
    }
}
