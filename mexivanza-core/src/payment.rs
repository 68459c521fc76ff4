use async_trait::async_trait;
use mexivanza_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::booking::PaymentStatus;
use crate::BoxError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    Paypal,
    Mock,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub booking_id: Uuid,
    pub package_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
    pub customer_email: Masked<String>,
    pub traveler_count: u32,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted checkout the customer is redirected to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
    pub provider: PaymentProvider,
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Create a hosted checkout session for a booking
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BoxError>;

    /// Authoritative session status, when the provider exposes one
    async fn get_session_status(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentStatus>, BoxError>;
}
