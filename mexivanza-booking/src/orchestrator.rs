use mexivanza_core::payment::{CheckoutRequest, CheckoutSession, PaymentAdapter, PaymentProvider};
use mexivanza_core::{BoxError, PaymentStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct PaymentOrchestrator {
    adapter: Arc<dyn PaymentAdapter>,
}

impl PaymentOrchestrator {
    pub fn new(adapter: Arc<dyn PaymentAdapter>) -> Self {
        Self { adapter }
    }

    /// Open a hosted checkout for a booking
    pub async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, BoxError> {
        if request.amount_cents <= 0 {
            return Err(format!("Refusing checkout for non-positive amount {}", request.amount_cents).into());
        }
        let session = self.adapter.create_checkout_session(request).await?;
        tracing::info!(
            "Checkout session {} ({:?}) created for booking {}",
            session.session_id,
            session.provider,
            request.booking_id
        );
        Ok(session)
    }

    /// Resolve the status reported by a webhook. The provider's own answer
    /// wins when it has one.
    pub async fn resolve_status(&self, session_id: &str, reported: PaymentStatus) -> Result<PaymentStatus, BoxError> {
        match self.adapter.get_session_status(session_id).await? {
            Some(actual) => {
                if actual != reported {
                    tracing::warn!(
                        "Webhook reported {} for session {} but provider says {}",
                        reported,
                        session_id,
                        actual
                    );
                }
                Ok(actual)
            }
            None => Ok(reported),
        }
    }
}

/// In-process payment provider for development and tests.
#[derive(Default)]
pub struct MockPaymentAdapter {
    fail: bool,
    failures_left: AtomicU32,
    statuses: Mutex<HashMap<String, PaymentStatus>>,
}

impl MockPaymentAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every checkout attempt errors, as if the gateway were down.
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    /// The next `times` checkout attempts error, later ones succeed.
    pub fn fail_next(&self, times: u32) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    /// Pins the status the provider reports for `session_id`.
    pub fn set_status(&self, session_id: &str, status: PaymentStatus) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.insert(session_id.to_string(), status);
        }
    }

    pub fn session_id_for(booking_id: Uuid) -> String {
        format!("mock_cs_{}", booking_id.simple())
    }
}

#[async_trait::async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, BoxError> {
        let transient = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if self.fail || transient {
            return Err("Simulated payment gateway failure".into());
        }
        let session_id = Self::session_id_for(request.booking_id);
        Ok(CheckoutSession {
            url: format!("https://checkout.mexivanza.test/pay/{}", session_id),
            session_id,
            provider: PaymentProvider::Mock,
        })
    }

    async fn get_session_status(&self, session_id: &str) -> Result<Option<PaymentStatus>, BoxError> {
        let statuses = self.statuses.lock().map_err(|e| e.to_string())?;
        Ok(statuses.get(session_id).copied())
    }
}
