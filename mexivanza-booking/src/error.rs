use mexivanza_catalog::PricingError;
use mexivanza_core::BoxError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Package not found: {0}")]
    PackageNotFound(Uuid),

    #[error("Availability slot not found: {0}")]
    SlotNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    #[error("Not enough capacity for {requested} travelers")]
    CapacityUnavailable {
        requested: i32,
    },

    #[error("Invalid booking: {0}")]
    Validation(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Submitted total {submitted} does not match computed total {computed}")]
    PriceMismatch {
        submitted: i64,
        computed: i64,
    },

    #[error("Booking submission already in progress")]
    SubmissionInProgress,

    #[error("Payment provider unavailable: {0}")]
    PaymentUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    pub fn storage(err: BoxError) -> Self {
        Self::Storage(err.to_string())
    }
}
