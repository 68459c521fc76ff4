pub mod booking;
pub mod payment;
pub mod repository;
pub mod guard;
pub mod events;

pub use booking::{Booking, BookingData, BookingPayload, BookingStatus, ContactInfo, PaymentStatus, Traveler};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Error type returned by storage and gateway adapters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
