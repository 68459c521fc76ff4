use crate::error::BookingError;
use mexivanza_catalog::AvailabilitySlot;
use mexivanza_core::repository::{AvailabilityRepository, BookingRepository};
use mexivanza_core::{Booking, BookingStatus, PaymentStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Something that happened to a booking after it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    PaymentSucceeded,
    PaymentFailed,
    Refunded,
    Cancelled,
    Completed,
}

impl BookingEvent {
    fn target(&self) -> &'static str {
        match self {
            Self::PaymentSucceeded => "CONFIRMED/PAID",
            Self::PaymentFailed => "CANCELLED/FAILED",
            Self::Refunded => "CANCELLED/REFUNDED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }
}

/// Outcome of applying an event to a booking's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Reserved seats go back to the slot
    pub release_capacity: bool,
    /// Already in the target state; nothing to write
    pub unchanged: bool,
}

/// Booking lifecycle:
///
/// ```text
/// Pending/Pending --paid--> Confirmed/Paid --complete--> Completed/Paid
///        |                        |
///        +--failed--> Cancelled/Failed
///        +--cancel--> Cancelled/Pending
///                                 +--refund--> Cancelled/Refunded
/// ```
pub fn transition(
    status: BookingStatus,
    payment_status: PaymentStatus,
    event: BookingEvent,
) -> Result<Transition, BookingError> {
    use BookingEvent::*;
    use BookingStatus as B;
    use PaymentStatus as P;

    let to = |status, payment_status, release_capacity| Transition {
        status,
        payment_status,
        release_capacity,
        unchanged: false,
    };
    let same = Transition {
        status,
        payment_status,
        release_capacity: false,
        unchanged: true,
    };

    match (status, payment_status, event) {
        (B::Pending, P::Pending, PaymentSucceeded) => Ok(to(B::Confirmed, P::Paid, false)),
        (B::Confirmed, P::Paid, PaymentSucceeded) => Ok(same),

        (B::Pending, P::Pending, PaymentFailed) => Ok(to(B::Cancelled, P::Failed, true)),
        (B::Cancelled, P::Failed, PaymentFailed) => Ok(same),

        (B::Confirmed, P::Paid, Refunded) => Ok(to(B::Cancelled, P::Refunded, true)),
        (B::Cancelled, P::Refunded, Refunded) => Ok(same),

        (B::Pending, _, Cancelled) | (B::Confirmed, _, Cancelled) => Ok(to(B::Cancelled, payment_status, true)),
        (B::Cancelled, _, Cancelled) => Ok(same),

        (B::Confirmed, P::Paid, Completed) => Ok(to(B::Completed, P::Paid, false)),
        (B::Completed, _, Completed) => Ok(same),

        _ => Err(BookingError::InvalidTransition {
            from: format!("{}/{}", status, payment_status).to_uppercase(),
            to: event.target().to_string(),
        }),
    }
}

/// Applies lifecycle transitions against storage and keeps slot capacity in step.
pub struct BookingManager {
    bookings: Arc<dyn BookingRepository>,
    availability: Arc<dyn AvailabilityRepository>,
}

impl BookingManager {
    pub fn new(bookings: Arc<dyn BookingRepository>, availability: Arc<dyn AvailabilityRepository>) -> Self {
        Self { bookings, availability }
    }

    pub fn bookings(&self) -> &Arc<dyn BookingRepository> {
        &self.bookings
    }

    /// Reserves capacity for the booking and stores it. The reservation is
    /// undone if the insert fails.
    pub async fn create_pending(&self, booking: &Booking) -> Result<AvailabilitySlot, BookingError> {
        let slot = self
            .availability
            .reserve_capacity(booking.availability_id, booking.traveler_count)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::CapacityUnavailable {
                requested: booking.traveler_count,
            })?;

        if let Err(e) = self.bookings.create_booking(booking).await {
            tracing::error!("Failed to store booking {}: {}", booking.id, e);
            if let Err(release_err) = self
                .availability
                .release_capacity(booking.availability_id, booking.traveler_count)
                .await
            {
                tracing::error!("Failed to release capacity for slot {}: {}", booking.availability_id, release_err);
            }
            return Err(BookingError::storage(e));
        }

        tracing::info!(
            "Booking {} reserved {} seats on slot {}",
            booking.id,
            booking.traveler_count,
            booking.availability_id
        );
        Ok(slot)
    }

    pub async fn get(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::NotFound(id))
    }

    pub async fn mark_paid(&self, id: Uuid) -> Result<(Booking, Option<AvailabilitySlot>), BookingError> {
        self.apply(id, BookingEvent::PaymentSucceeded).await
    }

    pub async fn mark_failed(&self, id: Uuid) -> Result<(Booking, Option<AvailabilitySlot>), BookingError> {
        self.apply(id, BookingEvent::PaymentFailed).await
    }

    pub async fn refund(&self, id: Uuid) -> Result<(Booking, Option<AvailabilitySlot>), BookingError> {
        self.apply(id, BookingEvent::Refunded).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<(Booking, Option<AvailabilitySlot>), BookingError> {
        self.apply(id, BookingEvent::Cancelled).await
    }

    pub async fn complete(&self, id: Uuid) -> Result<(Booking, Option<AvailabilitySlot>), BookingError> {
        self.apply(id, BookingEvent::Completed).await
    }

    /// Returns the updated booking and, when seats were released, the slot
    /// after release.
    pub async fn apply(
        &self,
        id: Uuid,
        event: BookingEvent,
    ) -> Result<(Booking, Option<AvailabilitySlot>), BookingError> {
        let mut booking = self.get(id).await?;
        let next = transition(booking.status, booking.payment_status, event)?;

        if next.unchanged {
            return Ok((booking, None));
        }

        self.bookings
            .update_status(id, next.status, next.payment_status)
            .await
            .map_err(BookingError::storage)?;

        let released = if next.release_capacity {
            self.availability
                .release_capacity(booking.availability_id, booking.traveler_count)
                .await
                .map_err(BookingError::storage)?
        } else {
            None
        };

        tracing::info!(
            "Booking {} {}/{} -> {}/{}",
            id,
            booking.status,
            booking.payment_status,
            next.status,
            next.payment_status
        );

        booking.status = next.status;
        booking.payment_status = next.payment_status;
        booking.updated_at = chrono::Utc::now();
        Ok((booking, released))
    }
}
