use mexivanza_core::{Booking, BookingStatus, PaymentStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// KPIs shown on the admin travel console.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingStats {
    pub total_bookings: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub cancelled: usize,
    pub completed: usize,
    pub paid_bookings: usize,
    /// Sum of paid bookings only, across currencies. Meaningful as an
    /// amount only while every booking shares one currency.
    pub revenue_cents: i64,
    /// Paid revenue per currency code
    pub revenue_by_currency: BTreeMap<String, i64>,
    pub average_paid_booking_cents: i64,
    /// Travelers on bookings that still hold seats
    pub total_travelers: i64,
    pub bookings_by_package: BTreeMap<Uuid, usize>,
}

impl BookingStats {
    pub fn from_bookings(bookings: &[Booking]) -> Self {
        let mut stats = Self {
            total_bookings: bookings.len(),
            ..Default::default()
        };

        for booking in bookings {
            match booking.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Confirmed => stats.confirmed += 1,
                BookingStatus::Cancelled => stats.cancelled += 1,
                BookingStatus::Completed => stats.completed += 1,
            }

            if booking.payment_status == PaymentStatus::Paid {
                stats.paid_bookings += 1;
                stats.revenue_cents += booking.total_cents;
                *stats.revenue_by_currency.entry(booking.currency.clone()).or_insert(0) += booking.total_cents;
            }

            if booking.holds_capacity() {
                stats.total_travelers += booking.traveler_count as i64;
            }

            *stats.bookings_by_package.entry(booking.package_id).or_insert(0) += 1;
        }

        if stats.paid_bookings > 0 {
            stats.average_paid_booking_cents = stats.revenue_cents / stats.paid_bookings as i64;
        }

        stats
    }

    /// Share of bookings that reached payment, in `[0, 1]`.
    pub fn conversion_rate(&self) -> f64 {
        if self.total_bookings == 0 {
            0.0
        } else {
            self.paid_bookings as f64 / self.total_bookings as f64
        }
    }
}
