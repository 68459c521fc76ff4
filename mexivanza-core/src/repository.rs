use async_trait::async_trait;
use chrono::NaiveDate;
use mexivanza_catalog::{AvailabilitySlot, Business, BusinessFilter, PackageFilter, TravelExtra, TravelPackage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::booking::{Booking, BookingStatus, PaymentStatus};
use crate::BoxError;

/// Packages and the extras sold with them
#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn create_package(&self, package: &TravelPackage) -> Result<Uuid, BoxError>;

    async fn get_package(&self, id: Uuid) -> Result<Option<TravelPackage>, BoxError>;

    async fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<TravelPackage>, BoxError>;

    /// Returns false when no such package exists
    async fn update_package(&self, package: &TravelPackage) -> Result<bool, BoxError>;

    async fn delete_package(&self, id: Uuid) -> Result<bool, BoxError>;

    /// Global extras plus the ones scoped to `package_id`
    async fn list_extras(&self, package_id: Uuid) -> Result<Vec<TravelExtra>, BoxError>;

    async fn create_extra(&self, extra: &TravelExtra) -> Result<Uuid, BoxError>;

    async fn delete_extra(&self, id: Uuid) -> Result<bool, BoxError>;
}

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn list_slots(
        &self,
        package_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilitySlot>, BoxError>;

    async fn get_slot(&self, id: Uuid) -> Result<Option<AvailabilitySlot>, BoxError>;

    /// Inserts new slots; an existing (package, date) keeps its booked count
    /// and takes the new capacity and multiplier.
    async fn upsert_slots(&self, slots: &[AvailabilitySlot]) -> Result<usize, BoxError>;

    /// Atomically adds `travelers` to `booked_count` if capacity allows.
    /// `None` means the slot is missing or too full.
    async fn reserve_capacity(&self, slot_id: Uuid, travelers: i32) -> Result<Option<AvailabilitySlot>, BoxError>;

    async fn release_capacity(&self, slot_id: Uuid, travelers: i32) -> Result<Option<AvailabilitySlot>, BoxError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingFilter {
    pub customer_id: Option<String>,
    pub package_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.customer_id.as_ref().map_or(true, |c| &booking.customer_id == c)
            && self.package_id.map_or(true, |p| booking.package_id == p)
            && self.status.map_or(true, |s| booking.status == s)
    }
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> Result<Uuid, BoxError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, BoxError>;

    async fn find_by_idempotency_key(&self, customer_id: &str, key: &str) -> Result<Option<Booking>, BoxError>;

    async fn find_by_payment_session(&self, session_id: &str) -> Result<Option<Booking>, BoxError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<(), BoxError>;

    async fn set_payment_session(&self, id: Uuid, session_id: &str, url: &str) -> Result<(), BoxError>;

    /// Detaches a rolled-back booking from its idempotency key so the key
    /// can be submitted again.
    async fn clear_idempotency_key(&self, id: Uuid) -> Result<(), BoxError>;

    /// Newest first
    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BoxError>;
}

#[async_trait]
pub trait BusinessRepository: Send + Sync {
    async fn create_business(&self, business: &Business) -> Result<Uuid, BoxError>;

    async fn get_business(&self, id: Uuid) -> Result<Option<Business>, BoxError>;

    async fn list_businesses(&self, filter: &BusinessFilter) -> Result<Vec<Business>, BoxError>;

    async fn set_verified(&self, id: Uuid, verified: bool) -> Result<bool, BoxError>;
}
