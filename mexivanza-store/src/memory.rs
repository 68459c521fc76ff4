//! In-process repositories. Used by the `memory` backend for local runs and
//! by tests across the workspace.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use mexivanza_catalog::{AvailabilitySlot, Business, BusinessFilter, PackageFilter, TravelExtra, TravelPackage};
use mexivanza_core::events::EventPublisher;
use mexivanza_core::guard::RequestGuard;
use mexivanza_core::repository::{
    AvailabilityRepository, BookingFilter, BookingRepository, BusinessRepository, PackageRepository,
};
use mexivanza_core::{Booking, BookingStatus, BoxError, PaymentStatus};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, BoxError> {
    mutex.lock().map_err(|e| format!("Lock poisoned: {}", e).into())
}

#[derive(Default)]
pub struct InMemoryPackageRepository {
    packages: Mutex<HashMap<Uuid, TravelPackage>>,
    extras: Mutex<HashMap<Uuid, TravelExtra>>,
}

impl InMemoryPackageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PackageRepository for InMemoryPackageRepository {
    async fn create_package(&self, package: &TravelPackage) -> Result<Uuid, BoxError> {
        lock(&self.packages)?.insert(package.id, package.clone());
        Ok(package.id)
    }

    async fn get_package(&self, id: Uuid) -> Result<Option<TravelPackage>, BoxError> {
        Ok(lock(&self.packages)?.get(&id).cloned())
    }

    async fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<TravelPackage>, BoxError> {
        let mut packages: Vec<TravelPackage> =
            lock(&self.packages)?.values().filter(|p| filter.matches(p)).cloned().collect();
        // Featured first, then newest
        packages.sort_by(|a, b| b.is_featured.cmp(&a.is_featured).then(b.created_at.cmp(&a.created_at)));
        Ok(packages)
    }

    async fn update_package(&self, package: &TravelPackage) -> Result<bool, BoxError> {
        let mut packages = lock(&self.packages)?;
        match packages.get_mut(&package.id) {
            Some(existing) => {
                *existing = package.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_package(&self, id: Uuid) -> Result<bool, BoxError> {
        let removed = lock(&self.packages)?.remove(&id).is_some();
        if removed {
            lock(&self.extras)?.retain(|_, e| e.package_id != Some(id));
        }
        Ok(removed)
    }

    async fn list_extras(&self, package_id: Uuid) -> Result<Vec<TravelExtra>, BoxError> {
        let mut extras: Vec<TravelExtra> =
            lock(&self.extras)?.values().filter(|e| e.applies_to(package_id)).cloned().collect();
        extras.sort_by(|a, b| a.category.as_str().cmp(b.category.as_str()).then(a.price_cents.cmp(&b.price_cents)));
        Ok(extras)
    }

    async fn create_extra(&self, extra: &TravelExtra) -> Result<Uuid, BoxError> {
        lock(&self.extras)?.insert(extra.id, extra.clone());
        Ok(extra.id)
    }

    async fn delete_extra(&self, id: Uuid) -> Result<bool, BoxError> {
        Ok(lock(&self.extras)?.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryAvailabilityRepository {
    slots: Mutex<HashMap<Uuid, AvailabilitySlot>>,
}

impl InMemoryAvailabilityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityRepository for InMemoryAvailabilityRepository {
    async fn list_slots(
        &self,
        package_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilitySlot>, BoxError> {
        let mut slots: Vec<AvailabilitySlot> = lock(&self.slots)?
            .values()
            .filter(|s| s.package_id == package_id)
            .filter(|s| from.map_or(true, |f| s.date >= f) && to.map_or(true, |t| s.date <= t))
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.date);
        Ok(slots)
    }

    async fn get_slot(&self, id: Uuid) -> Result<Option<AvailabilitySlot>, BoxError> {
        Ok(lock(&self.slots)?.get(&id).cloned())
    }

    async fn upsert_slots(&self, slots: &[AvailabilitySlot]) -> Result<usize, BoxError> {
        let mut stored = lock(&self.slots)?;
        for slot in slots {
            let existing = stored
                .values_mut()
                .find(|s| s.package_id == slot.package_id && s.date == slot.date);
            match existing {
                Some(current) => {
                    current.capacity = slot.capacity.max(current.booked_count);
                    current.price_multiplier = slot.price_multiplier;
                }
                None => {
                    stored.insert(slot.id, slot.clone());
                }
            }
        }
        Ok(slots.len())
    }

    async fn reserve_capacity(&self, slot_id: Uuid, travelers: i32) -> Result<Option<AvailabilitySlot>, BoxError> {
        let mut stored = lock(&self.slots)?;
        let Some(slot) = stored.get_mut(&slot_id) else {
            return Ok(None);
        };
        if slot.reserve(travelers).is_err() {
            return Ok(None);
        }
        Ok(Some(slot.clone()))
    }

    async fn release_capacity(&self, slot_id: Uuid, travelers: i32) -> Result<Option<AvailabilitySlot>, BoxError> {
        let mut stored = lock(&self.slots)?;
        Ok(stored.get_mut(&slot_id).map(|slot| {
            slot.release(travelers);
            slot.clone()
        }))
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: Mutex<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> Result<Uuid, BoxError> {
        let mut bookings = lock(&self.bookings)?;
        if let Some(key) = &booking.idempotency_key {
            let duplicate = bookings
                .values()
                .any(|b| b.customer_id == booking.customer_id && b.idempotency_key.as_ref() == Some(key));
            if duplicate {
                return Err(format!("Duplicate idempotency key {}", key).into());
            }
        }
        bookings.insert(booking.id, booking.clone());
        Ok(booking.id)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
        Ok(lock(&self.bookings)?.get(&id).cloned())
    }

    async fn find_by_idempotency_key(&self, customer_id: &str, key: &str) -> Result<Option<Booking>, BoxError> {
        Ok(lock(&self.bookings)?
            .values()
            .find(|b| b.customer_id == customer_id && b.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn find_by_payment_session(&self, session_id: &str) -> Result<Option<Booking>, BoxError> {
        Ok(lock(&self.bookings)?
            .values()
            .find(|b| b.payment_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<(), BoxError> {
        let mut bookings = lock(&self.bookings)?;
        let booking = bookings.get_mut(&id).ok_or_else(|| format!("Booking {} not found", id))?;
        booking.status = status;
        booking.payment_status = payment_status;
        booking.updated_at = Utc::now();
        Ok(())
    }

    async fn set_payment_session(&self, id: Uuid, session_id: &str, url: &str) -> Result<(), BoxError> {
        let mut bookings = lock(&self.bookings)?;
        let booking = bookings.get_mut(&id).ok_or_else(|| format!("Booking {} not found", id))?;
        booking.payment_session_id = Some(session_id.to_string());
        booking.payment_url = Some(url.to_string());
        booking.updated_at = Utc::now();
        Ok(())
    }

    async fn clear_idempotency_key(&self, id: Uuid) -> Result<(), BoxError> {
        let mut bookings = lock(&self.bookings)?;
        let booking = bookings.get_mut(&id).ok_or_else(|| format!("Booking {} not found", id))?;
        booking.idempotency_key = None;
        booking.updated_at = Utc::now();
        Ok(())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BoxError> {
        let mut bookings: Vec<Booking> =
            lock(&self.bookings)?.values().filter(|b| filter.matches(b)).cloned().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}

#[derive(Default)]
pub struct InMemoryBusinessRepository {
    businesses: Mutex<HashMap<Uuid, Business>>,
}

impl InMemoryBusinessRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BusinessRepository for InMemoryBusinessRepository {
    async fn create_business(&self, business: &Business) -> Result<Uuid, BoxError> {
        lock(&self.businesses)?.insert(business.id, business.clone());
        Ok(business.id)
    }

    async fn get_business(&self, id: Uuid) -> Result<Option<Business>, BoxError> {
        Ok(lock(&self.businesses)?.get(&id).cloned())
    }

    async fn list_businesses(&self, filter: &BusinessFilter) -> Result<Vec<Business>, BoxError> {
        let all: Vec<Business> = lock(&self.businesses)?.values().cloned().collect();
        Ok(filter.apply(all))
    }

    async fn set_verified(&self, id: Uuid, verified: bool) -> Result<bool, BoxError> {
        let mut businesses = lock(&self.businesses)?;
        Ok(businesses.get_mut(&id).map(|b| b.is_verified = verified).is_some())
    }
}

/// Claims and rate windows kept in process memory, expiring lazily.
#[derive(Default)]
pub struct InMemoryRequestGuard {
    claims: Mutex<HashMap<String, Instant>>,
    windows: Mutex<HashMap<String, (i64, Instant)>>,
}

impl InMemoryRequestGuard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestGuard for InMemoryRequestGuard {
    async fn claim_once(&self, key: &str, ttl_seconds: u64) -> Result<bool, BoxError> {
        let mut claims = lock(&self.claims)?;
        let now = Instant::now();
        if let Some(expires_at) = claims.get(key) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        claims.insert(key.to_string(), now + Duration::from_secs(ttl_seconds));
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<(), BoxError> {
        lock(&self.claims)?.remove(key);
        Ok(())
    }

    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> Result<bool, BoxError> {
        let mut windows = lock(&self.windows)?;
        let now = Instant::now();
        let window = Duration::from_secs(window_seconds.max(1) as u64);
        let entry = windows.entry(key.to_string()).or_insert((0, now + window));
        if entry.1 <= now {
            *entry = (0, now + window);
        }
        entry.0 += 1;
        Ok(entry.0 <= limit)
    }
}

/// Records every published event instead of shipping it anywhere.
#[derive(Default)]
pub struct InMemoryEventPublisher {
    published: Mutex<Vec<(String, String, String)>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .map(|events| events.iter().map(|(topic, _, _)| topic.clone()).collect())
            .unwrap_or_default()
    }

    /// Payloads published on `topic`, oldest first
    pub fn payloads(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|(t, _, _)| t == topic)
                    .map(|(_, _, payload)| payload.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), BoxError> {
        tracing::debug!("Recorded event on {} for {}", topic, key);
        lock(&self.published)?.push((topic.to_string(), key.to_string(), payload.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mexivanza_catalog::PricingTier;
    use mexivanza_shared::Localized;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 12, d).unwrap()
    }

    #[tokio::test]
    async fn test_reserve_capacity_never_overbooks() {
        let repo = InMemoryAvailabilityRepository::new();
        let package_id = Uuid::new_v4();
        let slot = AvailabilitySlot::new(package_id, date(10), 5, 1.0);
        repo.upsert_slots(&[slot.clone()]).await.unwrap();

        let reserved = repo.reserve_capacity(slot.id, 4).await.unwrap().unwrap();
        assert_eq!(reserved.booked_count, 4);
        assert!(repo.reserve_capacity(slot.id, 2).await.unwrap().is_none());
        assert!(repo.reserve_capacity(slot.id, 1).await.unwrap().is_some());

        let released = repo.release_capacity(slot.id, 3).await.unwrap().unwrap();
        assert_eq!(released.booked_count, 2);
        assert!(repo.reserve_capacity(Uuid::new_v4(), 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_booked_count() {
        let repo = InMemoryAvailabilityRepository::new();
        let package_id = Uuid::new_v4();
        let slot = AvailabilitySlot::new(package_id, date(10), 10, 1.0);
        repo.upsert_slots(&[slot.clone()]).await.unwrap();
        repo.reserve_capacity(slot.id, 3).await.unwrap();

        let replacement = AvailabilitySlot::new(package_id, date(10), 12, 1.5);
        repo.upsert_slots(&[replacement, AvailabilitySlot::new(package_id, date(11), 10, 1.0)])
            .await
            .unwrap();

        let slots = repo.list_slots(package_id, None, None).await.unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, slot.id);
        assert_eq!(slots[0].booked_count, 3);
        assert_eq!(slots[0].capacity, 12);
        assert_eq!(slots[0].price_multiplier, 1.5);

        let ranged = repo.list_slots(package_id, Some(date(11)), Some(date(11))).await.unwrap();
        assert_eq!(ranged.len(), 1);
    }

    #[tokio::test]
    async fn test_extras_scoped_and_global() {
        let repo = InMemoryPackageRepository::new();
        let package = TravelPackage::new(Localized::new("Oaxaca", "Oaxaca"), "Oaxaca", "Oaxaca", 3, PricingTier::new(100_000, "MXN"));
        repo.create_package(&package).await.unwrap();

        let global = TravelExtra::new(Localized::new("Seguro", "Insurance"), 20_000, true);
        let mut scoped = TravelExtra::new(Localized::new("Mezcal", "Mezcal tasting"), 50_000, false);
        scoped.package_id = Some(package.id);
        let mut other = TravelExtra::new(Localized::new("Buceo", "Diving"), 90_000, true);
        other.package_id = Some(Uuid::new_v4());
        for extra in [&global, &scoped, &other] {
            repo.create_extra(extra).await.unwrap();
        }

        let extras = repo.list_extras(package.id).await.unwrap();
        assert_eq!(extras.len(), 2);
        assert!(extras.iter().all(|e| e.id != other.id));

        assert!(repo.delete_package(package.id).await.unwrap());
        assert_eq!(repo.list_extras(package.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_once_and_release() {
        let guard = InMemoryRequestGuard::new();
        assert!(guard.claim_once("k", 60).await.unwrap());
        assert!(!guard.claim_once("k", 60).await.unwrap());
        guard.release("k").await.unwrap();
        assert!(guard.claim_once("k", 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_rate_limit_counts_within_window() {
        let guard = InMemoryRequestGuard::new();
        assert!(guard.check_rate_limit("ip", 2, 60).await.unwrap());
        assert!(guard.check_rate_limit("ip", 2, 60).await.unwrap());
        assert!(!guard.check_rate_limit("ip", 2, 60).await.unwrap());
        assert!(guard.check_rate_limit("other", 2, 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_event_publisher_records_topics() {
        let events = InMemoryEventPublisher::new();
        events.publish("booking.created", "b1", "{}").await.unwrap();
        events.publish("availability.updated", "s1", "{\"x\":1}").await.unwrap();
        assert_eq!(events.topics(), vec!["booking.created", "availability.updated"]);
        assert_eq!(events.payloads("availability.updated"), vec!["{\"x\":1}"]);
    }
}
