use crate::error::BookingError;
use crate::manager::{BookingEvent, BookingManager};
use crate::orchestrator::PaymentOrchestrator;
use chrono::{NaiveDate, Utc};
use mexivanza_catalog::{
    AvailabilitySlot, PriceQuote, PricingEngine, PricingInput, SelectedExtra, TierKind, TravelPackage,
};
use mexivanza_core::events::{publish_json, EventPublisher, TOPIC_BOOKING_CREATED, TOPIC_PAYMENT_STATUS, TOPIC_SLOT_UPDATED};
use mexivanza_core::guard::RequestGuard;
use mexivanza_core::payment::CheckoutRequest;
use mexivanza_core::repository::{AvailabilityRepository, BookingRepository, PackageRepository};
use mexivanza_core::{Booking, BookingPayload, PaymentStatus};
use mexivanza_shared::models::events::{BookingCreatedEvent, PaymentStatusChangedEvent, SlotUpdatedEvent};
use mexivanza_shared::Language;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRules {
    pub idempotency_ttl_seconds: u64,
    pub max_travelers: u32,
    pub success_url: String,
    pub cancel_url: String,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            idempotency_ttl_seconds: 86_400,
            max_travelers: 20,
            success_url: "http://localhost:5173/payments?status=success".to_string(),
            cancel_url: "http://localhost:5173/payments?status=cancelled".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub package_id: Uuid,
    pub date: NaiveDate,
    pub traveler_count: u32,
    #[serde(default)]
    pub extras: Vec<SelectedExtra>,
    #[serde(default)]
    pub tier: Option<TierKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub booking: Booking,
    pub session_id: String,
    pub checkout_url: String,
    /// Slot after the reservation; `None` when the submission was a replay
    pub slot: Option<AvailabilitySlot>,
    pub replayed: bool,
}

/// Payment status notification. Either identifier is enough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentUpdate {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub booking_id: Option<Uuid>,
    pub status: PaymentStatus,
}

/// Server side of the booking flow: quoting, submission and payment updates.
pub struct BookingService {
    packages: Arc<dyn PackageRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    manager: BookingManager,
    payments: PaymentOrchestrator,
    guard: Arc<dyn RequestGuard>,
    events: Arc<dyn EventPublisher>,
    pricing: PricingEngine,
    rules: BookingRules,
}

impl BookingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        packages: Arc<dyn PackageRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        bookings: Arc<dyn BookingRepository>,
        payments: PaymentOrchestrator,
        guard: Arc<dyn RequestGuard>,
        events: Arc<dyn EventPublisher>,
        pricing: PricingEngine,
        rules: BookingRules,
    ) -> Self {
        Self {
            manager: BookingManager::new(bookings, availability.clone()),
            packages,
            availability,
            payments,
            guard,
            events,
            pricing,
            rules,
        }
    }

    pub fn manager(&self) -> &BookingManager {
        &self.manager
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<PriceQuote, BookingError> {
        if request.traveler_count == 0 || request.traveler_count > self.rules.max_travelers {
            return Err(BookingError::Validation(format!(
                "Traveler count must be between 1 and {}",
                self.rules.max_travelers
            )));
        }

        let package = self.load_package(request.package_id).await?;
        let slots = self
            .availability
            .list_slots(package.id, Some(request.date), Some(request.date))
            .await
            .map_err(BookingError::storage)?;
        let extras = self.packages.list_extras(package.id).await.map_err(BookingError::storage)?;

        Ok(self.pricing.quote(&PricingInput {
            package: &package,
            tier: request.tier.unwrap_or(TierKind::Standard),
            traveler_count: request.traveler_count,
            selected_date: request.date,
            slots: &slots,
            extras: &extras,
            selected_extras: &request.extras,
        })?)
    }

    /// Submits a booking: claims the idempotency key, re-prices, reserves
    /// capacity, stores the pending booking and opens a checkout session.
    ///
    /// Resubmitting with the same key returns the original checkout. When
    /// the first attempt failed, the same key starts a fresh booking.
    pub async fn submit(&self, customer_id: &str, payload: &BookingPayload) -> Result<SubmissionOutcome, BookingError> {
        let key = payload.idempotency_key.trim();
        if key.is_empty() {
            return Err(BookingError::Validation("Idempotency key is required".to_string()));
        }
        let guard_key = format!("booking:idempotency:{}:{}", customer_id, key);

        let claimed = self
            .guard
            .claim_once(&guard_key, self.rules.idempotency_ttl_seconds)
            .await
            .map_err(BookingError::storage)?;

        if !claimed {
            return self.replay(customer_id, key).await;
        }

        let result = self.submit_claimed(customer_id, payload).await;
        if result.is_err() {
            if let Err(e) = self.guard.release(&guard_key).await {
                tracing::warn!("Failed to release idempotency key {}: {}", guard_key, e);
            }
        }
        result
    }

    async fn replay(&self, customer_id: &str, key: &str) -> Result<SubmissionOutcome, BookingError> {
        let existing = self
            .manager
            .bookings()
            .find_by_idempotency_key(customer_id, key)
            .await
            .map_err(BookingError::storage)?;

        match existing {
            Some(booking) => match (booking.payment_session_id.clone(), booking.payment_url.clone()) {
                (Some(session_id), Some(checkout_url)) => {
                    tracing::info!("Replayed submission {} for booking {}", key, booking.id);
                    Ok(SubmissionOutcome {
                        booking,
                        session_id,
                        checkout_url,
                        slot: None,
                        replayed: true,
                    })
                }
                _ => Err(BookingError::SubmissionInProgress),
            },
            None => Err(BookingError::SubmissionInProgress),
        }
    }

    async fn submit_claimed(&self, customer_id: &str, payload: &BookingPayload) -> Result<SubmissionOutcome, BookingError> {
        let package = self.load_package(payload.package_id).await?;
        let slot = self
            .availability
            .get_slot(payload.availability_id)
            .await
            .map_err(BookingError::storage)?
            .filter(|s| s.package_id == package.id)
            .ok_or(BookingError::SlotNotFound(payload.availability_id))?;

        validate_payload(&package, &slot, payload, self.rules.max_travelers)?;

        let extras = self.packages.list_extras(package.id).await.map_err(BookingError::storage)?;
        let quote = self.pricing.quote(&PricingInput {
            package: &package,
            tier: TierKind::Standard,
            traveler_count: payload.traveler_count,
            selected_date: payload.start_date,
            slots: std::slice::from_ref(&slot),
            extras: &extras,
            selected_extras: &payload.booking_data.extras,
        })?;

        if quote.total_cents != payload.total_cents {
            return Err(BookingError::PriceMismatch {
                submitted: payload.total_cents,
                computed: quote.total_cents,
            });
        }
        if quote.currency != payload.currency {
            return Err(BookingError::Validation(format!(
                "Currency {} does not match package currency {}",
                payload.currency, quote.currency
            )));
        }

        let mut booking = Booking::from_payload(customer_id, payload, quote.total_cents);
        let reserved = self.manager.create_pending(&booking).await?;

        let checkout = CheckoutRequest {
            booking_id: booking.id,
            package_id: package.id,
            amount_cents: booking.total_cents,
            currency: booking.currency.clone(),
            description: package.title_in(Language::Es).to_string(),
            customer_email: booking.contact.email.clone(),
            traveler_count: payload.traveler_count,
            success_url: self.rules.success_url.clone(),
            cancel_url: self.rules.cancel_url.clone(),
        };

        let session = match self.payments.create_checkout(&checkout).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Checkout failed for booking {}: {}", booking.id, e);
                self.roll_back(booking.id).await;
                return Err(BookingError::PaymentUnavailable(e.to_string()));
            }
        };

        if let Err(e) = self
            .manager
            .bookings()
            .set_payment_session(booking.id, &session.session_id, &session.url)
            .await
        {
            tracing::error!("Failed to store checkout session for booking {}: {}", booking.id, e);
            self.roll_back(booking.id).await;
            return Err(BookingError::storage(e));
        }
        booking.payment_session_id = Some(session.session_id.clone());
        booking.payment_url = Some(session.url.clone());

        publish_json(
            self.events.as_ref(),
            TOPIC_BOOKING_CREATED,
            &booking.id.to_string(),
            &BookingCreatedEvent {
                booking_id: booking.id,
                package_id: booking.package_id,
                customer_id: booking.customer_id.clone(),
                traveler_count: booking.traveler_count,
                total_cents: booking.total_cents,
                currency: booking.currency.clone(),
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;
        self.publish_slot(&reserved).await;

        Ok(SubmissionOutcome {
            booking,
            session_id: session.session_id,
            checkout_url: session.url,
            slot: Some(reserved),
            replayed: false,
        })
    }

    /// Cancels a booking whose submission failed after seats were reserved,
    /// returns the seats and frees its idempotency key for a retry.
    async fn roll_back(&self, booking_id: Uuid) {
        match self.manager.mark_failed(booking_id).await {
            Ok((_, Some(slot))) => self.publish_slot(&slot).await,
            Ok((_, None)) => {}
            Err(e) => tracing::error!("Failed to roll back booking {}: {}", booking_id, e),
        }
        if let Err(e) = self.manager.bookings().clear_idempotency_key(booking_id).await {
            tracing::error!("Failed to clear idempotency key of booking {}: {}", booking_id, e);
        }
    }

    /// Applies a payment notification. Pending notifications change nothing.
    pub async fn apply_payment_update(
        &self,
        update: &PaymentUpdate,
    ) -> Result<(Booking, Option<AvailabilitySlot>), BookingError> {
        let booking = self.find_for_update(update).await?;

        let status = match booking.payment_session_id.as_deref() {
            Some(session_id) => self
                .payments
                .resolve_status(session_id, update.status)
                .await
                .map_err(|e| BookingError::PaymentUnavailable(e.to_string()))?,
            None => update.status,
        };

        let event = match status {
            PaymentStatus::Pending => return Ok((booking, None)),
            PaymentStatus::Paid => BookingEvent::PaymentSucceeded,
            PaymentStatus::Failed => BookingEvent::PaymentFailed,
            PaymentStatus::Refunded => BookingEvent::Refunded,
        };

        self.apply_event(booking.id, event).await
    }

    /// Applies a lifecycle event and publishes the resulting state.
    pub async fn apply_event(
        &self,
        booking_id: Uuid,
        event: BookingEvent,
    ) -> Result<(Booking, Option<AvailabilitySlot>), BookingError> {
        let before = self.manager.get(booking_id).await?;
        let (booking, released) = self.manager.apply(booking_id, event).await?;

        if before.status != booking.status || before.payment_status != booking.payment_status {
            publish_json(
                self.events.as_ref(),
                TOPIC_PAYMENT_STATUS,
                &booking.id.to_string(),
                &PaymentStatusChangedEvent {
                    booking_id: booking.id,
                    payment_status: booking.payment_status.to_string(),
                    booking_status: booking.status.to_string(),
                    timestamp: Utc::now().timestamp(),
                },
            )
            .await;
        }
        if let Some(slot) = &released {
            self.publish_slot(slot).await;
        }

        Ok((booking, released))
    }

    async fn find_for_update(&self, update: &PaymentUpdate) -> Result<Booking, BookingError> {
        let repo = self.manager.bookings();
        if let Some(session_id) = &update.session_id {
            if let Some(booking) = repo.find_by_payment_session(session_id).await.map_err(BookingError::storage)? {
                return Ok(booking);
            }
        }
        match update.booking_id {
            Some(id) => self.manager.get(id).await,
            None => Err(BookingError::Validation("session_id or booking_id is required".to_string())),
        }
    }

    async fn load_package(&self, id: Uuid) -> Result<TravelPackage, BookingError> {
        self.packages
            .get_package(id)
            .await
            .map_err(BookingError::storage)?
            .filter(|p| p.is_published)
            .ok_or(BookingError::PackageNotFound(id))
    }

    async fn publish_slot(&self, slot: &AvailabilitySlot) {
        publish_json(
            self.events.as_ref(),
            TOPIC_SLOT_UPDATED,
            &slot.package_id.to_string(),
            &SlotUpdatedEvent {
                package_id: slot.package_id,
                availability_id: slot.id,
                date: slot.date,
                booked_count: slot.booked_count,
                capacity: slot.capacity,
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;
    }
}

/// Structural checks on a submitted payload against the package and slot.
pub fn validate_payload(
    package: &TravelPackage,
    slot: &AvailabilitySlot,
    payload: &BookingPayload,
    max_travelers: u32,
) -> Result<(), BookingError> {
    let travelers = &payload.booking_data.travelers;

    if payload.traveler_count == 0 || payload.traveler_count > max_travelers {
        return Err(BookingError::Validation(format!(
            "Traveler count must be between 1 and {}",
            max_travelers
        )));
    }
    if travelers.len() != payload.traveler_count as usize {
        return Err(BookingError::Validation(format!(
            "Traveler count {} does not match {} traveler entries",
            payload.traveler_count,
            travelers.len()
        )));
    }
    if let Some(i) = travelers.iter().position(|t| !t.is_complete()) {
        return Err(BookingError::Validation(format!("Traveler {} needs a name and an age above zero", i)));
    }
    if !payload.contact.is_complete() {
        return Err(BookingError::Validation("Contact name and email are required".to_string()));
    }
    if slot.date != payload.start_date {
        return Err(BookingError::Validation(format!(
            "Start date {} does not match availability date {}",
            payload.start_date, slot.date
        )));
    }
    if package.end_date(payload.start_date) != payload.end_date {
        return Err(BookingError::Validation("End date does not match package duration".to_string()));
    }
    if payload.booking_data.extras.iter().any(|e| e.quantity == 0) {
        return Err(BookingError::Validation("Extras must have a positive quantity".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::MockPaymentAdapter;
    use crate::wizard::{BookingWizard, WizardStep};
    use mexivanza_catalog::{PricingTier, TravelExtra};
    use mexivanza_core::repository::BookingFilter;
    use mexivanza_core::{BookingStatus, BoxError, ContactInfo, Traveler};
    use mexivanza_shared::Localized;
    use mexivanza_store::memory::{
        InMemoryAvailabilityRepository, InMemoryBookingRepository, InMemoryEventPublisher,
        InMemoryPackageRepository, InMemoryRequestGuard,
    };

    /// Booking store that loses every checkout session write.
    struct SessionStoreDown(InMemoryBookingRepository);

    #[async_trait::async_trait]
    impl BookingRepository for SessionStoreDown {
        async fn create_booking(&self, booking: &Booking) -> Result<Uuid, BoxError> {
            self.0.create_booking(booking).await
        }

        async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
            self.0.get_booking(id).await
        }

        async fn find_by_idempotency_key(&self, customer_id: &str, key: &str) -> Result<Option<Booking>, BoxError> {
            self.0.find_by_idempotency_key(customer_id, key).await
        }

        async fn find_by_payment_session(&self, session_id: &str) -> Result<Option<Booking>, BoxError> {
            self.0.find_by_payment_session(session_id).await
        }

        async fn update_status(&self, id: Uuid, status: BookingStatus, payment_status: PaymentStatus) -> Result<(), BoxError> {
            self.0.update_status(id, status, payment_status).await
        }

        async fn set_payment_session(&self, _id: Uuid, _session_id: &str, _url: &str) -> Result<(), BoxError> {
            Err("connection reset".into())
        }

        async fn clear_idempotency_key(&self, id: Uuid) -> Result<(), BoxError> {
            self.0.clear_idempotency_key(id).await
        }

        async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BoxError> {
            self.0.list_bookings(filter).await
        }
    }

    struct Harness {
        service: BookingService,
        bookings: Arc<dyn BookingRepository>,
        packages: Arc<InMemoryPackageRepository>,
        availability: Arc<InMemoryAvailabilityRepository>,
        events: Arc<InMemoryEventPublisher>,
        adapter: Arc<MockPaymentAdapter>,
        package: TravelPackage,
        slot: AvailabilitySlot,
        extra: TravelExtra,
    }

    async fn harness_with(adapter: MockPaymentAdapter, capacity: i32) -> Harness {
        harness_on(adapter, Arc::new(InMemoryBookingRepository::new()), capacity).await
    }

    async fn harness_on(adapter: MockPaymentAdapter, bookings: Arc<dyn BookingRepository>, capacity: i32) -> Harness {
        let packages = Arc::new(InMemoryPackageRepository::new());
        let availability = Arc::new(InMemoryAvailabilityRepository::new());
        let events = Arc::new(InMemoryEventPublisher::new());
        let adapter = Arc::new(adapter);

        let mut package = TravelPackage::new(
            Localized::new("Pueblos mágicos", "Magic towns"),
            "Centro",
            "Puebla",
            3,
            PricingTier::new(100_000, "MXN"),
        );
        package.is_published = true;
        packages.create_package(&package).await.unwrap();

        let slot = AvailabilitySlot::new(package.id, NaiveDate::from_ymd_opt(2026, 11, 14).unwrap(), capacity, 1.2);
        availability.upsert_slots(&[slot.clone()]).await.unwrap();

        let mut extra = TravelExtra::new(Localized::new("Temazcal", "Temazcal"), 50_000, true);
        extra.package_id = Some(package.id);
        packages.create_extra(&extra).await.unwrap();

        let service = BookingService::new(
            packages.clone(),
            availability.clone(),
            bookings.clone(),
            PaymentOrchestrator::new(adapter.clone()),
            Arc::new(InMemoryRequestGuard::new()),
            events.clone(),
            PricingEngine::default(),
            BookingRules::default(),
        );

        Harness { service, bookings, packages, availability, events, adapter, package, slot, extra }
    }

    async fn harness() -> Harness {
        harness_with(MockPaymentAdapter::new(), 10).await
    }

    async fn payload(h: &Harness, key: &str) -> BookingPayload {
        let slots = h.availability.list_slots(h.package.id, None, None).await.unwrap();
        let extras = h.packages.list_extras(h.package.id).await.unwrap();
        let mut wizard = BookingWizard::new(h.package.clone(), slots, extras);

        wizard.select_date(h.slot.date).unwrap();
        wizard.next().unwrap();
        wizard.update_traveler(0, Traveler::new("Ana", 31)).unwrap();
        wizard.add_traveler(Traveler::new("Luis", 33));
        wizard.set_contact(ContactInfo::new("Ana", "ana@example.mx"));
        wizard.next().unwrap();
        wizard.set_extra_quantity(h.extra.id, 1).unwrap();
        assert_eq!(wizard.next().unwrap(), WizardStep::Payment);
        wizard.submit(key).unwrap()
    }

    #[tokio::test]
    async fn test_quote_matches_reference_total() {
        let h = harness().await;
        let quote = h
            .service
            .quote(&QuoteRequest {
                package_id: h.package.id,
                date: h.slot.date,
                traveler_count: 2,
                extras: vec![SelectedExtra { extra_id: h.extra.id, quantity: 1 }],
                tier: None,
            })
            .await
            .unwrap();
        assert_eq!(quote.total_cents, 340_000);
    }

    #[tokio::test]
    async fn test_submit_reserves_and_creates_checkout() {
        let h = harness().await;
        let payload = payload(&h, "key-1").await;

        let outcome = h.service.submit("customer-1", &payload).await.unwrap();
        assert!(!outcome.replayed);
        assert_eq!(outcome.booking.status, BookingStatus::Pending);
        assert_eq!(outcome.booking.payment_status, PaymentStatus::Pending);
        assert_eq!(outcome.booking.total_cents, 340_000);
        assert_eq!(outcome.slot.unwrap().booked_count, 2);
        assert!(outcome.checkout_url.contains(&outcome.session_id));

        let topics = h.events.topics();
        assert!(topics.contains(&TOPIC_BOOKING_CREATED.to_string()));
        assert!(topics.contains(&TOPIC_SLOT_UPDATED.to_string()));
    }

    #[tokio::test]
    async fn test_double_submit_returns_same_booking() {
        let h = harness().await;
        let payload = payload(&h, "key-dup").await;

        let first = h.service.submit("customer-1", &payload).await.unwrap();
        let second = h.service.submit("customer-1", &payload).await.unwrap();

        assert!(second.replayed);
        assert_eq!(first.booking.id, second.booking.id);
        assert_eq!(first.checkout_url, second.checkout_url);

        let slot = h.availability.get_slot(h.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.booked_count, 2);
    }

    #[tokio::test]
    async fn test_tampered_total_is_rejected_and_key_released() {
        let h = harness().await;
        let mut tampered = payload(&h, "key-t").await;
        tampered.total_cents = 100;

        let err = h.service.submit("customer-1", &tampered).await.unwrap_err();
        assert!(matches!(err, BookingError::PriceMismatch { submitted: 100, computed: 340_000 }));

        let honest = payload(&h, "key-t").await;
        assert!(h.service.submit("customer-1", &honest).await.is_ok());
    }

    #[tokio::test]
    async fn test_overbooking_is_refused() {
        let h = harness_with(MockPaymentAdapter::new(), 3).await;
        let first = payload(&h, "a").await;
        let second = payload(&h, "b").await;

        h.service.submit("customer-1", &first).await.unwrap();
        let err = h.service.submit("customer-2", &second).await.unwrap_err();
        assert!(matches!(err, BookingError::CapacityUnavailable { requested: 2 }));
    }

    #[tokio::test]
    async fn test_gateway_failure_releases_capacity() {
        let h = harness_with(MockPaymentAdapter::failing(), 10).await;
        let payload = payload(&h, "key-f").await;

        let err = h.service.submit("customer-1", &payload).await.unwrap_err();
        assert!(matches!(err, BookingError::PaymentUnavailable(_)));

        let slot = h.availability.get_slot(h.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.booked_count, 0);
    }

    #[tokio::test]
    async fn test_retry_after_gateway_failure_with_same_key() {
        let adapter = MockPaymentAdapter::new();
        adapter.fail_next(1);
        let h = harness_with(adapter, 10).await;
        let payload = payload(&h, "key-retry").await;

        let err = h.service.submit("customer-1", &payload).await.unwrap_err();
        assert!(matches!(err, BookingError::PaymentUnavailable(_)));

        let retry = h.service.submit("customer-1", &payload).await.unwrap();
        assert!(!retry.replayed);
        assert_eq!(retry.booking.status, BookingStatus::Pending);
        assert_eq!(retry.slot.unwrap().booked_count, 2);

        let mine = h
            .bookings
            .list_bookings(&BookingFilter { customer_id: Some("customer-1".to_string()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        let failed = mine.iter().find(|b| b.id != retry.booking.id).unwrap();
        assert_eq!(failed.status, BookingStatus::Cancelled);
        assert_eq!(failed.payment_status, PaymentStatus::Failed);
        assert_eq!(failed.idempotency_key, None);

        // a later resubmission replays the booking that went through
        let again = h.service.submit("customer-1", &payload).await.unwrap();
        assert!(again.replayed);
        assert_eq!(again.booking.id, retry.booking.id);
    }

    #[tokio::test]
    async fn test_session_store_failure_releases_capacity() {
        let bookings = Arc::new(SessionStoreDown(InMemoryBookingRepository::new()));
        let h = harness_on(MockPaymentAdapter::new(), bookings, 10).await;
        let payload = payload(&h, "key-s").await;

        let err = h.service.submit("customer-1", &payload).await.unwrap_err();
        assert!(matches!(err, BookingError::Storage(_)));

        let slot = h.availability.get_slot(h.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.booked_count, 0);

        let stored = h.bookings.list_bookings(&BookingFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, BookingStatus::Cancelled);
        assert_eq!(stored[0].idempotency_key, None);
    }

    #[tokio::test]
    async fn test_payment_updates() {
        let h = harness().await;
        let payload = payload(&h, "key-p").await;
        let outcome = h.service.submit("customer-1", &payload).await.unwrap();

        let update = PaymentUpdate {
            session_id: Some(outcome.session_id.clone()),
            booking_id: None,
            status: PaymentStatus::Paid,
        };
        let (paid, released) = h.service.apply_payment_update(&update).await.unwrap();
        assert_eq!(paid.status, BookingStatus::Confirmed);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(released.is_none());

        // replayed webhook is harmless
        let (again, _) = h.service.apply_payment_update(&update).await.unwrap();
        assert_eq!(again.payment_status, PaymentStatus::Paid);

        h.adapter.set_status(&outcome.session_id, PaymentStatus::Refunded);
        let (refunded, released) = h.service.apply_payment_update(&update).await.unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert_eq!(released.unwrap().booked_count, 0);
    }

    #[tokio::test]
    async fn test_payload_validation() {
        let h = harness().await;
        let mut bad = payload(&h, "key-v").await;
        bad.booking_data.travelers[1].age = 0;
        assert!(matches!(h.service.submit("c", &bad).await, Err(BookingError::Validation(_))));

        let mut bad = payload(&h, "key-v2").await;
        bad.end_date = bad.start_date;
        assert!(matches!(h.service.submit("c", &bad).await, Err(BookingError::Validation(_))));

        let mut bad = payload(&h, "key-v3").await;
        bad.idempotency_key = "  ".to_string();
        assert!(matches!(h.service.submit("c", &bad).await, Err(BookingError::Validation(_))));
    }
}
