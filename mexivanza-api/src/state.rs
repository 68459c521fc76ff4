use std::sync::Arc;
use tokio::sync::broadcast;

use mexivanza_booking::{BookingRules, BookingService, MockPaymentAdapter, PaymentOrchestrator};
use mexivanza_catalog::{PricingConfig, PricingEngine};
use mexivanza_core::events::EventPublisher;
use mexivanza_core::guard::RequestGuard;
use mexivanza_core::payment::PaymentAdapter;
use mexivanza_core::repository::{AvailabilityRepository, BookingRepository, BusinessRepository, PackageRepository};
use mexivanza_shared::models::events::SlotUpdatedEvent;
use mexivanza_store::memory::{
    InMemoryAvailabilityRepository, InMemoryBookingRepository, InMemoryBusinessRepository, InMemoryEventPublisher,
    InMemoryPackageRepository, InMemoryRequestGuard,
};

use crate::events::BroadcastingPublisher;
use crate::metrics::Metrics;
use crate::middleware::ResiliencyState;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub webhook_secret: String,
}

/// Storage and gateway adapters the API runs on.
#[derive(Clone)]
pub struct Backends {
    pub packages: Arc<dyn PackageRepository>,
    pub availability: Arc<dyn AvailabilityRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub businesses: Arc<dyn BusinessRepository>,
    pub guard: Arc<dyn RequestGuard>,
    pub events: Arc<dyn EventPublisher>,
    pub payments: Arc<dyn PaymentAdapter>,
}

impl Backends {
    /// Everything in process memory, with the mock payment provider.
    pub fn in_memory() -> Self {
        Self {
            packages: Arc::new(InMemoryPackageRepository::new()),
            availability: Arc::new(InMemoryAvailabilityRepository::new()),
            bookings: Arc::new(InMemoryBookingRepository::new()),
            businesses: Arc::new(InMemoryBusinessRepository::new()),
            guard: Arc::new(InMemoryRequestGuard::new()),
            events: Arc::new(InMemoryEventPublisher::new()),
            payments: Arc::new(MockPaymentAdapter::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub packages: Arc<dyn PackageRepository>,
    pub availability: Arc<dyn AvailabilityRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub businesses: Arc<dyn BusinessRepository>,
    pub guard: Arc<dyn RequestGuard>,
    pub booking_service: Arc<BookingService>,
    pub pricing: PricingEngine,
    pub sse_tx: broadcast::Sender<SlotUpdatedEvent>,
    pub auth: AuthConfig,
    pub rate_limit_per_minute: i64,
    pub metrics: Arc<Metrics>,
    pub resiliency: Arc<ResiliencyState>,
}

impl AppState {
    pub fn new(
        backends: Backends,
        auth: AuthConfig,
        rules: BookingRules,
        pricing: PricingConfig,
        rate_limit_per_minute: i64,
    ) -> Result<Self, prometheus::Error> {
        let (sse_tx, _) = broadcast::channel(100);
        let events: Arc<dyn EventPublisher> = Arc::new(BroadcastingPublisher::new(backends.events, sse_tx.clone()));
        let engine = PricingEngine::new(pricing);

        let booking_service = BookingService::new(
            backends.packages.clone(),
            backends.availability.clone(),
            backends.bookings.clone(),
            PaymentOrchestrator::new(backends.payments),
            backends.guard.clone(),
            events,
            engine.clone(),
            rules,
        );

        Ok(Self {
            packages: backends.packages,
            availability: backends.availability,
            bookings: backends.bookings,
            businesses: backends.businesses,
            guard: backends.guard,
            booking_service: Arc::new(booking_service),
            pricing: engine,
            sse_tx,
            auth,
            rate_limit_per_minute,
            metrics: Arc::new(Metrics::new()?),
            resiliency: Arc::new(ResiliencyState::default()),
        })
    }
}
