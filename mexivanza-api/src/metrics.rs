use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::{error::AppError, state::AppState};

pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub booking_replays: IntCounter,
    pub payment_updates: IntCounterVec,
    pub checkout_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("mexivanza".to_string()), None)?;

        let bookings_created = IntCounter::new("bookings_created_total", "Bookings submitted with a checkout session")?;
        let booking_replays = IntCounter::new("booking_replays_total", "Submissions answered from an idempotency key")?;
        let payment_updates = IntCounterVec::new(
            Opts::new("payment_updates_total", "Payment webhooks applied, by reported status"),
            &["status"],
        )?;
        let checkout_failures = IntCounter::new("checkout_failures_total", "Submissions rejected by the payment provider")?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(booking_replays.clone()))?;
        registry.register(Box::new(payment_updates.clone()))?;
        registry.register(Box::new(checkout_failures.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            booking_replays,
            payment_updates,
            checkout_failures,
        })
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::InternalServerError(format!("Metrics encoding failed: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
