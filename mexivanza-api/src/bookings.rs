use axum::{
    extract::{Extension, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use mexivanza_booking::{BookingError, BookingWizard, QuoteRequest, WizardError, WizardStep};
use mexivanza_catalog::{format_amount, PriceQuote, SelectedExtra};
use mexivanza_core::repository::BookingFilter;
use mexivanza_core::{Booking, BookingPayload, ContactInfo, Traveler};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{circuit_breaker_middleware, customer_auth_middleware, CustomerClaims},
    packages::load_published,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub quote: PriceQuote,
    pub total_display: String,
}

/// Complete booking form, validated step by step before it becomes a payload.
#[derive(Debug, Deserialize)]
pub struct PrepareRequest {
    pub package_id: Uuid,
    pub date: NaiveDate,
    pub travelers: Vec<Traveler>,
    #[serde(default)]
    pub extras: Vec<SelectedExtra>,
    pub contact: ContactInfo,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrepareResponse {
    pub payload: BookingPayload,
    pub total_display: String,
}

/// Unified answer for every provider: where to send the customer next.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub booking_id: Uuid,
    pub session_id: String,
    pub url: String,
    pub total_cents: i64,
    pub currency: String,
    pub replayed: bool,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/quote", post(quote))
        .route("/prepare", post(prepare));

    let submit = Router::new()
        .route("/", post(submit_booking))
        .route_layer(middleware::from_fn_with_state(state.clone(), circuit_breaker_middleware));

    let customer = Router::new()
        .merge(submit)
        .route("/mine", get(my_bookings))
        .route_layer(middleware::from_fn_with_state(state, customer_auth_middleware));

    public.merge(customer)
}

async fn quote(State(state): State<AppState>, Json(req): Json<QuoteRequest>) -> Result<Json<QuoteResponse>, AppError> {
    let quote = state.booking_service.quote(&req).await?;
    let total_display = format_amount(quote.total_cents, &quote.currency);
    Ok(Json(QuoteResponse { quote, total_display }))
}

async fn prepare(
    State(state): State<AppState>,
    Json(req): Json<PrepareRequest>,
) -> Result<Json<PrepareResponse>, AppError> {
    let package = load_published(&state, req.package_id).await?;
    let slots = state
        .availability
        .list_slots(package.id, Some(req.date), Some(req.date))
        .await
        .map_err(AppError::internal)?;
    let extras = state.packages.list_extras(package.id).await.map_err(AppError::internal)?;

    let mut wizard = BookingWizard::new(package, slots, extras).with_engine(state.pricing.clone());

    wizard.select_date(req.date)?;
    wizard.next()?;

    let mut travelers = req.travelers.into_iter();
    let first = travelers.next().ok_or(WizardError::NoTravelers)?;
    wizard.update_traveler(0, first)?;
    for traveler in travelers {
        wizard.add_traveler(traveler);
    }
    wizard.set_contact(req.contact);
    wizard.next()?;

    for extra in &req.extras {
        wizard.set_extra_quantity(extra.extra_id, extra.quantity)?;
    }
    wizard.set_special_requests(req.special_requests);
    if wizard.next()? != WizardStep::Payment {
        return Err(AppError::InternalServerError("Wizard did not reach the payment step".to_string()));
    }

    let key = req.idempotency_key.unwrap_or_else(|| Uuid::new_v4().to_string());
    let payload = wizard.submit(key)?;
    let total_display = format_amount(payload.total_cents, &payload.currency);

    Ok(Json(PrepareResponse { payload, total_display }))
}

async fn submit_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(payload): Json<BookingPayload>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let outcome = match state.booking_service.submit(&claims.sub, &payload).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if matches!(e, BookingError::PaymentUnavailable(_)) {
                state.metrics.checkout_failures.inc();
            }
            return Err(e.into());
        }
    };

    let status = if outcome.replayed {
        state.metrics.booking_replays.inc();
        StatusCode::OK
    } else {
        state.metrics.bookings_created.inc();
        StatusCode::CREATED
    };

    Ok((
        status,
        Json(SubmitResponse {
            booking_id: outcome.booking.id,
            session_id: outcome.session_id,
            url: outcome.checkout_url,
            total_cents: outcome.booking.total_cents,
            currency: outcome.booking.currency,
            replayed: outcome.replayed,
        }),
    ))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let filter = BookingFilter {
        customer_id: Some(claims.sub),
        ..Default::default()
    };
    let bookings = state.bookings.list_bookings(&filter).await.map_err(AppError::internal)?;
    Ok(Json(bookings))
}
