use axum::{extract::State, routing::post, Json, Router};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use mexivanza_booking::PaymentUpdate;
use mexivanza_core::{BookingStatus, PaymentStatus};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
struct WebhookResponse {
    booking_id: Uuid,
    status: BookingStatus,
    payment_status: PaymentStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/payments", post(payment_webhook))
}

/// Payment provider callback. Replays of an applied status are accepted
/// and change nothing.
async fn payment_webhook(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Json(update): Json<PaymentUpdate>,
) -> Result<Json<WebhookResponse>, AppError> {
    match bearer {
        Some(TypedHeader(Authorization(token))) if token.token() == state.auth.webhook_secret => {}
        _ => return Err(AppError::AuthenticationError("Invalid webhook secret".to_string())),
    }

    tracing::info!(
        "Payment webhook: session={:?} booking={:?} status={}",
        update.session_id,
        update.booking_id,
        update.status
    );

    let (booking, _released) = state.booking_service.apply_payment_update(&update).await?;
    state
        .metrics
        .payment_updates
        .with_label_values(&[update.status.as_str()])
        .inc();

    Ok(Json(WebhookResponse {
        booking_id: booking.id,
        status: booking.status,
        payment_status: booking.payment_status,
    }))
}
