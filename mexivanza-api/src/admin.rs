use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use mexivanza_booking::{export_bookings_csv, BookingEvent, BookingStats};
use mexivanza_catalog::{
    format_amount, AvailabilityCalendar, ExtraCategory, PackageFilter, PricingTiers, TravelExtra, TravelPackage,
    DEFAULT_CURRENCY,
};
use mexivanza_core::repository::BookingFilter;
use mexivanza_core::{Booking, BookingStatus, CoreError, PaymentStatus};
use mexivanza_shared::{Language, Localized};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{admin_auth_middleware, auth::has_permission, AdminClaims},
    state::AppState,
};

const MAX_SEED_DAYS: u32 = 366;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/bookings", get(list_bookings))
        .route("/bookings/export", get(export_bookings))
        .route("/bookings/{id}/events", post(apply_booking_event))
        .route("/packages", get(list_packages).post(create_package))
        .route("/packages/{id}", axum::routing::put(update_package).delete(delete_package))
        .route("/packages/{id}/publish", post(set_published))
        .route("/packages/{id}/availability", post(seed_availability))
        .route("/extras", post(create_extra))
        .route("/extras/{id}", delete(delete_extra))
        .route("/businesses/{id}/verify", post(verify_business))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    stats: BookingStats,
    conversion_rate: f64,
    revenue_display: String,
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let bookings = state
        .bookings
        .list_bookings(&BookingFilter::default())
        .await
        .map_err(AppError::internal)?;
    let stats = BookingStats::from_bookings(&bookings);

    Ok(Json(StatsResponse {
        conversion_rate: stats.conversion_rate(),
        revenue_display: revenue_display(&stats),
        stats,
    }))
}

/// `"$3,400.00 MXN"`, or one amount per currency joined with ` + `.
fn revenue_display(stats: &BookingStats) -> String {
    if stats.revenue_by_currency.is_empty() {
        return format_amount(0, DEFAULT_CURRENCY);
    }
    stats
        .revenue_by_currency
        .iter()
        .map(|(currency, cents)| format_amount(*cents, currency))
        .collect::<Vec<_>>()
        .join(" + ")
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.bookings.list_bookings(&filter).await.map_err(AppError::internal)?;
    Ok(Json(bookings))
}

async fn export_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingFilter>,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.bookings.list_bookings(&filter).await.map_err(AppError::internal)?;
    let csv = export_bookings_csv(&bookings)
        .map_err(|e| AppError::InternalServerError(format!("CSV export failed: {}", e)))?;

    let disposition = format!(
        "attachment; filename=\"bookings-{}.csv\"",
        Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

#[derive(Debug, Deserialize)]
struct BookingEventRequest {
    event: BookingEvent,
}

#[derive(Debug, Serialize)]
struct BookingEventResponse {
    booking_id: Uuid,
    status: BookingStatus,
    payment_status: PaymentStatus,
    released_seats: bool,
}

async fn apply_booking_event(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<BookingEventRequest>,
) -> Result<Json<BookingEventResponse>, AppError> {
    if !has_permission(&claims, "bookings:manage") {
        return Err(AppError::AuthorizationError("Missing permission bookings:manage".to_string()));
    }

    let (booking, released) = state.booking_service.apply_event(id, req.event).await?;
    tracing::info!("Admin {} applied {:?} to booking {}", claims.sub, req.event, id);

    Ok(Json(BookingEventResponse {
        booking_id: booking.id,
        status: booking.status,
        payment_status: booking.payment_status,
        released_seats: released.is_some(),
    }))
}

// ============================================================================
// Catalog management
// ============================================================================

#[derive(Debug, Deserialize)]
struct PackageInput {
    title: Localized,
    #[serde(default)]
    description: Localized,
    region: String,
    city: String,
    duration_days: i32,
    pricing_tiers: PricingTiers,
    #[serde(default)]
    gallery: Vec<String>,
    #[serde(default)]
    is_featured: bool,
    #[serde(default)]
    is_demo: bool,
}

impl PackageInput {
    fn apply_to(self, package: &mut TravelPackage) {
        package.title = self.title;
        package.description = self.description;
        package.region = self.region;
        package.city = self.city;
        package.duration_days = self.duration_days;
        package.pricing_tiers = self.pricing_tiers;
        package.gallery = self.gallery;
        package.is_featured = self.is_featured;
        package.is_demo = self.is_demo;
    }
}

async fn load_package(state: &AppState, id: Uuid) -> Result<TravelPackage, AppError> {
    state
        .packages
        .get_package(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Package {} not found", id)))
}

async fn list_packages(State(state): State<AppState>) -> Result<Json<Vec<TravelPackage>>, AppError> {
    let filter = PackageFilter {
        include_unpublished: true,
        ..Default::default()
    };
    let packages = state.packages.list_packages(&filter).await.map_err(AppError::internal)?;
    Ok(Json(packages))
}

async fn create_package(
    State(state): State<AppState>,
    Json(input): Json<PackageInput>,
) -> Result<(StatusCode, Json<TravelPackage>), AppError> {
    let mut package = TravelPackage::new(
        input.title.clone(),
        &input.region,
        &input.city,
        input.duration_days,
        input.pricing_tiers.standard.clone(),
    );
    input.apply_to(&mut package);
    package.validate().map_err(CoreError::ValidationError)?;

    state.packages.create_package(&package).await.map_err(AppError::internal)?;
    tracing::info!("Created package {} ({})", package.id, package.title.get(Language::Es));

    Ok((StatusCode::CREATED, Json(package)))
}

async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PackageInput>,
) -> Result<Json<TravelPackage>, AppError> {
    let mut package = load_package(&state, id).await?;
    input.apply_to(&mut package);
    package.validate().map_err(CoreError::ValidationError)?;

    if !state.packages.update_package(&package).await.map_err(AppError::internal)? {
        return Err(CoreError::NotFound(format!("Package {}", id)).into());
    }
    Ok(Json(package))
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    published: bool,
}

async fn set_published(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<TravelPackage>, AppError> {
    let mut package = load_package(&state, id).await?;
    if req.published {
        package.validate().map_err(CoreError::ValidationError)?;
    }
    package.is_published = req.published;
    state.packages.update_package(&package).await.map_err(AppError::internal)?;
    tracing::info!("Package {} published={}", id, req.published);
    Ok(Json(package))
}

async fn delete_package(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    let held = state
        .bookings
        .list_bookings(&BookingFilter {
            package_id: Some(id),
            ..Default::default()
        })
        .await
        .map_err(AppError::internal)?
        .iter()
        .any(|b| matches!(b.status, BookingStatus::Pending | BookingStatus::Confirmed));
    if held {
        return Err(CoreError::Conflict(format!("Package {} has open bookings", id)).into());
    }

    if state.packages.delete_package(id).await.map_err(AppError::internal)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFoundError(format!("Package {} not found", id)))
    }
}

#[derive(Debug, Deserialize)]
struct SeedRequest {
    from: NaiveDate,
    days: u32,
    capacity: Option<i32>,
    weekday_multiplier: Option<f64>,
    weekend_multiplier: Option<f64>,
}

async fn seed_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SeedRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.days == 0 || req.days > MAX_SEED_DAYS {
        return Err(AppError::ValidationError(format!("days must be between 1 and {}", MAX_SEED_DAYS)));
    }
    let package = load_package(&state, id).await?;

    let defaults = AvailabilityCalendar::default();
    let calendar = AvailabilityCalendar {
        capacity: req.capacity.unwrap_or(defaults.capacity),
        weekday_multiplier: req.weekday_multiplier.unwrap_or(defaults.weekday_multiplier),
        weekend_multiplier: req.weekend_multiplier.unwrap_or(defaults.weekend_multiplier),
    };
    if calendar.capacity < 0 {
        return Err(AppError::ValidationError("capacity must not be negative".to_string()));
    }
    if !(calendar.weekday_multiplier > 0.0 && calendar.weekend_multiplier > 0.0) {
        return Err(AppError::ValidationError("multipliers must be positive".to_string()));
    }

    let slots = calendar.generate(package.id, req.from, req.days);
    let count = state.availability.upsert_slots(&slots).await.map_err(AppError::internal)?;
    tracing::info!("Seeded {} availability slots for package {}", count, package.id);

    Ok((StatusCode::CREATED, Json(json!({ "package_id": package.id, "slots": count }))))
}

#[derive(Debug, Deserialize)]
struct ExtraInput {
    package_id: Option<Uuid>,
    name: Localized,
    #[serde(default)]
    description: Localized,
    price_cents: i64,
    #[serde(default)]
    per_person: bool,
    category: Option<ExtraCategory>,
}

async fn create_extra(
    State(state): State<AppState>,
    Json(input): Json<ExtraInput>,
) -> Result<(StatusCode, Json<TravelExtra>), AppError> {
    if input.name.is_empty() {
        return Err(CoreError::ValidationError("Extra name is required".to_string()).into());
    }
    if input.price_cents < 0 {
        return Err(CoreError::ValidationError("Extra price must not be negative".to_string()).into());
    }
    if let Some(package_id) = input.package_id {
        load_package(&state, package_id).await?;
    }

    let mut extra = TravelExtra::new(input.name, input.price_cents, input.per_person);
    extra.package_id = input.package_id;
    extra.description = input.description;
    if let Some(category) = input.category {
        extra.category = category;
    }

    state.packages.create_extra(&extra).await.map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(extra)))
}

async fn delete_extra(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    if state.packages.delete_extra(id).await.map_err(AppError::internal)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFoundError(format!("Extra {} not found", id)))
    }
}

// ============================================================================
// Directory moderation
// ============================================================================

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    #[serde(default = "default_verified")]
    verified: bool,
}

fn default_verified() -> bool {
    true
}

async fn verify_business(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.businesses.set_verified(id, req.verified).await.map_err(AppError::internal)? {
        return Err(AppError::NotFoundError(format!("Business {} not found", id)));
    }
    Ok(Json(json!({ "id": id, "is_verified": req.verified })))
}
