use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use futures_util::{Stream, StreamExt};
use mexivanza_catalog::{format_amount, AvailabilitySlot, PackageFilter, TravelExtra, TravelPackage};
use mexivanza_shared::Language;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub city: Option<String>,
    pub featured: Option<bool>,
    #[serde(default)]
    pub lang: Language,
}

/// Catalog card rendered in one language.
#[derive(Debug, Serialize)]
pub struct PackageSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub region: String,
    pub city: String,
    pub duration_days: i32,
    pub price_cents: i64,
    pub currency: String,
    pub price_display: String,
    pub is_featured: bool,
    pub cover_image: Option<String>,
}

impl PackageSummary {
    fn from_package(package: &TravelPackage, lang: Language) -> Self {
        Self {
            id: package.id,
            title: package.title.get(lang).to_string(),
            description: package.description.get(lang).to_string(),
            region: package.region.clone(),
            city: package.city.clone(),
            duration_days: package.duration_days,
            price_cents: package.standard_price_cents(),
            currency: package.currency().to_string(),
            price_display: format_amount(package.standard_price_cents(), package.currency()),
            is_featured: package.is_featured,
            cover_image: package.gallery.first().cloned(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SlotView {
    pub id: Uuid,
    pub date: NaiveDate,
    pub capacity: i32,
    pub booked_count: i32,
    pub remaining: i32,
    pub price_multiplier: f64,
    pub is_full: bool,
}

impl From<&AvailabilitySlot> for SlotView {
    fn from(slot: &AvailabilitySlot) -> Self {
        Self {
            id: slot.id,
            date: slot.date,
            capacity: slot.capacity,
            booked_count: slot.booked_count,
            remaining: slot.remaining(),
            price_multiplier: slot.price_multiplier,
            is_full: slot.is_full(),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_packages))
        .route("/{id}", get(get_package))
        .route("/{id}/availability", get(list_availability))
        .route("/{id}/availability/stream", get(availability_stream))
        .route("/{id}/extras", get(list_extras))
}

/// Published package or 404. Unpublished packages are invisible to customers.
pub async fn load_published(state: &AppState, id: Uuid) -> Result<TravelPackage, AppError> {
    state
        .packages
        .get_package(id)
        .await
        .map_err(AppError::internal)?
        .filter(|p| p.is_published)
        .ok_or_else(|| AppError::NotFoundError(format!("Package {} not found", id)))
}

async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PackageSummary>>, AppError> {
    let filter = PackageFilter {
        region: query.region,
        city: query.city,
        featured: query.featured,
        include_unpublished: false,
    };
    let packages = state.packages.list_packages(&filter).await.map_err(AppError::internal)?;

    Ok(Json(
        packages.iter().map(|p| PackageSummary::from_package(p, query.lang)).collect(),
    ))
}

async fn get_package(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<TravelPackage>, AppError> {
    Ok(Json(load_published(&state, id).await?))
}

async fn list_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<SlotView>>, AppError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::ValidationError("`from` must not be after `to`".to_string()));
        }
    }
    let package = load_published(&state, id).await?;
    let slots = state
        .availability
        .list_slots(package.id, query.from, query.to)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(slots.iter().map(SlotView::from).collect()))
}

async fn list_extras(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<TravelExtra>>, AppError> {
    let package = load_published(&state, id).await?;
    let extras = state.packages.list_extras(package.id).await.map_err(AppError::internal)?;
    Ok(Json(extras))
}

async fn availability_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let package_id = load_published(&state, id).await?.id;
    let rx = state.sse_tx.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| {
        async move {
            match result {
                Ok(event) if event.package_id == package_id => {
                    let data = serde_json::to_string(&event).ok()?;
                    Some(Ok(Event::default().event("slot_updated").data(data)))
                }
                // Lagged receivers just miss intermediate counts
                _ => None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
