use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use mexivanza_catalog::{Business, BusinessFilter};
use mexivanza_shared::Localized;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{customer_auth_middleware, CustomerClaims},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    #[serde(default)]
    pub description: Localized,
    pub category: String,
    pub city: String,
    pub region: String,
    pub phone: Option<String>,
    pub website: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_businesses))
        .route("/{id}", get(get_business));

    let owner = Router::new()
        .route("/", post(create_business))
        .route_layer(middleware::from_fn_with_state(state, customer_auth_middleware));

    public.merge(owner)
}

async fn list_businesses(
    State(state): State<AppState>,
    Query(filter): Query<BusinessFilter>,
) -> Result<Json<Vec<Business>>, AppError> {
    let businesses = state.businesses.list_businesses(&filter).await.map_err(AppError::internal)?;
    Ok(Json(businesses))
}

async fn get_business(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Business>, AppError> {
    state
        .businesses
        .get_business(id)
        .await
        .map_err(AppError::internal)?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("Business {} not found", id)))
}

async fn create_business(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<Business>), AppError> {
    for (field, value) in [("name", &req.name), ("category", &req.category), ("city", &req.city)] {
        if value.trim().is_empty() {
            return Err(AppError::ValidationError(format!("{} is required", field)));
        }
    }

    let business = Business {
        id: Uuid::new_v4(),
        owner_id: claims.sub,
        name: req.name.trim().to_string(),
        description: req.description,
        category: req.category,
        city: req.city,
        region: req.region,
        phone: req.phone,
        website: req.website,
        // Listings stay unverified until an admin reviews them
        is_verified: false,
        created_at: Utc::now(),
    };
    state.businesses.create_business(&business).await.map_err(AppError::internal)?;
    tracing::info!("Business {} listed by {}", business.id, business.owner_id);

    Ok((StatusCode::CREATED, Json(business)))
}
