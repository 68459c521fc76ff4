use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use mexivanza_api::{app, middleware::AdminClaims, AppState, AuthConfig, Backends};
use mexivanza_booking::BookingRules;
use mexivanza_catalog::{AvailabilitySlot, PricingConfig, PricingTier, TravelExtra, TravelPackage};
use mexivanza_shared::Localized;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";
const WEBHOOK_SECRET: &str = "hook-secret";

struct TestApp {
    router: Router,
    backends: Backends,
}

struct Seeded {
    package: TravelPackage,
    slot: AvailabilitySlot,
    extra: TravelExtra,
}

fn saturday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 12, 12).unwrap()
}

fn test_app() -> TestApp {
    let backends = Backends::in_memory();
    let state = AppState::new(
        backends.clone(),
        AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
            webhook_secret: WEBHOOK_SECRET.to_string(),
        },
        BookingRules::default(),
        PricingConfig::default(),
        100,
    )
    .unwrap();
    TestApp {
        router: app(state),
        backends,
    }
}

async fn seed(app: &TestApp, capacity: i32) -> Seeded {
    let mut package = TravelPackage::new(
        Localized::new("Riviera Maya Esencial", "Riviera Maya Essentials"),
        "Sureste",
        "Cancún",
        4,
        PricingTier::new(100_000, "MXN"),
    );
    package.is_published = true;
    app.backends.packages.create_package(&package).await.unwrap();

    let slot = AvailabilitySlot::new(package.id, saturday(), capacity, 1.2);
    app.backends.availability.upsert_slots(&[slot.clone()]).await.unwrap();

    let mut extra = TravelExtra::new(Localized::new("Tour en cenote", "Cenote tour"), 50_000, true);
    extra.package_id = Some(package.id);
    app.backends.packages.create_extra(&extra).await.unwrap();

    Seeded { package, slot, extra }
}

fn admin_token(permissions: &[&str]) -> String {
    let claims = AdminClaims {
        sub: "admin-1".to_string(),
        email: "ops@mexivanza.com".to_string(),
        role: "ADMIN".to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn send(router: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(router, method, uri, token, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn send_raw(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn guest_token(router: &Router) -> String {
    let (status, body) = send(router, "POST", "/v1/auth/guest", None, None).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn form(seeded: &Seeded, key: &str) -> Value {
    json!({
        "package_id": seeded.package.id,
        "date": saturday(),
        "travelers": [{"name": "Ana López", "age": 34}, {"name": "Luis Pérez", "age": 36}],
        "extras": [{"extra_id": seeded.extra.id, "quantity": 1}],
        "contact": {"name": "Ana López", "email": "ana@example.mx"},
        "idempotency_key": key
    })
}

async fn prepare(router: &Router, seeded: &Seeded, key: &str) -> Value {
    let (status, body) = send(router, "POST", "/v1/bookings/prepare", None, Some(form(seeded, key))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["payload"].clone()
}

#[tokio::test]
async fn test_catalog_is_localized_and_hides_drafts() {
    let app = test_app();
    let seeded = seed(&app, 20).await;
    let draft = TravelPackage::new(Localized::new("Borrador", "Draft"), "Centro", "CDMX", 2, PricingTier::new(1, "MXN"));
    app.backends.packages.create_package(&draft).await.unwrap();

    let (status, body) = send(&app.router, "GET", "/v1/packages?lang=en", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "Riviera Maya Essentials");
    assert_eq!(list[0]["price_display"], "$1,000.00 MXN");

    let (status, body) = send(&app.router, "GET", &format!("/v1/packages/{}", draft.id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let uri = format!("/v1/packages/{}/availability?from=2026-12-01&to=2026-12-31", seeded.package.id);
    let (status, body) = send(&app.router, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["remaining"], 20);

    let (status, body) = send(&app.router, "GET", &format!("/v1/packages/{}/extras", seeded.package.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_quote_reference_total() {
    let app = test_app();
    let seeded = seed(&app, 20).await;

    let request = json!({
        "package_id": seeded.package.id,
        "date": saturday(),
        "traveler_count": 2,
        "extras": [{"extra_id": seeded.extra.id, "quantity": 1}]
    });
    let (status, body) = send(&app.router, "POST", "/v1/bookings/quote", None, Some(request)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total_cents"], 340_000);
    assert_eq!(body["total_display"], "$3,400.00 MXN");
}

#[tokio::test]
async fn test_booking_flow_submit_replay_and_payment() {
    let app = test_app();
    let seeded = seed(&app, 20).await;
    let token = guest_token(&app.router).await;

    let payload = prepare(&app.router, &seeded, "checkout-1").await;
    assert_eq!(payload["total_cents"], 340_000);
    assert_eq!(payload["end_date"], "2026-12-15");

    let (status, first) = send(&app.router, "POST", "/v1/bookings", Some(&token), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert!(first["url"].as_str().unwrap().starts_with("https://"));

    // Double submission returns the same checkout
    let (status, second) = send(&app.router, "POST", "/v1/bookings", Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["booking_id"], first["booking_id"]);
    assert_eq!(second["replayed"], true);

    let slot = app.backends.availability.get_slot(seeded.slot.id).await.unwrap().unwrap();
    assert_eq!(slot.booked_count, 2);

    let update = json!({"session_id": first["session_id"], "status": "paid"});
    let (status, _) = send(&app.router, "POST", "/v1/webhooks/payments", Some("wrong"), Some(update.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app.router, "POST", "/v1/webhooks/payments", Some(WEBHOOK_SECRET), Some(update.clone())).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["payment_status"], "paid");

    // Replayed webhook is a no-op
    let (status, body) = send(&app.router, "POST", "/v1/webhooks/payments", Some(WEBHOOK_SECRET), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, mine) = send(&app.router, "GET", "/v1/bookings/mine", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, stats) = send(&app.router, "GET", "/v1/admin/stats", Some(&admin_token(&[])), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["revenue_cents"], 340_000);
    assert_eq!(stats["revenue_by_currency"]["MXN"], 340_000);
    assert_eq!(stats["revenue_display"], "$3,400.00 MXN");
    assert_eq!(stats["confirmed"], 1);

    let (_, metrics) = send_raw(&app.router, "GET", "/metrics", None, None).await;
    let metrics = String::from_utf8(metrics).unwrap();
    assert!(metrics.contains("mexivanza_bookings_created_total 1"));
    assert!(metrics.contains("mexivanza_booking_replays_total 1"));
}

#[tokio::test]
async fn test_submit_requires_customer_token() {
    let app = test_app();
    let (status, _) = send(&app.router, "GET", "/v1/bookings/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, "POST", "/v1/bookings", Some("not-a-jwt"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_total_is_rejected() {
    let app = test_app();
    let seeded = seed(&app, 20).await;
    let token = guest_token(&app.router).await;

    let mut payload = prepare(&app.router, &seeded, "tampered").await;
    payload["total_cents"] = json!(100);

    let (status, body) = send(&app.router, "POST", "/v1/bookings", Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("340000"));

    let slot = app.backends.availability.get_slot(seeded.slot.id).await.unwrap().unwrap();
    assert_eq!(slot.booked_count, 0);
}

#[tokio::test]
async fn test_full_slot_is_rejected() {
    let app = test_app();
    let seeded = seed(&app, 3).await;

    let first = prepare(&app.router, &seeded, "party-a").await;
    let second = prepare(&app.router, &seeded, "party-b").await;

    let token_a = guest_token(&app.router).await;
    let token_b = guest_token(&app.router).await;
    let (status, _) = send(&app.router, "POST", "/v1/bookings", Some(&token_a), Some(first)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app.router, "POST", "/v1/bookings", Some(&token_b), Some(second)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The wizard now refuses the date for a party of two
    let (status, _) = send(&app.router, "POST", "/v1/bookings/prepare", None, Some(form(&seeded, "party-c"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_catalog_and_export() {
    let app = test_app();
    let admin = admin_token(&["bookings:manage"]);

    let (status, _) = send(&app.router, "GET", "/v1/admin/stats", Some(&guest_token(&app.router).await), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let package = json!({
        "title": {"es": "Oaxaca Mágico", "en": "Magical Oaxaca"},
        "region": "Sur",
        "city": "Oaxaca",
        "duration_days": 3,
        "pricing_tiers": {"standard": {"price_cents": 250000}}
    });
    let (status, created) = send(&app.router, "POST", "/v1/admin/packages", Some(&admin), Some(package)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["is_published"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let seed_body = json!({"from": "2026-12-07", "days": 7});
    let (status, body) = send(&app.router, "POST", &format!("/v1/admin/packages/{}/availability", id), Some(&admin), Some(seed_body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slots"], 7);

    let (status, body) = send(&app.router, "POST", &format!("/v1/admin/packages/{}/publish", id), Some(&admin), Some(json!({"published": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_published"], true);

    let uri = format!("/v1/packages/{}/availability", id);
    let (_, slots) = send(&app.router, "GET", &uri, None, None).await;
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 7);
    // 2026-12-12 is a Saturday
    assert_eq!(slots[5]["price_multiplier"], 1.2);
    assert_eq!(slots[0]["price_multiplier"], 1.0);

    let invalid = json!({
        "title": {"es": "", "en": ""},
        "region": "Sur",
        "city": "Oaxaca",
        "duration_days": 0,
        "pricing_tiers": {"standard": {"price_cents": 1}}
    });
    let (status, _) = send(&app.router, "POST", "/v1/admin/packages", Some(&admin), Some(invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, csv) = send_raw(&app.router, "GET", "/v1/admin/bookings/export", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(csv).unwrap();
    assert!(csv.starts_with("booking_id,package_id"));
}

#[tokio::test]
async fn test_admin_cancel_requires_permission() {
    let app = test_app();
    let seeded = seed(&app, 20).await;
    let token = guest_token(&app.router).await;
    let payload = prepare(&app.router, &seeded, "cancel-me").await;
    let (_, submitted) = send(&app.router, "POST", "/v1/bookings", Some(&token), Some(payload)).await;
    let uri = format!("/v1/admin/bookings/{}/events", submitted["booking_id"].as_str().unwrap());

    let (status, _) = send(&app.router, "POST", &uri, Some(&admin_token(&[])), Some(json!({"event": "cancelled"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app.router, "POST", &uri, Some(&admin_token(&["bookings:manage"])), Some(json!({"event": "cancelled"}))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["released_seats"], true);

    let slot = app.backends.availability.get_slot(seeded.slot.id).await.unwrap().unwrap();
    assert_eq!(slot.booked_count, 0);

    // Completing a cancelled booking is not a valid transition
    let (status, _) = send(&app.router, "POST", &uri, Some(&admin_token(&["bookings:manage"])), Some(json!({"event": "completed"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_directory_listing_and_verification() {
    let app = test_app();
    let token = guest_token(&app.router).await;

    let listing = json!({
        "name": "Cocina de Doña Rosa",
        "description": {"es": "Mole tradicional", "en": "Traditional mole"},
        "category": "restaurant",
        "city": "Puebla",
        "region": "Centro"
    });
    let (status, created) = send(&app.router, "POST", "/v1/directory", Some(&token), Some(listing)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["is_verified"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app.router, "POST", "/v1/directory", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, found) = send(&app.router, "GET", "/v1/directory?search=mole", None, None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, verified) = send(&app.router, "GET", "/v1/directory?verified_only=true", None, None).await;
    assert!(verified.as_array().unwrap().is_empty());

    let uri = format!("/v1/admin/businesses/{}/verify", id);
    let (status, _) = send(&app.router, "POST", &uri, Some(&admin_token(&[])), Some(json!({"verified": true}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, "GET", &format!("/v1/directory/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_verified"], true);

    let (status, _) = send(&app.router, "GET", &format!("/v1/directory/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
