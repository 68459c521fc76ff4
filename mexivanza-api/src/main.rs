use anyhow::Context;
use mexivanza_api::{app, AppState, AuthConfig, Backends};
use mexivanza_booking::{BookingRules, MockPaymentAdapter};
use mexivanza_catalog::PricingConfig;
use mexivanza_core::payment::PaymentAdapter;
use mexivanza_store::app_config::Config;
use mexivanza_store::{
    DbClient, EventProducer, RedisClient, RemoteFunctionPaymentAdapter, StoreAvailabilityRepository,
    StoreBookingRepository, StoreBusinessRepository, StorePackageRepository,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mexivanza_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Mexivanza API on port {}", config.server.port);

    let backends = if std::env::var("MEXIVANZA_BACKEND").as_deref() == Ok("memory") {
        tracing::warn!("Running on in-memory storage; data is lost on restart");
        Backends::in_memory()
    } else {
        connect_backends(&config).await?
    };

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
        webhook_secret: config.auth.webhook_secret.clone(),
    };
    let rules = BookingRules {
        idempotency_ttl_seconds: config.business_rules.idempotency_ttl_seconds,
        max_travelers: config.business_rules.max_travelers,
        success_url: config.payments.success_url.clone(),
        cancel_url: config.payments.cancel_url.clone(),
    };
    let pricing = PricingConfig {
        max_multiplier: config.business_rules.max_price_multiplier,
        ..Default::default()
    };

    let state = AppState::new(backends, auth, rules, pricing, config.business_rules.rate_limit_per_minute)
        .context("Failed to register metrics")?;
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

async fn connect_backends(config: &Config) -> anyhow::Result<Backends> {
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let redis = RedisClient::new(&config.redis.url).await.context("Failed to connect to Redis")?;
    let kafka = EventProducer::new(&config.kafka.brokers).context("Failed to create Kafka producer")?;

    let payments: Arc<dyn PaymentAdapter> = match config.payments.provider.as_str() {
        "remote" => {
            let functions_url = config
                .payments
                .functions_url
                .as_deref()
                .context("payments.functions_url is required for the remote provider")?;
            Arc::new(RemoteFunctionPaymentAdapter::new(
                functions_url,
                &config.payments.function_name,
                config.payments.functions_api_key.clone(),
            )?)
        }
        "mock" => Arc::new(MockPaymentAdapter::new()),
        other => anyhow::bail!("Unknown payment provider '{}'", other),
    };

    Ok(Backends {
        packages: Arc::new(StorePackageRepository::new(db.pool.clone())),
        availability: Arc::new(StoreAvailabilityRepository::new(db.pool.clone())),
        bookings: Arc::new(StoreBookingRepository::new(db.pool.clone())),
        businesses: Arc::new(StoreBusinessRepository::new(db.pool.clone())),
        guard: Arc::new(redis),
        events: Arc::new(kafka),
        payments,
    })
}
