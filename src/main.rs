use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use orders_rs::config::{Config, StoreKind};
use orders_rs::gateway::factory::GatewayFactory;
use orders_rs::gateway::retry::RetryPolicy;
use orders_rs::routes::{api_router, AppState};
use orders_rs::services::order_service::{CheckoutSettings, OrderService};
use orders_rs::services::webhook_service::WebhookReconciler;
use orders_rs::store::{DirectoryStore, InMemoryStore, OrderStore, PaymentStore, PgStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    let (orders, payments, directory): (
        Arc<dyn OrderStore>,
        Arc<dyn PaymentStore>,
        Arc<dyn DirectoryStore>,
    ) = match config.store {
        StoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL checked at config load");

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Database connection established");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Database migrations completed");

            let store = Arc::new(PgStore::new(pool));
            let orders: Arc<dyn OrderStore> = store.clone();
            let payments: Arc<dyn PaymentStore> = store.clone();
            let directory: Arc<dyn DirectoryStore> = store;
            (orders, payments, directory)
        }
        StoreKind::InMemory => {
            tracing::info!("Using in-memory store");
            let store = Arc::new(InMemoryStore::new());
            let orders: Arc<dyn OrderStore> = store.clone();
            let payments: Arc<dyn PaymentStore> = store.clone();
            let directory: Arc<dyn DirectoryStore> = store;
            (orders, payments, directory)
        }
    };

    let gateways =
        Arc::new(GatewayFactory::from_config(&config).expect("Failed to build gateway adapters"));

    // Fail fast on a default provider nothing is registered for
    gateways
        .resolve(config.default_provider)
        .expect("Default payment provider is not configured");

    tracing::info!(
        provider = config.default_provider.as_str(),
        "Gateway adapters ready"
    );

    let retry = RetryPolicy::default();
    let order_service = Arc::new(OrderService::new(
        orders.clone(),
        payments.clone(),
        directory,
        gateways.clone(),
        retry.clone(),
        CheckoutSettings::from_config(&config),
    ));
    let reconciler = Arc::new(WebhookReconciler::new(
        orders,
        payments,
        gateways.clone(),
        retry,
    ));

    let state = AppState {
        orders: order_service,
        reconciler,
        gateways,
        default_provider: config.default_provider,
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .merge(api_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST/PORT must form a valid socket address");
    tracing::info!("Orders module listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "module": "orders",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
