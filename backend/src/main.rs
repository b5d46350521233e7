//! Shop Stock Assistant - Backend Server
//!
//! Backend for a conversational commerce assistant: syncs marketplace stock
//! incrementally, classifies uploaded inventory sheets, reconciles
//! quantities across sources, and renders paginated views and xlsx exports
//! for the chat frontend.

use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod external;
mod handlers;
mod middleware;
mod routes;
mod services;
mod storage;

pub use config::Config;

use external::marketplace::MarketplaceClient;
use external::warehouse::WarehouseClient;
use services::{ExportService, StocksService, SyncService, UploadService};
use storage::credentials::{CredentialProvider, FileCredentialProvider};
use storage::AccountStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub sync: SyncService,
    pub stocks: StocksService,
    pub uploads: UploadService,
    pub exports: ExportService,
    pub warehouse: WarehouseClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ssa_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting Shop Stock Assistant Server");
    tracing::info!("Environment: {}", config.environment);

    let state = build_state(config.clone());

    // Build application
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire services onto the shared state.
fn build_state(config: Config) -> AppState {
    let store = AccountStore::new(config.storage.accounts_dir.clone());
    let marketplace = MarketplaceClient::new(&config.marketplace);
    let warehouse = WarehouseClient::new(&config.warehouse);

    let sync = SyncService::new(store.clone(), marketplace);
    let stocks = StocksService::new(sync.clone(), &config.cache);

    AppState {
        credentials: Arc::new(FileCredentialProvider::new(store.clone())),
        sync,
        stocks,
        uploads: UploadService::new(store.clone()),
        exports: ExportService::new(store),
        warehouse,
        config: Arc::new(config),
    }
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Shop Stock Assistant API v1.0"
}
