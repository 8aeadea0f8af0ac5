//! Kinetis Security Cloud Server
//!
//! Backend for phishing simulations and cloud-identity compliance audits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     KINETIS CLOUD                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  API      │  │  Dispatch /  │  │  Compliance Evaluator │ │
//! │  │  Gateway  │  │  Click State │  │  (Graph evidence)     │ │
//! │  │  (Axum)   │  │  Machine     │  │                       │ │
//! │  └─────┬─────┘  └──────┬───────┘  └───────────┬───────────┘ │
//! │        └───────────────┼──────────────────────┘             │
//! │                        ▼                                    │
//! │                 ┌─────────────┐                             │
//! │                 │ PostgreSQL  │                             │
//! │                 └─────────────┘                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod clients;
mod compliance;
mod config;
mod db;
mod dispatch;
mod error;
mod handlers;
mod middleware;
mod models;
mod scoring;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::clients::breach::BreachFeed;
use crate::clients::graph::GraphClient;
use crate::clients::mailer::{ConsoleMailer, Mailer, ResendMailer};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "kinetis_cloud=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Kinetis Cloud Server starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .expect("Failed to create database pool");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .expect("Failed to run migrations");

    // Shared outbound HTTP client
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client");

    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(http.clone(), key.clone())),
        None => {
            tracing::warn!("RESEND_API_KEY not set, sends will be logged only");
            Arc::new(ConsoleMailer)
        }
    };

    let graph = GraphClient::from_config(http.clone(), &config);
    if graph.is_none() {
        tracing::warn!("Microsoft Graph credentials not set, audits and directory sync disabled");
    }

    let breaches = BreachFeed::new(http, config.hibp_api_key.clone());
    if breaches.demo_mode() {
        tracing::warn!("HIBP_API_KEY not set, breach scans serve sample data");
    }

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
        mailer,
        graph,
        breaches,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
    pub mailer: Arc<dyn Mailer>,
    pub graph: Option<GraphClient>,
    pub breaches: BreachFeed,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth; /track is followed by simulation victims)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/track", get(handlers::track::click));

    // Management routes (shared admin API key)
    let management_routes = Router::new()
        // Organizations & directory
        .route("/api/v1/organizations", post(handlers::organizations::create))
        .route("/api/v1/organizations", get(handlers::organizations::list))
        .route("/api/v1/organizations/:id", get(handlers::organizations::get))
        .route("/api/v1/organizations/:id/employees", post(handlers::organizations::add_employee))
        .route("/api/v1/organizations/:id/employees/import", post(handlers::organizations::import_employees))
        .route("/api/v1/organizations/:id/employees/sync", post(handlers::organizations::sync_directory))

        // Compliance & breach intelligence
        .route("/api/v1/organizations/:id/audit", post(handlers::audit::run))
        .route("/api/v1/organizations/:id/audit", get(handlers::audit::history))
        .route("/api/v1/organizations/:id/breach-scan", post(handlers::audit::breach_scan))

        // Campaigns
        .route("/api/v1/campaigns", post(handlers::campaigns::launch))
        .route("/api/v1/campaigns", get(handlers::campaigns::list))
        .route("/api/v1/campaigns/:id", get(handlers::campaigns::report))
        .route("/api/v1/attacks/quick", post(handlers::campaigns::quick_attack))

        // Remediation
        .route("/api/v1/training/complete", post(handlers::training::complete))

        // Templates
        .route("/api/v1/templates", get(handlers::templates::list))
        .route("/api/v1/templates", post(handlers::templates::create))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin_key
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(management_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
