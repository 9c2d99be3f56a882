use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use facilio::config::AppConfig;
use facilio::db;
use facilio::handlers;
use facilio::services::notify::webhook::WebhookNotifier;
use facilio::services::notify::{LogNotifier, NotificationProvider};
use facilio::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let notifier: Box<dyn NotificationProvider> = if config.notify_webhook_url.is_empty() {
        tracing::info!("no NOTIFY_WEBHOOK_URL set, logging booking events only");
        Box::new(LogNotifier)
    } else {
        tracing::info!(url = %config.notify_webhook_url, "sending booking events to webhook");
        Box::new(WebhookNotifier::new(config.notify_webhook_url.clone()))
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/facilities", get(handlers::bookings::list_facilities))
        .route("/api/availability", get(handlers::bookings::get_availability))
        .route("/api/bookings", post(handlers::bookings::upsert_booking))
        .route("/api/bookings", get(handlers::bookings::list_my_bookings))
        .route(
            "/api/bookings/:id",
            delete(handlers::bookings::delete_booking),
        )
        .route(
            "/api/admin/facilities",
            get(handlers::admin::list_facilities),
        )
        .route(
            "/api/admin/facilities",
            post(handlers::admin::create_facility),
        )
        .route(
            "/api/admin/facilities/:id",
            post(handlers::admin::update_facility),
        )
        .route(
            "/api/admin/booking-types",
            get(handlers::admin::list_booking_types),
        )
        .route(
            "/api/admin/booking-types",
            post(handlers::admin::create_booking_type),
        )
        .route(
            "/api/admin/booking-types/:id",
            post(handlers::admin::update_booking_type),
        )
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/api/admin/bookings/:id/approve",
            post(handlers::admin::approve_booking),
        )
        .route(
            "/api/admin/bookings/:id/reject",
            post(handlers::admin::reject_booking),
        )
        .route(
            "/api/admin/bookings/:id",
            delete(handlers::admin::delete_booking),
        )
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route("/calendar/:booking_id", get(handlers::calendar::download_ics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
