//! HTTP server

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_user, resolve_user};
use crate::config::Config;
use crate::error::Result;
use crate::models::Services;

use super::routes;

/// Largest accepted image upload
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub services: Services,
}

pub type SharedState = Arc<AppState>;

/// Connect the services, migrate the schema and serve until shutdown
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    let services = Services::from_config(&config).await?;
    services.auto_migrate().await?;

    let state = Arc::new(AppState { config, services });
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the router with all routes.
///
/// Every request passes through [`resolve_user`]; the account and gallery
/// management routes additionally require a signed-in user.
pub fn create_router(state: SharedState) -> Router {
    let users = state.services.user.clone();
    let images_dir = state.services.image.root().to_path_buf();
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let protected = Router::new()
        .route("/logout", post(routes::logout))
        .route("/me", get(routes::me))
        .route(
            "/galleries",
            get(routes::list_galleries).post(routes::create_gallery),
        )
        .route("/galleries/{id}/update", post(routes::update_gallery))
        .route("/galleries/{id}/delete", post(routes::delete_gallery))
        .route(
            "/galleries/{id}/images/{filename}",
            post(routes::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/galleries/{id}/images/{filename}/delete",
            post(routes::delete_image),
        )
        .route_layer(middleware::from_fn(require_user));

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/signup", post(routes::signup))
        .route("/login", post(routes::login))
        .route("/forgot", post(routes::forgot_password))
        .route("/reset", post(routes::reset_password))
        .route("/galleries/{id}", get(routes::show_gallery))
        .merge(protected)
        .nest_service("/images", ServeDir::new(images_dir))
        // Middleware
        .layer(middleware::from_fn_with_state(users, resolve_user))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
