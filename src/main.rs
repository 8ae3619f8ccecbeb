//! Porto API Gateway
//!
//! A REST gateway for a personal portfolio site, proxying CRUD operations to
//! a hosted relational store with bearer-token authentication and an
//! admin-allowlist authorization check.

mod api;
mod auth;
mod config;
mod errors;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::AuthClient;
use config::Config;
use store::StoreClient;

/// Request bodies above this are rejected by the framework before any
/// handler runs; the editor upload's own 10 MiB cap stays reachable.
const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

/// Application state shared across all handlers.
///
/// Both upstream clients are constructed once at startup and injected here;
/// nothing in the gateway holds mutable state across requests.
#[derive(Clone)]
pub struct AppState {
    pub store: StoreClient,
    pub auth: AuthClient,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration; missing store credentials abort here
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Porto API gateway");
    tracing::info!("Store URL: {}", config.store_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    let store = StoreClient::new(&config.store_url, &config.service_key);
    let auth = AuthClient::new(&config.store_url, &config.service_key);

    let state = AppState {
        store,
        auth,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/diag", get(diag))
        // Auth
        .route("/auth/login", post(api::login))
        .route("/auth/me", get(api::get_me))
        // Projects
        .route("/projects", get(api::list_projects).post(api::create_project))
        .route("/projects/featured", get(api::featured_projects))
        .route("/projects/update", post(api::update_project))
        .route("/projects/{id}", delete(api::delete_project))
        // Images
        .route("/images", get(api::list_images).post(api::upload_image))
        .route(
            "/images/upload-for-editor",
            post(api::upload_image_for_editor),
        )
        .route(
            "/images/{id}",
            get(api::get_image)
                .patch(api::update_image)
                .post(api::update_image)
                .delete(api::delete_image),
        )
        // Messages
        .route("/messages", get(api::list_messages).post(api::create_message))
        .route("/messages/reset", post(api::reset_messages))
        .route(
            "/messages/{id}",
            patch(api::update_message)
                .post(api::update_message)
                .delete(api::delete_message),
        )
        // Comments
        .route("/comments", get(api::list_comments).post(api::create_comment))
        .route("/comments/stream", get(api::stream_comments))
        .route("/comments/reset", post(api::reset_comments))
        .route("/comments/{id}", delete(api::delete_comment))
        // Experiences
        .route(
            "/experiences",
            get(api::list_experiences).post(api::create_experience),
        )
        .route("/experiences/update", post(api::update_experience))
        .route("/experiences/{id}", delete(api::delete_experience))
        // Blog
        .route("/blog", get(api::list_blog_posts))
        .route(
            "/blog/posts",
            get(api::list_blog_posts_admin).post(api::create_blog_post),
        )
        .route("/blog/update", post(api::update_blog_post))
        .route(
            "/blog/{slug}",
            get(api::get_blog_post).delete(api::delete_blog_post),
        )
        // Stats
        .route("/stats", get(api::get_stats))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Service banner.
async fn root() -> Json<Value> {
    Json(json!({
        "message": "Porto API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Diagnostic endpoint: reports which required configuration is present
/// without leaking any values.
async fn diag() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "env": {
            "PORTO_STORE_URL": std::env::var("PORTO_STORE_URL").is_ok(),
            "PORTO_SERVICE_KEY": std::env::var("PORTO_SERVICE_KEY").is_ok(),
        }
    }))
}

#[cfg(test)]
mod testing;
