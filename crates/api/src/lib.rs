//! HTTP API layer with Axum routes and extractors.
//!
//! This crate provides:
//! - REST API routes for image upload, retrieval, transformation, and deletion
//! - The owner extractor
//! - JSON error responses

pub mod error;
pub mod extractors;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use prism_core::image::{ImageRepository, ImageService};
use prism_core::{MemoryTransformCache, StorageService};
use prism_shared::ServerConfig;

/// Image service wired to the production adapters.
pub type AppImageService<R = prism_db::ImageRepository> =
    ImageService<StorageService, R, MemoryTransformCache>;

/// Application state shared across handlers.
pub struct AppState<R: ImageRepository = prism_db::ImageRepository> {
    /// Image service.
    pub images: Arc<AppImageService<R>>,
}

impl<R: ImageRepository> AppState<R> {
    /// Create application state around an image service.
    #[must_use]
    pub fn new(images: AppImageService<R>) -> Self {
        Self {
            images: Arc::new(images),
        }
    }
}

impl<R: ImageRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            images: Arc::clone(&self.images),
        }
    }
}

/// Creates the main application router.
pub fn create_router<R>(state: AppState<R>, server: &ServerConfig) -> Router
where
    R: ImageRepository + 'static,
{
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
