//! API route definitions.

use axum::Router;

use prism_core::image::ImageRepository;

use crate::AppState;

pub mod health;
pub mod images;

/// Creates the API router with all routes.
pub fn api_routes<R: ImageRepository + 'static>() -> Router<AppState<R>> {
    Router::new()
        .merge(health::routes())
        .merge(images::routes())
}
