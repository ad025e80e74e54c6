//! Pokedex Server
//!
//! HTTP CRUD service over Pokemon records, backed by either a CSV file or
//! an embedded SQLite table.

pub mod config;
pub mod handlers;
pub mod pokeapi;
pub mod storage;

use axum::{
    routing::{get, patch},
    Router,
};
use pokedex_core::PokemonStore;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PokemonStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn PokemonStore>) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Pokemon routes
        .route("/count", get(handlers::pokemon::count))
        .route(
            "/pokemon",
            get(handlers::pokemon::list).post(handlers::pokemon::create),
        )
        .route(
            "/pokemon/:id",
            get(handlers::pokemon::get)
                .put(handlers::pokemon::replace)
                .delete(handlers::pokemon::delete),
        )
        .route("/pokemon/:id/name", patch(handlers::pokemon::patch_name))
        .route(
            "/pokemon/:id/imageurl",
            patch(handlers::pokemon::patch_imageurl),
        )
        // Layers
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin, method and header, with credentials.
///
/// Credentials cannot be combined with `*`, so everything is mirrored back
/// from the request instead.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
