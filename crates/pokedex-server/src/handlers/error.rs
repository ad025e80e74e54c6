//! Store error to HTTP response translation

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pokedex_core::{ErrorBody, PokedexError};
use tracing::error;

/// Wraps a store error so handlers can return it with `?`
#[derive(Debug)]
pub struct ApiError(pub PokedexError);

impl From<PokedexError> for ApiError {
    fn from(e: PokedexError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            PokedexError::NotFound(_) => (StatusCode::NOT_FOUND, "Pokemon not found"),
            PokedexError::DuplicateKey(_) => (StatusCode::BAD_REQUEST, "Pokemon already exists"),
            other => {
                error!("Store operation failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(ErrorBody::new(detail))).into_response()
    }
}
