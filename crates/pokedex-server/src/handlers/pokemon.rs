//! Pokemon handlers
//!
//! Thin delegation to the configured store. Path and body shapes are
//! validated by the extractors before any store call is made.

use super::ApiError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use pokedex_core::{
    DeleteConfirmation, PokedexError, Pokemon, PokemonField, PokemonUpdate,
};
use serde::Deserialize;
use tracing::debug;

pub async fn count(State(state): State<AppState>) -> Result<Json<u64>, ApiError> {
    Ok(Json(state.store.count().await?))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Pokemon>>, ApiError> {
    Ok(Json(state.store.list_all().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Pokemon>, ApiError> {
    state
        .store
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or(ApiError(PokedexError::NotFound(id)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(pokemon): Json<Pokemon>,
) -> Result<Json<Pokemon>, ApiError> {
    debug!("Create request for pokemon {}", pokemon.id);
    Ok(Json(state.store.create(pokemon).await?))
}

pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<PokemonUpdate>,
) -> Result<Json<Pokemon>, ApiError> {
    Ok(Json(state.store.replace(id, update).await?))
}

/// New value for a PATCH route. The query string form (`?name=...`) wins
/// over the JSON string body when both are present.
#[derive(Debug, Default, Deserialize)]
pub struct PatchQuery {
    pub name: Option<String>,
    pub imageurl: Option<String>,
}

pub async fn patch_name(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PatchQuery>,
    body: Bytes,
) -> Response {
    patch_field(&state, id, PokemonField::Name, query.name, &body).await
}

pub async fn patch_imageurl(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PatchQuery>,
    body: Bytes,
) -> Response {
    patch_field(&state, id, PokemonField::ImageUrl, query.imageurl, &body).await
}

async fn patch_field(
    state: &AppState,
    id: i64,
    field: PokemonField,
    from_query: Option<String>,
    body: &[u8],
) -> Response {
    let value = match from_query {
        Some(value) => value,
        None => match Json::<String>::from_bytes(body) {
            Ok(Json(value)) => value,
            Err(rejection) => return rejection.into_response(),
        },
    };

    debug!("Patch {} of pokemon {}", field, id);
    match state.store.patch_field(id, field, value).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteConfirmation>, ApiError> {
    state.store.delete(id).await?;
    Ok(Json(DeleteConfirmation::default()))
}
