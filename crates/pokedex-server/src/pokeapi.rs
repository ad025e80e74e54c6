//! PokeAPI client used to seed a store with real species data

use pokedex_core::{PokedexError, Pokemon, PokemonStore, Result};
use serde::Deserialize;
use std::ops::RangeInclusive;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co";
pub const SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Front sprite for a national dex number
pub fn sprite_url(id: i64) -> String {
    format!("{}/{}.png", SPRITE_BASE_URL, id)
}

#[derive(Debug, Deserialize)]
struct SpeciesResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpeciesCountResponse {
    count: i64,
}

pub struct PokeApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl PokeApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pokedex-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(http_error)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Total number of species PokeAPI knows about
    pub async fn species_count(&self) -> Result<i64> {
        let url = format!("{}/api/v2/pokemon-species?limit=0", self.base_url);
        let body: SpeciesCountResponse = self.get_json(&url).await?;
        Ok(body.count)
    }

    /// Build a record from the species name and the sprite repository
    pub async fn fetch_pokemon(&self, id: i64) -> Result<Pokemon> {
        let url = format!("{}/api/v2/pokemon-species/{}", self.base_url, id);
        let species: SpeciesResponse = self.get_json(&url).await?;
        Ok(Pokemon::new(id, species.name, sprite_url(id)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        self.http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?
            .json::<T>()
            .await
            .map_err(http_error)
    }
}

fn http_error(e: reqwest::Error) -> PokedexError {
    PokedexError::Http(e.to_string())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: u64,
    pub skipped: u64,
}

/// Fetch every id in `ids` and create it in `store`.
///
/// Ids already present are skipped without a network call. Any other
/// failure stops the run.
pub async fn seed(
    store: &dyn PokemonStore,
    client: &PokeApiClient,
    ids: RangeInclusive<i64>,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for id in ids {
        if store.get_by_id(id).await?.is_some() {
            info!("Pokemon {} already present, skipping", id);
            report.skipped += 1;
            continue;
        }

        let pokemon = client.fetch_pokemon(id).await?;
        match store.create(pokemon).await {
            Ok(_) => report.inserted += 1,
            Err(PokedexError::DuplicateKey(_)) => {
                info!("Pokemon {} created concurrently, skipping", id);
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TableStore;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};

    async fn species(Path(id): Path<i64>) -> std::result::Result<Json<serde_json::Value>, StatusCode> {
        match id {
            1 => Ok(Json(serde_json::json!({"id": 1, "name": "bulbasaur"}))),
            2 => Ok(Json(serde_json::json!({"id": 2, "name": "ivysaur"}))),
            3 => Ok(Json(serde_json::json!({"id": 3, "name": "venusaur"}))),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    async fn species_count() -> Json<serde_json::Value> {
        Json(serde_json::json!({"count": 3, "results": []}))
    }

    /// Serve a tiny PokeAPI stand-in on an ephemeral port
    async fn mock_pokeapi() -> String {
        let app = Router::new()
            .route("/api/v2/pokemon-species", get(species_count))
            .route("/api/v2/pokemon-species/:id", get(species));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[test]
    fn test_sprite_url() {
        assert_eq!(
            sprite_url(25),
            "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/25.png"
        );
    }

    #[tokio::test]
    async fn test_fetch_pokemon_and_count() {
        let client = PokeApiClient::new(mock_pokeapi().await).unwrap();

        assert_eq!(client.species_count().await.unwrap(), 3);
        assert_eq!(
            client.fetch_pokemon(2).await.unwrap(),
            Pokemon::new(2, "ivysaur", sprite_url(2))
        );
        assert!(matches!(
            client.fetch_pokemon(99).await,
            Err(PokedexError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_skips_existing_records() {
        let client = PokeApiClient::new(mock_pokeapi().await).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("pokemon.csv")).await;
        store
            .create(Pokemon::new(2, "Custom Ivysaur", "ivy.png"))
            .await
            .unwrap();

        let report = seed(&store, &client, 1..=3).await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                inserted: 2,
                skipped: 1
            }
        );

        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(
            store.get_by_id(2).await.unwrap().unwrap().name,
            "Custom Ivysaur"
        );
        assert_eq!(store.get_by_id(3).await.unwrap().unwrap().name, "venusaur");
    }

    #[tokio::test]
    async fn test_seed_stops_on_fetch_failure() {
        let client = PokeApiClient::new(mock_pokeapi().await).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::open(dir.path().join("pokemon.csv")).await;

        let err = seed(&store, &client, 3..=4).await.unwrap_err();
        assert!(matches!(err, PokedexError::Http(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
